//! Environment-driven settings.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `PORT` | `3000` | TCP port to listen on |
//! | `HOST` | `0.0.0.0` | interface to bind |
//! | `DEBUG` | off | log one line per dispatch |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::Error;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            debug: false,
        }
    }
}

impl Config {
    /// Reads `PORT`, `HOST` and `DEBUG` from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], with variables supplied by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(value) = lookup("PORT") {
            config.port = value.trim().parse().map_err(|e| Error::Config {
                key: "PORT",
                value: value.clone(),
                reason: format!("{e}"),
            })?;
        }

        if let Some(value) = lookup("HOST") {
            config.host = value.trim().parse().map_err(|e| Error::Config {
                key: "HOST",
                value: value.clone(),
                reason: format!("{e}"),
            })?;
        }

        if let Some(value) = lookup("DEBUG") {
            config.debug = parse_flag(&value).ok_or_else(|| Error::Config {
                key: "DEBUG",
                value: value.clone(),
                reason: "expected one of 1/0, true/false, yes/no, on/off".to_owned(),
            })?;
        }

        Ok(config)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.addr(), "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[("PORT", "8080"), ("HOST", "127.0.0.1"), ("DEBUG", "TRUE")]).unwrap();
        assert_eq!(config.addr(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert!(config.debug);
    }

    #[test]
    fn rejects_bad_port() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, Error::Config { key: "PORT", .. }));

        let err = config(&[("PORT", "70000")]).unwrap_err();
        assert!(err.to_string().starts_with("invalid PORT `70000`"));
    }

    #[test]
    fn rejects_unknown_flag() {
        assert!(matches!(config(&[("DEBUG", "maybe")]), Err(Error::Config { key: "DEBUG", .. })));
        assert!(!config(&[("DEBUG", "off")]).unwrap().debug);
    }
}
