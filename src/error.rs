//! Unified error type.

use crate::method::Method;

/// The error type returned by senda's fallible operations.
///
/// Application-level outcomes (404, 500, etc.) are expressed as HTTP
/// responses, not as `Error`s. This type surfaces setup mistakes and
/// infrastructure failures: registering too late, binding a port, reading
/// the environment.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A route was registered after the server started listening.
    #[error("cannot register {method} {path}: the server is already listening")]
    RouteAfterListen { method: Method, path: String },

    #[error("the server is already listening")]
    AlreadyListening,

    #[error("invalid request target `{target}`: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid {key} `{value}`: {reason}")]
    Config {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// A failure reported by a handler, either as an `Err` return or a panic.
///
/// The dispatcher answers it with `500 Internal Server Error`.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}
