//! Incoming HTTP request, normalised for handlers.

use std::borrow::Cow;
use std::collections::HashMap;

use bytes::Bytes;
use http::header::{COOKIE, HeaderMap};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Error;

/// Origin-form targets (`/path?q`) are prefixed with this base so the URL
/// parser can split path and query the same way it does for absolute targets.
const PLACEHOLDER_BASE: &str = "http://example.example";

/// An incoming HTTP request.
///
/// Built fresh for every request and handed to the matched handler by value.
#[derive(Clone, Debug)]
pub struct Request {
    method: String,
    path: String,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl Request {
    /// Builds a request from a raw method, a raw target (`/path?query` or an
    /// absolute URL) and a header map.
    ///
    /// The method is passed through unchanged. Header names are lower-cased.
    /// When a query key repeats, the last value wins.
    ///
    /// ```rust
    /// use std::collections::HashMap;
    /// use senda::Request;
    ///
    /// let req = Request::parse("GET", "/search?x=1&x=2", HashMap::new()).unwrap();
    /// assert_eq!(req.path(), "/search");
    /// assert_eq!(req.query_param("x"), Some("2"));
    /// ```
    pub fn parse(
        method: &str,
        target: &str,
        headers: HashMap<String, String>,
    ) -> Result<Self, Error> {
        let (path, query) = split_target(target).map_err(|source| Error::InvalidTarget {
            target: target.to_owned(),
            source,
        })?;
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();

        Ok(Self {
            method: method.to_owned(),
            path,
            query,
            headers,
            body: Bytes::new(),
        })
    }

    pub(crate) fn from_parts(parts: &http::request::Parts, body: Bytes) -> Result<Self, Error> {
        let target = parts.uri.to_string();
        let req = Self::parse(parts.method.as_str(), &target, flatten_headers(&parts.headers))?;
        Ok(req.with_body(body))
    }

    /// Replaces the body. Mostly useful when building requests by hand.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> &HashMap<String, String> { &self.query }
    pub fn headers(&self) -> &HashMap<String, String> { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn accept(&self) -> Option<&str> { self.header("accept") }
    pub fn connection(&self) -> Option<&str> { self.header("connection") }

    /// The raw `cookie` header, unparsed.
    pub fn cookies(&self) -> Option<&str> { self.header("cookie") }

    /// The body as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

fn split_target(target: &str) -> Result<(String, HashMap<String, String>), url::ParseError> {
    // Prefixed, not joined: `//admin` is a path here, not a scheme-relative host.
    let url = if target.starts_with('/') {
        Url::parse(&format!("{PLACEHOLDER_BASE}{target}"))?
    } else {
        Url::parse(target)?
    };

    // Collecting in order lets later duplicates overwrite earlier ones.
    let query = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    Ok((url.path().to_owned(), query))
}

/// Collapses a multi-valued header map into one string per name.
fn flatten_headers(map: &HeaderMap) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = HashMap::with_capacity(map.keys_len());
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes());
        let separator = if *name == COOKIE { "; " } else { ", " };
        headers
            .entry(name.as_str().to_owned())
            .and_modify(|joined| {
                joined.push_str(separator);
                joined.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    headers
}
