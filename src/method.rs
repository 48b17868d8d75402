//! HTTP methods a route can be registered under.
//!
//! Incoming requests keep their raw method string. A request whose method is
//! not one of these four simply never matches a route and ends in a 404.

use std::fmt;

/// A registrable HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Delete,
    Get,
    Patch,
    Post,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Get    => "GET",
            Self::Patch  => "PATCH",
            Self::Post   => "POST",
        }
    }

    /// Case-sensitive comparison against a raw request method, per RFC 9110 §9.1.
    pub(crate) fn matches(self, raw: &str) -> bool {
        self.as_str() == raw
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
