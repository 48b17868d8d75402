//! Handler results and how they become a response body.
//!
//! A handler answers with a [`Reply`]: a status code plus a [`Body`]. The body
//! is whatever the handler wants to send (structured JSON, plain text, or
//! nothing) and [`Body::serialize`] turns it into the string written to the
//! wire. No content-type header is added.

use serde::Serialize;
use serde_json::Value;

// ── Body ──────────────────────────────────────────────────────────────────────

/// What a handler sends back.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Json(Value),
}

impl Body {
    /// Converts any serializable value into a [`Body::Json`].
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }

    /// Produces the response body text.
    ///
    /// Objects and arrays become compact JSON. Numbers, booleans and `null`
    /// use their textual form. Strings pass through unquoted.
    ///
    /// ```rust
    /// use senda::Body;
    /// use serde_json::json;
    ///
    /// assert_eq!(Body::from(json!({ "a": 1 })).serialize(), r#"{"a":1}"#);
    /// assert_eq!(Body::from(json!(42)).serialize(), "42");
    /// assert_eq!(Body::from("hola").serialize(), "hola");
    /// assert_eq!(Body::Empty.serialize(), "");
    /// ```
    pub fn serialize(self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(text) | Self::Json(Value::String(text)) => text,
            Self::Json(value) => value.to_string(),
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self { Self::Json(value) }
}

impl From<String> for Body {
    fn from(text: String) -> Self { Self::Text(text) }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self { Self::Text(text.to_owned()) }
}

impl From<()> for Body {
    fn from((): ()) -> Self { Self::Empty }
}

// ── Reply ─────────────────────────────────────────────────────────────────────

/// A handler's answer: status code plus body.
///
/// ```rust
/// use senda::Reply;
/// use serde_json::json;
///
/// Reply::new(201, json!({ "id": 42 }));
/// Reply::new(200, "pong");
/// Reply::status(204);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub(crate) status: u16,
    pub(crate) body: Body,
}

impl Reply {
    pub fn new(status: u16, send: impl Into<Body>) -> Self {
        Self { status, body: send.into() }
    }

    /// `200` with the given body.
    pub fn ok(send: impl Into<Body>) -> Self {
        Self::new(200, send)
    }

    /// A reply with no body.
    pub fn status(status: u16) -> Self {
        Self::new(status, Body::Empty)
    }

    /// Serializes `value` into a JSON body.
    pub fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(status, Body::json(value)?))
    }

    pub fn status_code(&self) -> u16 { self.status }
    pub fn body(&self) -> &Body { &self.body }
}
