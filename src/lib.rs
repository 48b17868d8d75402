//! # senda
//!
//! A minimal HTTP server. Register handlers for exact paths, return JSON or
//! text, and that is the whole framework.
//!
//! ## The contract
//!
//! - **Exact routes** on `GET`, `POST`, `PATCH` and `DELETE`. No path
//!   parameters, no wildcards, no trailing-slash folding.
//! - **Last registration wins** when the same method and path are registered
//!   more than once.
//! - **Routes are fixed at bind time.** Registering after
//!   [`Server::bind`] returns [`Error::RouteAfterListen`].
//! - **Replies are a status plus a body.** Structured values are written as
//!   JSON text, strings as-is, nothing as an empty body. No content-type is set.
//! - **Unmatched requests get `404`.** Failing or panicking handlers get `500`.
//!
//! TLS, middleware and streaming bodies are out of scope.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use senda::{Config, Error, Reply, Request, Server};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let config = Config::from_env()?;
//!
//!     let server = Server::new();
//!     server.set_debug(config.debug);
//!     server
//!         .get("/", |_req: Request| async { Reply::new(200, json!({ "una": "vaina" })) })?
//!         .post("/echo", echo)?;
//!
//!     server.bind(config.addr()).await?.serve().await
//! }
//!
//! async fn echo(req: Request) -> Reply {
//!     Reply::new(201, req.text().into_owned())
//! }
//! ```

mod config;
mod dispatch;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub use config::{Config, DEFAULT_PORT};
pub use error::{Error, HandlerError};
pub use handler::{Handler, IntoReply, Outcome};
pub use method::Method;
pub use request::Request;
pub use response::{Body, Reply};
pub use server::{Listening, Server};
