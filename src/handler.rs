//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The route table holds handlers of *different* types in one `Vec`. Rust
//! collections can only hold one concrete type, so each handler is hidden
//! behind a trait object (`dyn ErasedHandler`) and stored uniformly.
//!
//! ```text
//! async fn hello(req: Request) -> Reply { … }      ← user writes this
//!        ↓ server.get("/", hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_reply() })  ← BoxFuture
//! ```

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::request::Request;
use crate::response::Reply;

/// What a handler produced: a reply, nothing at all, or a failure.
pub type Outcome = Result<Option<Reply>, HandlerError>;

/// A heap-allocated, type-erased future that resolves to an [`Outcome`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── IntoReply ─────────────────────────────────────────────────────────────────

/// Conversion of a handler's return value into an [`Outcome`].
///
/// | Handler returns | Response |
/// |---|---|
/// | `()` or `None` | `200`, empty body |
/// | `Reply` / `Some(Reply)` | the reply's status and serialized body |
/// | `Err(e)` | `500`, empty body, `e` logged |
pub trait IntoReply {
    fn into_reply(self) -> Outcome;
}

impl IntoReply for () {
    fn into_reply(self) -> Outcome { Ok(None) }
}

impl IntoReply for Reply {
    fn into_reply(self) -> Outcome { Ok(Some(self)) }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Outcome {
        self.map_or(Ok(None), IntoReply::into_reply)
    }
}

impl<T: IntoReply, E: Display> IntoReply for Result<T, E> {
    fn into_reply(self) -> Outcome {
        match self {
            Ok(value) => value.into_reply(),
            Err(e) => Err(HandlerError::new(e.to_string())),
        }
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the shape:
///
/// ```text
/// async fn name(req: Request) -> impl IntoReply
/// ```
///
/// Closures need their argument type spelled out: `|_req: Request| async { … }`.
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` into the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_reply() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request() -> Request {
        Request::parse("GET", "/", HashMap::new()).unwrap()
    }

    #[test]
    fn unit_and_none_mean_nothing() {
        assert!(matches!(().into_reply(), Ok(None)));
        assert!(matches!(None::<Reply>.into_reply(), Ok(None)));
    }

    #[test]
    fn err_becomes_handler_error() {
        let result: Result<Reply, String> = Err("database unreachable".to_owned());
        let err = result.into_reply().unwrap_err();
        assert_eq!(err.message(), "database unreachable");
    }

    #[tokio::test]
    async fn boxed_handler_runs_the_function() {
        async fn created(req: Request) -> Reply {
            Reply::new(201, req.path().to_owned())
        }

        let handler = created.into_boxed_handler();
        let reply = handler.call(request()).await.unwrap().unwrap();
        assert_eq!(reply.status_code(), 201);
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let handler = (|_req: Request| async {}).into_boxed_handler();
        assert!(matches!(handler.call(request()).await, Ok(None)));
    }
}
