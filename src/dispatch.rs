//! Request dispatch: route lookup, handler invocation, reply serialization.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use http::StatusCode;
use tracing::{error, info};

use crate::error::HandlerError;
use crate::handler::{BoxedHandler, Outcome};
use crate::request::Request;
use crate::response::Reply;
use crate::router::RouteTable;

/// The final status and body text for one request.
#[derive(Debug, PartialEq)]
pub(crate) struct Dispatched {
    pub(crate) status: StatusCode,
    pub(crate) body: String,
}

impl Dispatched {
    fn empty(status: StatusCode) -> Self {
        Self { status, body: String::new() }
    }
}

/// Owns the frozen route table once the server is listening.
pub(crate) struct Dispatcher {
    routes: RouteTable,
    debug: Arc<AtomicBool>,
}

impl Dispatcher {
    pub(crate) fn new(routes: RouteTable, debug: Arc<AtomicBool>) -> Self {
        Self { routes, debug }
    }

    pub(crate) fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Routes one request and produces its status and body.
    ///
    /// The newest matching route wins. Unmatched requests get `404`. A handler
    /// that returns nothing gets `200` with an empty body; one that fails or
    /// panics gets `500`.
    pub(crate) async fn dispatch(&self, req: Request) -> Dispatched {
        let method = req.method().to_owned();
        let path = req.path().to_owned();

        let handler = self
            .routes
            .newest_first()
            .find(|route| route.matches(&method, &path))
            .map(|route| Arc::clone(&route.handler));

        let dispatched = match handler {
            None => Dispatched::empty(StatusCode::NOT_FOUND),
            Some(handler) => match run(handler, req).await {
                Ok(Some(reply)) => finish(reply, &method, &path),
                Ok(None) => Dispatched::empty(StatusCode::OK),
                Err(e) => {
                    error!(%method, %path, "handler failed: {e}");
                    Dispatched::empty(StatusCode::INTERNAL_SERVER_ERROR)
                }
            },
        };

        if self.debug.load(Ordering::Relaxed) {
            info!("{method} {path} -> statusCode: {}", dispatched.status.as_u16());
        }

        dispatched
    }
}

/// Runs the handler on its own task so a panic is contained to this request.
///
/// The task is detached: if the client goes away it still runs to completion.
async fn run(handler: BoxedHandler, req: Request) -> Outcome {
    match tokio::spawn(async move { handler.call(req).await }).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(HandlerError::new("handler panicked")),
        Err(e) => Err(HandlerError::new(e.to_string())),
    }
}

fn finish(reply: Reply, method: &str, path: &str) -> Dispatched {
    match StatusCode::from_u16(reply.status) {
        Ok(status) => Dispatched { status, body: reply.body.serialize() },
        Err(_) => {
            error!(%method, %path, status = reply.status, "handler replied with an invalid status code");
            Dispatched::empty(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;

    use serde_json::json;

    use crate::method::Method;

    fn dispatcher(build: impl FnOnce(&mut RouteTable)) -> Dispatcher {
        debugging_dispatcher(true, build)
    }

    fn debugging_dispatcher(debug: bool, build: impl FnOnce(&mut RouteTable)) -> Dispatcher {
        let mut routes = RouteTable::new();
        build(&mut routes);
        Dispatcher::new(routes, Arc::new(AtomicBool::new(debug)))
    }

    /// Log sink shared between the test and the fmt subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Dispatches `GET /missing` and `POST /fire`, returning what was logged.
    async fn logged_lines(debug: bool) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let d = debugging_dispatcher(debug, |t| {
            t.register(Method::Post, "/fire", |_req: Request| async {});
        });
        d.dispatch(request("GET", "/missing")).await;
        d.dispatch(request("POST", "/fire")).await;

        captured.text()
    }

    fn request(method: &str, target: &str) -> Request {
        Request::parse(method, target, HashMap::new()).unwrap()
    }

    #[tokio::test]
    async fn last_registered_route_wins() {
        let d = dispatcher(|t| {
            t.register(Method::Get, "/", |_req: Request| async {
                Reply::new(200, json!({ "una": "vaina" }))
            });
            t.register(Method::Get, "/", |_req: Request| async {
                Reply::new(200, json!({ "una": "otra cosa" }))
            });
        });

        let out = d.dispatch(request("GET", "/")).await;
        assert_eq!(out.status, StatusCode::OK);
        assert_eq!(out.body, r#"{"una":"otra cosa"}"#);
    }

    #[tokio::test]
    async fn newer_route_on_another_method_does_not_shadow() {
        let d = dispatcher(|t| {
            t.register(Method::Get, "/item", |_req: Request| async { Reply::ok("get") });
            t.register(Method::Delete, "/item", |_req: Request| async { Reply::ok("delete") });
        });

        assert_eq!(d.dispatch(request("GET", "/item")).await.body, "get");
        assert_eq!(d.dispatch(request("DELETE", "/item")).await.body, "delete");
    }

    #[tokio::test]
    async fn unmatched_request_is_404_with_empty_body() {
        let d = dispatcher(|t| {
            t.register(Method::Get, "/users", |_req: Request| async { Reply::ok("users") });
        });

        for (method, target) in [("GET", "/users/"), ("POST", "/users"), ("HEAD", "/users"), ("GET", "/nope")] {
            let out = d.dispatch(request(method, target)).await;
            assert_eq!(out, Dispatched::empty(StatusCode::NOT_FOUND), "{method} {target}");
        }
    }

    #[tokio::test]
    async fn double_slash_path_does_not_reach_root_route() {
        let d = dispatcher(|t| {
            t.register(Method::Get, "/", |_req: Request| async { Reply::ok("root") });
        });

        assert_eq!(d.dispatch(request("GET", "//x")).await, Dispatched::empty(StatusCode::NOT_FOUND));
        assert_eq!(d.dispatch(request("GET", "//evil.example/")).await.status, StatusCode::NOT_FOUND);
        assert_eq!(d.dispatch(request("GET", "/")).await.body, "root");
    }

    #[tokio::test]
    async fn debug_logs_one_line_per_dispatch() {
        let logs = logged_lines(true).await;
        assert_eq!(logs.matches("GET /missing -> statusCode: 404").count(), 1, "{logs}");
        assert_eq!(logs.matches("POST /fire -> statusCode: 200").count(), 1, "{logs}");
        assert_eq!(logs.lines().count(), 2, "{logs}");
    }

    #[tokio::test]
    async fn debug_off_logs_nothing() {
        let logs = logged_lines(false).await;
        assert!(logs.is_empty(), "{logs}");
    }

    #[tokio::test]
    async fn handler_returning_nothing_is_200_empty() {
        let d = dispatcher(|t| t.register(Method::Post, "/fire", |_req: Request| async {}));
        let out = d.dispatch(request("POST", "/fire")).await;
        assert_eq!(out, Dispatched::empty(StatusCode::OK));
    }

    #[tokio::test]
    async fn structured_body_is_serialized_as_json() {
        let d = dispatcher(|t| {
            t.register(Method::Patch, "/a", |_req: Request| async { Reply::new(201, json!({ "a": 1 })) });
        });

        let out = d.dispatch(request("PATCH", "/a")).await;
        assert_eq!(out.status, StatusCode::CREATED);
        assert_eq!(out.body, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn query_is_available_to_the_handler() {
        let d = dispatcher(|t| {
            t.register(Method::Get, "/search", |req: Request| async move {
                Reply::ok(req.query_param("x").unwrap_or_default().to_owned())
            });
        });

        let out = d.dispatch(request("GET", "/search?x=1&x=2")).await;
        assert_eq!(out.body, "2");
    }

    #[tokio::test]
    async fn handler_error_becomes_500() {
        let d = dispatcher(|t| {
            t.register(Method::Get, "/boom", |_req: Request| async {
                Err::<Reply, _>("storage offline")
            });
        });

        let out = d.dispatch(request("GET", "/boom")).await;
        assert_eq!(out, Dispatched::empty(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn handler_panic_becomes_500() {
        async fn panics(_req: Request) -> Reply {
            panic!("handler bug")
        }

        let d = dispatcher(|t| t.register(Method::Get, "/panic", panics));

        let out = d.dispatch(request("GET", "/panic")).await;
        assert_eq!(out.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn out_of_range_status_becomes_500() {
        let d = dispatcher(|t| {
            t.register(Method::Get, "/odd", |_req: Request| async { Reply::status(42) });
        });

        let out = d.dispatch(request("GET", "/odd")).await;
        assert_eq!(out.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
