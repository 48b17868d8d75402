//! HTTP server, route registration and graceful shutdown.
//!
//! A [`Server`] starts out accepting route registrations. [`Server::bind`]
//! freezes the route table, opens the listener and from then on every
//! registration attempt fails with [`Error::RouteAfterListen`].
//!
//! # Graceful shutdown
//!
//! [`Listening::serve`] reacts to SIGTERM or Ctrl-C by:
//! 1. Immediately stopping `listener.accept()`, so no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning, which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{debug, error, info, warn};

use crate::dispatch::{Dispatched, Dispatcher};
use crate::error::Error;
use crate::handler::Handler;
use crate::method::Method;
use crate::request::Request;
use crate::router::RouteTable;

/// The HTTP server.
///
/// Cheap to clone: every clone is a handle onto the same routes and flags.
///
/// ```rust,no_run
/// use senda::{Error, Reply, Request, Server};
///
/// # async fn run() -> Result<(), Error> {
/// let server = Server::new();
/// server
///     .get("/ping", |_req: Request| async { Reply::ok("pong") })?
///     .delete("/cache", |_req: Request| async {})?;
/// server.listen(3000).await
/// # }
/// ```
#[derive(Clone, Default)]
pub struct Server {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    debug: Arc<AtomicBool>,
}

enum State {
    Registering(RouteTable),
    Listening,
}

impl Default for State {
    fn default() -> Self {
        Self::Registering(RouteTable::new())
    }
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs `<METHOD> <PATH> -> statusCode: <STATUS>` for every dispatch.
    pub fn start_debugging(&self) {
        self.set_debug(true);
    }

    pub fn set_debug(&self, enabled: bool) {
        self.shared.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debugging(&self) -> bool {
        self.shared.debug.load(Ordering::Relaxed)
    }

    pub fn is_listening(&self) -> bool {
        matches!(*self.state(), State::Listening)
    }

    pub fn get(&self, path: &str, handler: impl Handler) -> Result<&Self, Error> {
        self.route(Method::Get, path, handler)
    }

    pub fn post(&self, path: &str, handler: impl Handler) -> Result<&Self, Error> {
        self.route(Method::Post, path, handler)
    }

    pub fn patch(&self, path: &str, handler: impl Handler) -> Result<&Self, Error> {
        self.route(Method::Patch, path, handler)
    }

    pub fn delete(&self, path: &str, handler: impl Handler) -> Result<&Self, Error> {
        self.route(Method::Delete, path, handler)
    }

    /// Registers a handler for an exact method + path pair.
    ///
    /// Registering the same pair again is allowed; the newer handler wins.
    /// Fails once the server is listening, and the route is not stored.
    pub fn route(&self, method: Method, path: &str, handler: impl Handler) -> Result<&Self, Error> {
        match &mut *self.state() {
            State::Registering(routes) => {
                routes.register(method, path, handler);
                debug!(%method, path, "route registered");
                Ok(self)
            }
            State::Listening => Err(Error::RouteAfterListen { method, path: path.to_owned() }),
        }
    }

    /// Binds the listener and freezes the route table.
    ///
    /// Nothing is served until [`Listening::serve`] is awaited, but the
    /// server counts as listening as soon as this returns.
    pub async fn bind(&self, addr: impl ToSocketAddrs) -> Result<Listening, Error> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let routes = self.freeze()?;

        let dispatcher = Dispatcher::new(routes, Arc::clone(&self.shared.debug));
        info!(%addr, routes = dispatcher.route_count(), "senda listening");

        Ok(Listening { listener, addr, dispatcher: Arc::new(dispatcher) })
    }

    /// Binds `0.0.0.0:port` and serves until SIGTERM or Ctrl-C.
    pub async fn listen(&self, port: u16) -> Result<(), Error> {
        self.bind((Ipv4Addr::UNSPECIFIED, port)).await?.serve().await
    }

    fn freeze(&self) -> Result<RouteTable, Error> {
        match std::mem::replace(&mut *self.state(), State::Listening) {
            State::Registering(routes) => Ok(routes),
            State::Listening => Err(Error::AlreadyListening),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // The state is only ever swapped whole, so a poisoned lock is still consistent.
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A bound server that has not started accepting connections yet.
pub struct Listening {
    listener: TcpListener,
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
}

impl Listening {
    /// The bound address. Useful after binding port `0`.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves until SIGTERM or Ctrl-C, then drains in-flight connections.
    pub async fn serve(self) -> Result<(), Error> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serves until `signal` resolves, then drains in-flight connections.
    pub async fn serve_with_shutdown(
        self,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let Self { listener, addr, dispatcher } = self;

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting immediately,
                // even if more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let dispatcher = Arc::clone(&dispatcher);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let dispatcher = Arc::clone(&dispatcher);
                            async move { handle(dispatcher, req).await }
                        });

                        // `auto::Builder` serves HTTP/1.1 and HTTP/2, whichever
                        // the client speaks.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        drop(listener);
        while tasks.join_next().await.is_some() {}

        info!(%addr, "senda stopped");
        Ok(())
    }
}

// ── Request handling ──────────────────────────────────────────────────────────

/// Turns one hyper request into one response.
///
/// The error type is [`Infallible`]: every failure is answered with a status
/// code so hyper never sees an error.
async fn handle(
    dispatcher: Arc<Dispatcher>,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(method = %parts.method, uri = %parts.uri, "failed to read request body: {e}");
            return Ok(respond(StatusCode::BAD_REQUEST, String::new()));
        }
    };

    let request = match Request::from_parts(&parts, body) {
        Ok(request) => request,
        Err(e) => {
            warn!(method = %parts.method, "rejecting request: {e}");
            return Ok(respond(StatusCode::BAD_REQUEST, String::new()));
        }
    };

    let Dispatched { status, body } = dispatcher.dispatch(request).await;
    Ok(respond(status, body))
}

fn respond(status: StatusCode, body: String) -> http::Response<Full<Bytes>> {
    let mut response = http::Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C) the process receives.
///
/// If a handler cannot be installed that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // `pending()` never resolves: on non-Unix platforms only Ctrl-C counts.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
