//! Exact-path route table.
//!
//! Routes are kept in registration order and read newest-first, so when the
//! same method and path are registered twice the later handler shadows the
//! earlier one. Nothing is deduplicated or removed.

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;

/// One registered (method, path, handler) triple.
pub(crate) struct Route {
    method: Method,
    path: String,
    pub(crate) handler: BoxedHandler,
}

impl Route {
    /// Exact comparison: no normalisation, no trailing-slash folding, no patterns.
    pub(crate) fn matches(&self, method: &str, path: &str) -> bool {
        self.method.matches(method) && self.path == path
    }
}

#[derive(Default)]
pub(crate) struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, method: Method, path: &str, handler: impl Handler) {
        self.routes.push(Route {
            method,
            path: path.to_owned(),
            handler: handler.into_boxed_handler(),
        });
    }

    /// Routes in reverse registration order.
    pub(crate) fn newest_first(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().rev()
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }
}
