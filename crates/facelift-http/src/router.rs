//! Request routing.
//!
//! Routes are registered on a [`RouterBuilder`] and frozen into an immutable
//! [`Router`], which the server shares between connections through an `Arc`.
//!
//! Dispatch order:
//!
//! 1. `OPTIONS` on any path answers a CORS preflight (`200`, empty body).
//! 2. An exact `(method, path)` match runs the registered handler.
//! 3. An unmatched `GET` is served from the static file root.
//! 4. Anything else gets a `404` HTML page.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::debug;

use crate::request::Request;
use crate::response::Response;
use crate::static_files::{StaticFiles, not_found};

/// Boxed future returned by [`Handler::call`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A route handler.
///
/// Implemented for any `Fn(Request) -> impl Future<Output = Response>` closure,
/// so most routes are registered as async closures or functions.
pub trait Handler: Send + Sync + 'static {
    /// Produce the response for a request.
    fn call(&self, request: Request) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request) -> HandlerFuture {
        Box::pin(self(request))
    }
}

type RouteKey = (String, String);

/// Mutable route table, consumed by [`RouterBuilder::build`].
pub struct RouterBuilder {
    routes: HashMap<RouteKey, Arc<dyn Handler>>,
    static_files: StaticFiles,
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("static_files", &self.static_files)
            .finish()
    }
}

impl RouterBuilder {
    /// Start a table whose `GET` fallback serves `static_files`.
    #[must_use]
    pub fn new(static_files: StaticFiles) -> Self {
        Self {
            routes: HashMap::new(),
            static_files,
        }
    }

    /// Register `handler` for `method` and the exact `path`, replacing any
    /// previous registration.
    #[must_use]
    pub fn route(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes.insert(
            (method.as_str().to_owned(), path.to_owned()),
            Arc::new(handler),
        );
        self
    }

    /// Shorthand for [`RouterBuilder::route`] with `GET`.
    #[must_use]
    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.route(Method::GET, path, handler)
    }

    /// Shorthand for [`RouterBuilder::route`] with `POST`.
    #[must_use]
    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.route(Method::POST, path, handler)
    }

    /// Freeze the table.
    #[must_use]
    pub fn build(self) -> Router {
        Router {
            routes: self.routes,
            static_files: self.static_files,
        }
    }
}

/// Immutable route table.
pub struct Router {
    routes: HashMap<RouteKey, Arc<dyn Handler>>,
    static_files: StaticFiles,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("static_files", &self.static_files)
            .finish()
    }
}

impl Router {
    /// Start building a router.
    #[must_use]
    pub fn builder(static_files: StaticFiles) -> RouterBuilder {
        RouterBuilder::new(static_files)
    }

    /// Whether a handler is registered for exactly this method and path.
    #[must_use]
    pub fn has_route(&self, method: &Method, path: &str) -> bool {
        self.routes
            .contains_key(&(method.as_str().to_owned(), path.to_owned()))
    }

    /// Route a request and produce its response.
    pub async fn dispatch(&self, request: Request) -> Response {
        if request.method == Method::OPTIONS.as_str() {
            return preflight();
        }

        let key = (request.method.clone(), request.path.clone());
        if let Some(handler) = self.routes.get(&key) {
            return handler.call(request).await;
        }

        if request.method == Method::GET.as_str() {
            debug!(path = %request.path, "serving static file");
            return self.static_files.serve(&request.path).await;
        }

        debug!(method = %request.method, path = %request.path, "no route matched");
        not_found()
    }
}

/// Answer to a CORS preflight request.
#[must_use]
pub fn preflight() -> Response {
    Response::empty(StatusCode::OK)
}
