//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: structured tracing, request-id injection, and
//! authentication-header inspection.
//!
//! A middleware is anything that turns one handler into another
//! ([`Middleware::wrap`]). A [`Chain`] is an ordered, immutable list of them.
//! The first middleware in the list is the outermost:
//!
//! ```text
//! Chain [A, B, C] wrapping H  ≡  A(B(C(H)))
//!
//! request  → A pre → B pre → C pre → H
//! response ← A post ← B post ← C post ←┘
//! ```
//!
//! Wrapping happens once, when the route is registered, not per request:
//!
//! ```rust
//! use multiplexer::middleware::{self, Chain, Next};
//! use multiplexer::{Request, Response, Router, StatusCode};
//!
//! async fn require_auth(req: Request, next: Next) -> Response {
//!     if req.header("authorization").is_none() {
//!         return Response::status(StatusCode::UNAUTHORIZED);
//!     }
//!     next.call(req).await
//! }
//!
//! let logged = Chain::new([middleware::boxed(middleware::trace())]);
//! let protected = logged.with(middleware::from_fn(require_auth));
//!
//! let api = Router::default().group("/api");
//! api.handle("GET /health", logged.wrap(|_req: Request| async { "ok" }));
//! api.handle("GET /me", protected.wrap(|_req: Request| async { "alice" }));
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::request::Request;
use crate::response::IntoResponse;

mod trace;

pub use trace::{trace, Trace};

/// The handler a middleware wraps.
pub type Next = BoxedHandler;

/// A type-erased middleware shared between chains.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Turns a handler into a handler with extra behaviour around it.
///
/// Implemented for every `Fn(BoxedHandler) -> BoxedHandler`, so a plain
/// function works:
///
/// ```rust
/// use multiplexer::{BoxedHandler, Request};
///
/// fn tag(next: BoxedHandler) -> BoxedHandler {
///     BoxedHandler::new(move |req: Request| {
///         let next = next.clone();
///         async move {
///             let mut res = next.call(req).await;
///             res.set_header("x-tagged", "1");
///             res
///         }
///     })
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// Erases a middleware so differently-typed ones fit in one [`Chain`].
pub fn boxed(middleware: impl Middleware) -> BoxedMiddleware {
    Arc::new(middleware)
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// Builds a middleware from an async function of the request and the next
/// handler.
///
/// The function decides whether and when to call `next`; returning without
/// calling it short-circuits the rest of the chain.
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FromFn(Arc::new(f))
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F>(Arc<F>);

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxedHandler::from_erased(FromFnHandler { f: Arc::clone(&self.0), next })
    }
}

/// One [`FromFn`] layer bound to the handler it wraps.
struct FromFnHandler<F> {
    f: Arc<F>,
    next: BoxedHandler,
}

impl<F, Fut, R> ErasedHandler for FromFnHandler<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.f)(req, self.next.clone());
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// An ordered, immutable sequence of middleware.
///
/// Extending a chain ([`append`](Chain::append), [`with`](Chain::with))
/// returns a new chain; the original keeps its layers, so a base chain can be
/// shared by routes that each add their own extras.
#[derive(Clone, Default)]
pub struct Chain {
    layers: Arc<[BoxedMiddleware]>,
}

impl Chain {
    /// Creates a chain from `layers`, first element outermost.
    ///
    /// The chain owns its own copy of the sequence.
    pub fn new(layers: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        Self { layers: layers.into_iter().collect() }
    }

    /// Wraps `handler` so that the first layer runs first.
    pub fn wrap(&self, handler: impl Handler) -> BoxedHandler {
        self.layers
            .iter()
            .rev()
            .fold(handler.into_boxed_handler(), |next, layer| layer.wrap(next))
    }

    /// Returns a new chain with `layers` after this chain's layers.
    pub fn append(&self, layers: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        Self { layers: self.layers.iter().cloned().chain(layers).collect() }
    }

    /// Returns a new chain with one more innermost layer.
    pub fn with(&self, layer: impl Middleware) -> Self {
        self.append([boxed(layer)])
    }

    pub fn len(&self) -> usize { self.layers.len() }
    pub fn is_empty(&self) -> bool { self.layers.is_empty() }
}

impl FromIterator<BoxedMiddleware> for Chain {
    fn from_iter<I: IntoIterator<Item = BoxedMiddleware>>(iter: I) -> Self {
        Self::new(iter)
    }
}
