//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The mux holds handlers of *different* types in one table, and middleware
//! wraps one handler inside another without knowing either concrete type. Both
//! need a single uniform type, so every handler is erased behind
//! `dyn ErasedHandler` and carried around as a [`BoxedHandler`].
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.handle("GET /", hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! BoxedHandler(Arc::new(FnHandler(hello)))         ← heap-allocated wrapper
//!        ↓  middleware may wrap it again: chain.wrap(handler)
//! handler.call(req)  at request time               ← one vtable dispatch per layer
//!        ↓
//! Box::pin(async { hello(req).await.into_response() })
//! ```
//!
//! Cloning a [`BoxedHandler`] is one atomic reference-count increment.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Erased types ──────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` let tokio move the future across worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// The "serve one request" capability every stored handler implements.
///
/// Implement this directly when a closure is not enough, e.g. for a test
/// double that records the requests it sees.
pub trait ErasedHandler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[derive(Clone)]
pub struct BoxedHandler(Arc<dyn ErasedHandler>);

impl BoxedHandler {
    /// Erases any [`Handler`].
    pub fn new(handler: impl Handler) -> Self {
        handler.into_boxed_handler()
    }

    /// Erases a hand-written [`ErasedHandler`].
    pub fn from_erased(handler: impl ErasedHandler) -> Self {
        Self(Arc::new(handler))
    }

    /// Runs the handler.
    pub fn call(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }

    /// Returns `true` if both values point at the same underlying handler.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for BoxedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxedHandler")
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by:
///
/// - any `async fn` / closure with the signature
///   `Fn(Request) -> impl Future<Output = impl IntoResponse>`,
/// - a [`BoxedHandler`] (e.g. the result of [`Chain::wrap`](crate::Chain::wrap)),
/// - a [`Router`](crate::Router), so a router can be mounted as a handler.
///
/// The trait is **sealed** (via the crate-private `Sealed` supertrait): only
/// the impls in this crate can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

pub(crate) mod private {
    pub trait Sealed {}
}

// ── Implementations ───────────────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        BoxedHandler(Arc::new(FnHandler(self)))
    }
}

impl private::Sealed for BoxedHandler {}

impl Handler for BoxedHandler {
    fn into_boxed_handler(self) -> BoxedHandler {
        self
    }
}

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use super::*;

    async fn teapot(_req: Request) -> StatusCode {
        StatusCode::IM_A_TEAPOT
    }

    #[tokio::test]
    async fn async_fn_is_a_handler() {
        let h = BoxedHandler::new(teapot);
        let res = h.call(Request::builder(Method::GET, "/").build()).await;
        assert_eq!(res.status_code(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn closure_is_a_handler() {
        let greeting = String::from("hi");
        let h = BoxedHandler::new(move |req: Request| {
            let body = format!("{greeting} {}", req.path());
            async move { body }
        });
        let res = h.call(Request::builder(Method::GET, "/bob").build()).await;
        assert_eq!(res.body(), b"hi /bob");
    }

    #[test]
    fn boxing_a_boxed_handler_is_identity() {
        let h = BoxedHandler::new(teapot);
        let again = BoxedHandler::new(h.clone());
        assert!(h.ptr_eq(&again));
    }
}
