//! Prefix-scoped router over a shared [`Mux`].
//!
//! A [`Router`] owns a base path and nothing else of substance: every pattern
//! registered through it gets the base path spliced in front of its path
//! component, then goes to the mux. [`Router::group`] hands out another router
//! over the same mux with a longer base path.
//!
//! ```text
//! Router "/api"          .handle("GET /hello")   → mux: "GET /api/hello"
//!   └─ group "/v1"       .handle("/users")       → mux: "/api/v1/users"
//!        └─ group "/admin".handle("DELETE /{id}")→ mux: "DELETE /api/v1/admin/{id}"
//! ```
//!
//! Base paths are concatenated verbatim. `"/api/"` + `"/hello"` registers
//! `"/api//hello"`; keep the slashes consistent yourself.
//!
//! A router may also carry a [`Chain`]. Every handler registered through it
//! is wrapped in that chain first, and groups inherit it, so a layer set on
//! the root runs outside any layer a group or a single route adds.
//!
//! At request time the router asks the mux to resolve the request and either
//! forwards to the matched handler or, when nothing matched, runs its own
//! not-found / method-not-allowed override if one is set.

use std::future::Future;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::error::Error;
use crate::handler::{private, BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::middleware::Chain;
use crate::mux::{allow_header, Mux, Resolution, ServeMux};
use crate::pattern::prefix_pattern;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The application router.
///
/// Build it once at startup, register routes, then hand it to
/// [`Server::serve`](crate::Server::serve). Registration methods take `&self`
/// because the mux behind a router is shared with all of its groups.
///
/// ```rust
/// use multiplexer::{Request, Response, Router, StatusCode};
///
/// async fn hello(_req: Request) -> &'static str { "hello" }
/// async fn missing(_req: Request) -> Response {
///     Response::builder().status(StatusCode::NOT_FOUND).text("nothing here")
/// }
///
/// let app = Router::default().not_found(missing);
/// let api = app.group("/api");
/// api.handle("GET /hello", hello);
/// ```
pub struct Router<M: Mux = ServeMux> {
    mux: Arc<M>,
    base_path: String,
    not_found: Option<BoxedHandler>,
    method_not_allowed: Option<BoxedHandler>,
    chain: Chain,
}

impl<M: Mux> Router<M> {
    /// Creates a router registering into `mux` under `base_path`.
    pub fn new(mux: Arc<M>, base_path: impl Into<String>) -> Self {
        Self {
            mux,
            base_path: base_path.into(),
            not_found: None,
            method_not_allowed: None,
            chain: Chain::default(),
        }
    }

    /// Sets the chain every handler registered from now on is wrapped in.
    ///
    /// Routes registered earlier keep whatever they were wrapped in. The
    /// not-found and method-not-allowed handlers are not wrapped.
    ///
    /// ```rust
    /// use multiplexer::middleware::{self, Chain, Next};
    /// use multiplexer::{Request, Response, Router, StatusCode};
    ///
    /// async fn require_token(req: Request, next: Next) -> Response {
    ///     if req.header("authorization").is_none() {
    ///         return Response::status(StatusCode::UNAUTHORIZED);
    ///     }
    ///     next.call(req).await
    /// }
    ///
    /// let app = Router::default().with_chain(Chain::new([middleware::boxed(middleware::trace())]));
    /// let admin = app.group("/admin").with_chain(app.chain().with(middleware::from_fn(require_token)));
    /// admin.handle("DELETE /users/{id}", |_req: Request| async { StatusCode::NO_CONTENT });
    /// ```
    pub fn with_chain(mut self, chain: Chain) -> Self {
        self.chain = chain;
        self
    }

    pub fn chain(&self) -> &Chain { &self.chain }

    /// Sets the handler for requests whose path matches no route.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Some(handler.into_boxed_handler());
        self
    }

    /// Sets the handler for requests whose path matches a route registered
    /// for other methods only.
    ///
    /// The response always leaves with an `Allow` header listing those
    /// methods; the handler may set its own instead.
    pub fn method_not_allowed(mut self, handler: impl Handler) -> Self {
        self.method_not_allowed = Some(handler.into_boxed_handler());
        self
    }

    pub fn base_path(&self) -> &str { &self.base_path }
    pub fn mux(&self) -> &Arc<M> { &self.mux }

    /// Registers `handler` under `pattern` (`[METHOD ]PATH`), returning `self`
    /// for chaining.
    ///
    /// # Panics
    ///
    /// Panics if the mux rejects the rewritten pattern (malformed, duplicate,
    /// or conflicting). A bad route table is a wiring bug; use
    /// [`try_handle`](Router::try_handle) to get the error instead.
    pub fn handle(&self, pattern: &str, handler: impl Handler) -> &Self {
        self.try_handle(pattern, handler)
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
        self
    }

    /// Registers an async function or closure under `pattern`.
    ///
    /// Same as [`handle`](Router::handle), spelled out for closures.
    pub fn handle_fn<F, Fut, R>(&self, pattern: &str, f: F) -> &Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        self.handle(pattern, f)
    }

    /// Registers `handler` for one method and path.
    ///
    /// ```rust
    /// # use multiplexer::{Method, Request, Router};
    /// # async fn get_user(_: Request) -> &'static str { "" }
    /// # async fn delete_user(_: Request) -> &'static str { "" }
    /// Router::default()
    ///     .on(Method::GET,    "/users/{id}", get_user)
    ///     .on(Method::DELETE, "/users/{id}", delete_user);
    /// ```
    pub fn on(&self, method: Method, path: &str, handler: impl Handler) -> &Self {
        self.handle(&format!("{method} {path}"), handler)
    }

    /// Registers `handler` under `pattern`, reporting a rejected pattern as an
    /// error instead of panicking.
    pub fn try_handle(&self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        let rewritten = prefix_pattern(&self.base_path, pattern);
        self.mux.register(&rewritten, self.chain.wrap(handler))?;
        debug!(pattern = %rewritten, "route registered");
        Ok(())
    }

    /// Returns a router over the same mux whose base path is this router's
    /// base path followed by `sub_path`.
    ///
    /// The group starts with this router's chain and its not-found and
    /// method-not-allowed handlers. Nothing is registered by grouping alone.
    pub fn group(&self, sub_path: &str) -> Self {
        Self {
            mux: Arc::clone(&self.mux),
            base_path: format!("{}{sub_path}", self.base_path),
            not_found: self.not_found.clone(),
            method_not_allowed: self.method_not_allowed.clone(),
            chain: self.chain.clone(),
        }
    }

    /// Routes one request and produces one response.
    ///
    /// Never fails: an unmatched request ends in the override handler if one
    /// is set, or in the mux's default 404 / 405 response otherwise.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        match self.mux.resolve(req.method(), req.path()) {
            Resolution::Matched { handler, params, .. } => {
                req.params = params;
                handler.call(req).await
            }
            Resolution::NoMatch => match &self.not_found {
                Some(handler) => {
                    debug!(method = %req.method(), path = req.path(), "no route, using not-found handler");
                    handler.call(req).await
                }
                None => self.mux.not_found(),
            },
            Resolution::WrongMethod { pattern, allowed } => match &self.method_not_allowed {
                Some(handler) => {
                    debug!(method = %req.method(), %pattern, "method not allowed, using override handler");
                    let mut res = handler.call(req).await;
                    if res.header("allow").is_none() {
                        res.set_header("allow", &allow_header(&allowed));
                    }
                    res
                }
                None => self.mux.method_not_allowed(&allowed),
            },
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Arc::new(ServeMux::new()), "")
    }
}

// ── Router as a handler ───────────────────────────────────────────────────────

impl<M: Mux> private::Sealed for Router<M> {}

/// A router is itself a handler, so it can be served directly or mounted
/// under a path of another mux.
impl<M: Mux> Handler for Router<M> {
    fn into_boxed_handler(self) -> BoxedHandler {
        BoxedHandler::from_erased(Mounted(Arc::new(self)))
    }
}

struct Mounted<M: Mux>(Arc<Router<M>>);

impl<M: Mux> ErasedHandler for Mounted<M> {
    fn call(&self, req: Request) -> BoxFuture {
        let router = Arc::clone(&self.0);
        Box::pin(async move { router.dispatch(req).await })
    }
}
