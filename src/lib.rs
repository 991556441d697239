//! # multiplexer
//!
//! Prefix-scoped HTTP routing with overridable fallbacks and composable
//! middleware, on top of a method-aware pattern mux.
//!
//! The mux does the matching. This crate adds three things around it:
//!
//! - **Groups** — [`Router::group`] returns a router over the same mux whose
//!   patterns all get a longer path prefix.
//! - **Fallback overrides** — [`Router::not_found`] for paths nothing matches,
//!   [`Router::method_not_allowed`] for paths that match under other methods.
//! - **Middleware chains** — [`Chain`] composes middleware first-outermost,
//!   and can be extended without disturbing the chain it came from.
//!
//! ## Patterns
//!
//! A pattern is `[METHOD ]PATH`, e.g. `"GET /users/{id}"` or `"/health"`
//! (any method). A router with base path `/api` registers `"GET /users/{id}"`
//! as `"GET /api/users/{id}"`. The prefix is pasted in front of the path
//! verbatim; slashes are never added or removed.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use multiplexer::middleware::{self, Chain, Next};
//! use multiplexer::{Request, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::default()
//!         .not_found(not_found)
//!         .method_not_allowed(method_not_allowed);
//!
//!     let logged = Chain::new([middleware::boxed(middleware::trace())]);
//!     let protected = logged.with(middleware::from_fn(require_token));
//!
//!     let api = app.group("/api");
//!     api.handle("GET /hello", logged.wrap(hello));
//!     api.group("/admin").handle("DELETE /users/{id}", protected.wrap(delete_user));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn hello(_req: Request) -> &'static str {
//!     "hello"
//! }
//!
//! async fn delete_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::text(format!("deleted {id}"))
//! }
//!
//! async fn require_token(req: Request, next: Next) -> Response {
//!     if req.header("authorization").is_none() {
//!         return Response::status(StatusCode::UNAUTHORIZED);
//!     }
//!     next.call(req).await
//! }
//!
//! async fn not_found(_req: Request) -> Response {
//!     Response::builder().status(StatusCode::NOT_FOUND).json(br#"{"error":"not found"}"#.to_vec())
//! }
//!
//! async fn method_not_allowed(_req: Request) -> StatusCode {
//!     StatusCode::METHOD_NOT_ALLOWED
//! }
//! ```

mod error;
mod handler;
mod mux;
mod pattern;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
pub use http::{Method, StatusCode};
pub use middleware::Chain;
pub use mux::{allow_header, Mux, Resolution, ServeMux};
pub use pattern::{prefix_pattern, split_method_and_path};
pub use request::{Request, RequestBuilder};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::{Server, DEFAULT_BODY_LIMIT};
