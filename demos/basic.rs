//! Minimal multiplexer example — a versioned API group, a protected admin
//! group, and custom fallbacks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/api/v1/users/42
//!   curl -i -X POST http://localhost:3000/api/v1/users/42      # 405 + Allow: GET, HEAD
//!   curl -i http://localhost:3000/nope                          # custom 404
//!   curl -i -X DELETE http://localhost:3000/api/v1/admin/users/42              # 401
//!   curl -i -X DELETE -H 'authorization: Bearer x' \
//!        http://localhost:3000/api/v1/admin/users/42                            # 204

use multiplexer::middleware::{self, Chain, Next};
use multiplexer::{Request, Response, Router, Server, StatusCode};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // Every route is traced; admin routes also need a token.
    let app = Router::default()
        .with_chain(Chain::new([middleware::boxed(middleware::trace())]))
        .not_found(not_found)
        .method_not_allowed(method_not_allowed);

    let v1 = app.group("/api/v1");
    v1.handle("GET /users/{id}", get_user);

    let admin = v1.group("/admin").with_chain(v1.chain().with(middleware::from_fn(require_token)));
    admin.handle("DELETE /users/{id}", delete_user);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /api/v1/users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// DELETE /api/v1/admin/users/{id} → 204 No Content
async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn require_token(req: Request, next: Next) -> Response {
    if req.header("authorization").is_none() {
        return Response::status(StatusCode::UNAUTHORIZED);
    }
    next.call(req).await
}

async fn not_found(req: Request) -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .json(format!(r#"{{"error":"no route for {}"}}"#, req.path()).into_bytes())
}

async fn method_not_allowed(req: Request) -> Response {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .json(format!(r#"{{"error":"{} not allowed"}}"#, req.method()).into_bytes())
}
