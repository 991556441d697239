//! End-to-end tests: a real server on an ephemeral port, driven by a hyper
//! HTTP/1 client connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use http::HeaderMap;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use multiplexer::middleware::{self, Chain, Next};
use multiplexer::{BoxedHandler, Error, Method, Request, Response, Router, Server, ServeMux, StatusCode};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), Error>>,
}

impl TestServer {
    async fn start(app: Router) -> Self {
        Self::start_with(app, |server| server).await
    }

    async fn start_with(app: Router, configure: impl FnOnce(Server) -> Server) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();
        let server = configure(Server::from_listener(listener));
        let task = tokio::spawn(server.serve_with_shutdown(app, async move {
            let _ = rx.await;
        }));
        Self { addr, shutdown, task }
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        let result = tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server did not drain in time")
            .expect("server task panicked");
        assert!(result.is_ok());
    }

    async fn send(&self, method: Method, path: &str, headers: &[(&str, &str)]) -> Reply {
        self.send_body(method, path, headers, Bytes::new()).await
    }

    async fn send_body(&self, method: Method, path: &str, headers: &[(&str, &str)], body: Bytes) -> Reply {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        let (mut sender, conn) = http1::handshake(TokioIo::new(stream)).await.unwrap();
        tokio::spawn(conn);

        let mut builder = http::Request::builder()
            .method(method)
            .uri(path)
            .header("host", self.addr.to_string());
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let res = sender.send_request(builder.body(Full::new(body)).unwrap()).await.unwrap();

        let status = res.status();
        let headers = res.headers().clone();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        Reply { status, headers, body: String::from_utf8(body.to_vec()).unwrap() }
    }
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Reply {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn test_middleware(next: BoxedHandler) -> BoxedHandler {
    BoxedHandler::new(move |req: Request| {
        let next = next.clone();
        async move {
            let mut res = next.call(req).await;
            res.set_header("test-middleware", "true");
            res
        }
    })
}

async fn auth_middleware(req: Request, next: Next) -> Response {
    if req.header("authorization").is_none() {
        return Response::status(StatusCode::UNAUTHORIZED);
    }
    next.call(req).await
}

/// A handler that counts how many times it ran.
fn counting(hits: &Arc<AtomicUsize>) -> BoxedHandler {
    let hits = Arc::clone(hits);
    BoxedHandler::new(move |_req: Request| {
        hits.fetch_add(1, Ordering::SeqCst);
        async { StatusCode::OK }
    })
}

#[tokio::test]
async fn middleware_header_on_prefixed_route() {
    let app = Router::new(Arc::new(ServeMux::new()), "/api");
    let dynamic = Chain::default().with(test_middleware);
    app.handle("GET /hello", dynamic.wrap(|_req: Request| async { StatusCode::OK }));

    let server = TestServer::start(app).await;
    let reply = server.send(Method::GET, "/api/hello", &[]).await;
    server.stop().await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.header("test-middleware"), Some("true"));
}

#[tokio::test]
async fn appended_auth_rejects_missing_credentials() {
    let hits = Arc::new(AtomicUsize::new(0));

    let app = Router::new(Arc::new(ServeMux::new()), "/api");
    let logged = Chain::new([middleware::boxed(middleware::trace()), middleware::boxed(test_middleware)]);
    let protected = logged.append([middleware::boxed(middleware::from_fn(auth_middleware))]);
    app.handle("GET /hello", protected.wrap(counting(&hits)));
    app.handle("GET /open", logged.wrap(|_req: Request| async { "open" }));

    let server = TestServer::start(app).await;
    let denied = server.send(Method::GET, "/api/hello", &[]).await;
    let allowed = server.send(Method::GET, "/api/hello", &[("authorization", "Bearer t0ken")]).await;
    let open = server.send(Method::GET, "/api/open", &[]).await;
    server.stop().await;

    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
    assert_eq!(denied.header("test-middleware"), Some("true"));
    assert_eq!(allowed.status, StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(open.status, StatusCode::OK);
    assert_eq!(open.body, "open");
}

#[tokio::test]
async fn unauthenticated_requests_get_401_on_every_api_path() {
    let hits = Arc::new(AtomicUsize::new(0));

    let logged = Chain::default().with(middleware::trace());
    let protected = logged.with(middleware::from_fn(auth_middleware));

    let app = Router::new(Arc::new(ServeMux::new()), "/api")
        .method_not_allowed(protected.wrap(|_req: Request| async { StatusCode::METHOD_NOT_ALLOWED }));
    app.handle("GET /hello", protected.wrap(counting(&hits)));
    app.handle("/users/{id}", protected.wrap(counting(&hits)));

    let server = TestServer::start(app).await;
    let get = server.send(Method::GET, "/api/hello", &[]).await;
    let wrong_method = server.send(Method::POST, "/api/hello", &[]).await;
    let any_method = server.send(Method::DELETE, "/api/users/7", &[]).await;
    let authed_wrong_method =
        server.send(Method::POST, "/api/hello", &[("authorization", "Bearer t0ken")]).await;
    server.stop().await;

    assert_eq!(get.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_method.status, StatusCode::UNAUTHORIZED);
    assert_eq!(any_method.status, StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    assert_eq!(authed_wrong_method.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(authed_wrong_method.header("allow"), Some("GET, HEAD"));
}

#[tokio::test]
async fn custom_not_found_over_the_wire() {
    let app = Router::new(Arc::new(ServeMux::new()), "/").not_found(|_req: Request| async {
        Response::builder().status(StatusCode::NOT_FOUND).text("custom not found handler")
    });

    let server = TestServer::start(app).await;
    let reply = server.send(Method::GET, "/api/blah-blah", &[]).await;
    server.stop().await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, "custom not found handler");
}

#[tokio::test]
async fn custom_method_not_allowed_over_the_wire() {
    let app = Router::new(Arc::new(ServeMux::new()), "/").method_not_allowed(|_req: Request| async {
        Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .text("custom method not allowed handler")
    });
    app.handle_fn("GET api/hello", |_req: Request| async { "hello" });

    let server = TestServer::start(app).await;
    let reply = server.send(Method::POST, "/api/hello", &[]).await;
    let ok = server.send(Method::GET, "/api/hello", &[]).await;
    server.stop().await;

    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(reply.body, "custom method not allowed handler");
    assert_eq!(reply.header("allow"), Some("GET, HEAD"));
    assert_eq!(ok.body, "hello");
}

#[tokio::test]
async fn default_fallbacks_over_the_wire() {
    let app = Router::default();
    app.group("/api").on(Method::PUT, "/items/{id}", |req: Request| async move {
        format!("put {}", req.param("id").unwrap_or_default())
    });

    let server = TestServer::start(app).await;
    let missing = server.send(Method::GET, "/nowhere", &[]).await;
    let wrong = server.send(Method::GET, "/api/items/9", &[]).await;
    let put = server.send(Method::PUT, "/api/items/9", &[]).await;
    server.stop().await;

    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body, "404 page not found");
    assert_eq!(wrong.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(wrong.header("allow"), Some("PUT"));
    assert_eq!(put.body, "put 9");
}

#[tokio::test]
async fn oversized_bodies_are_rejected_before_dispatch() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::default();
    let counted = Arc::clone(&hits);
    app.handle_fn("POST /upload", move |req: Request| {
        counted.fetch_add(1, Ordering::SeqCst);
        let len = req.body().len();
        async move { format!("got {len}") }
    });

    let server = TestServer::start_with(app, |server| server.body_limit(16)).await;
    let small = server.send_body(Method::POST, "/upload", &[], Bytes::from_static(b"0123456789")).await;
    let large = server.send_body(Method::POST, "/upload", &[], Bytes::from(vec![b'x'; 64])).await;
    server.stop().await;

    assert_eq!(small.status, StatusCode::OK);
    assert_eq!(small.body, "got 10");
    assert_eq!(large.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn head_on_a_get_route_over_the_wire() {
    let app = Router::default();
    app.handle_fn("GET /hello", |_req: Request| async { "hello" });

    let server = TestServer::start(app).await;
    let head = server.send(Method::HEAD, "/hello", &[]).await;
    server.stop().await;

    assert_eq!(head.status, StatusCode::OK);
    assert!(head.body.is_empty());
}

#[tokio::test]
async fn router_chain_wraps_every_route() {
    let app = Router::default().with_chain(Chain::default().with(test_middleware));
    app.handle_fn("GET /a", |_req: Request| async { "a" });
    app.group("/g").handle_fn("/b", |_req: Request| async { "b" });

    let server = TestServer::start(app).await;
    let a = server.send(Method::GET, "/a", &[]).await;
    let b = server.send(Method::DELETE, "/g/b", &[]).await;
    let missing = server.send(Method::GET, "/nope", &[]).await;
    server.stop().await;

    assert_eq!(a.header("test-middleware"), Some("true"));
    assert_eq!(b.header("test-middleware"), Some("true"));
    assert_eq!(b.body, "b");
    assert_eq!(missing.header("test-middleware"), None);
}
