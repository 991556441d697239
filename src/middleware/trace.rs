//! Per-request tracing span with method, path, status, and latency.

use std::time::Instant;

use tracing::{info, info_span, Instrument};

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Middleware;
use crate::request::Request;

/// Returns the tracing middleware.
///
/// Every request runs inside an `http_request` span carrying `method` and
/// `path`; one `info` event with `status` and `latency_ms` is emitted when the
/// inner handler returns. Place it first in a chain so the latency covers the
/// other layers too.
pub fn trace() -> Trace {
    Trace
}

/// Middleware returned by [`trace`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxedHandler::from_erased(Traced { next })
    }
}

struct Traced {
    next: BoxedHandler,
}

impl ErasedHandler for Traced {
    fn call(&self, req: Request) -> BoxFuture {
        let span = info_span!("http_request", method = %req.method(), path = %req.path());
        let next = self.next.clone();
        Box::pin(
            async move {
                let started = Instant::now();
                let res = next.call(req).await;
                info!(
                    status = res.status_code().as_u16(),
                    latency_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "request finished"
                );
                res
            }
            .instrument(span),
        )
    }
}
