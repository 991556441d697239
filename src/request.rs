//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};

/// An incoming HTTP request with its body fully buffered.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(method: Method, path: String, headers: HeaderMap, body: Bytes) -> Self {
        Self { method, path, headers, body, params: HashMap::new() }
    }

    /// Starts building a request by hand.
    ///
    /// Handlers never need this; it exists so middleware and handlers can be
    /// exercised without a socket:
    ///
    /// ```rust
    /// use multiplexer::{Method, Request};
    ///
    /// let req = Request::builder(Method::POST, "/api/users")
    ///     .header("authorization", "Bearer t0ken")
    ///     .body(r#"{"name":"alice"}"#)
    ///     .build();
    /// assert_eq!(req.header("Authorization"), Some("Bearer t0ken"));
    /// ```
    pub fn builder(method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder { inner: Self::new(method, path.into(), HeaderMap::new(), Bytes::new()) }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Values that are not visible ASCII
    /// are reported as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Builder returned by [`Request::builder`].
pub struct RequestBuilder {
    inner: Request,
}

impl RequestBuilder {
    /// Appends a header.
    ///
    /// # Panics
    ///
    /// Panics if `name` or `value` is not a valid HTTP header token.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name = HeaderName::from_bytes(name.as_bytes())
            .unwrap_or_else(|e| panic!("invalid header name `{name}`: {e}"));
        let value = HeaderValue::from_str(value)
            .unwrap_or_else(|e| panic!("invalid header value `{value}`: {e}"));
        self.inner.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.inner.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        self.inner
    }
}
