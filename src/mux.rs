//! The base mux: a method-aware `pattern → handler` registry.
//!
//! [`Router`](crate::Router) never matches paths itself. It rewrites patterns
//! and asks a [`Mux`] to store and resolve them. Resolution is a three-way
//! answer, so "no route for this path" and "route exists, wrong method" are
//! told apart without guessing:
//!
//! ```text
//! resolve(GET,  "/hello")  → Matched { handler, pattern: "GET /hello", .. }
//! resolve(POST, "/hello")  → WrongMethod { allowed: [GET, HEAD], .. }
//! resolve(HEAD, "/hello")  → Matched { pattern: "GET /hello", .. }
//! resolve(GET,  "/nope")   → NoMatch
//! ```
//!
//! [`ServeMux`] is the stock implementation: one radix tree keyed by path,
//! each leaf holding a handler per method plus an optional any-method handler.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use parking_lot::RwLock;

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::pattern::split_method_and_path;
use crate::response::Response;

/// Outcome of resolving a request against a [`Mux`].
#[derive(Debug)]
pub enum Resolution {
    /// A pattern matched both path and method.
    Matched {
        handler: BoxedHandler,
        /// The full registered pattern, e.g. `"GET /api/users/{id}"`.
        pattern: Arc<str>,
        params: HashMap<String, String>,
    },
    /// Some pattern matched the path, none of them for this method.
    WrongMethod {
        /// Path component of the matched patterns.
        pattern: Arc<str>,
        allowed: Vec<Method>,
    },
    NoMatch,
}

/// A pattern registry the router can delegate to.
///
/// Registration goes through `&self`: one mux is shared by a router and all of
/// its groups.
pub trait Mux: Send + Sync + 'static {
    /// Stores `handler` under `pattern` (`[METHOD ]PATH`).
    fn register(&self, pattern: &str, handler: BoxedHandler) -> Result<(), Error>;

    /// Finds the handler for a request.
    fn resolve(&self, method: &Method, path: &str) -> Resolution;

    /// Response used when nothing matches and the router has no override.
    fn not_found(&self) -> Response {
        Response::builder()
            .status(StatusCode::NOT_FOUND)
            .text("404 page not found")
    }

    /// Response used on a method mismatch when the router has no override.
    fn method_not_allowed(&self, allowed: &[Method]) -> Response {
        Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header("allow", &allow_header(allowed))
            .text("Method Not Allowed")
    }
}

/// Formats an `Allow` header value: `"GET, POST"`.
pub fn allow_header(allowed: &[Method]) -> String {
    allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ")
}

// ── ServeMux ──────────────────────────────────────────────────────────────────

/// The default [`Mux`], backed by a [`matchit`] radix tree.
///
/// Path templates use matchit syntax: `{name}` matches one segment,
/// `{*rest}` matches the remainder. Static segments win over parameters.
#[derive(Default)]
pub struct ServeMux {
    table: RwLock<Table>,
}

#[derive(Default)]
struct Table {
    tree: MatchitRouter<usize>,
    by_path: HashMap<String, usize>,
    routes: Vec<Route>,
}

/// Every handler registered for one path.
struct Route {
    path: Arc<str>,
    methods: Vec<(Method, Arc<str>, BoxedHandler)>,
    any: Option<(Arc<str>, BoxedHandler)>,
}

impl ServeMux {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Mux for ServeMux {
    fn register(&self, pattern: &str, handler: BoxedHandler) -> Result<(), Error> {
        let (method, path) = split_method_and_path(pattern);
        if path.is_empty() {
            return Err(Error::InvalidPattern { pattern: pattern.to_owned(), reason: "empty path" });
        }
        let method = match method.filter(|m| !m.is_empty()) {
            Some(m) => Some(Method::from_bytes(m.as_bytes()).map_err(|_| Error::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: "invalid method token",
            })?),
            None => None,
        };

        let mut table = self.table.write();
        let idx = match table.by_path.get(path) {
            Some(&idx) => idx,
            None => {
                let idx = table.routes.len();
                table.tree.insert(path, idx).map_err(|source| Error::Conflict {
                    pattern: pattern.to_owned(),
                    source,
                })?;
                table.by_path.insert(path.to_owned(), idx);
                table.routes.push(Route { path: path.into(), methods: Vec::new(), any: None });
                idx
            }
        };

        let route = &mut table.routes[idx];
        let duplicate = || Error::Duplicate { pattern: pattern.to_owned() };
        let full: Arc<str> = pattern.into();
        match method {
            Some(m) if route.methods.iter().any(|(have, ..)| *have == m) => return Err(duplicate()),
            Some(m) => route.methods.push((m, full, handler)),
            None if route.any.is_some() => return Err(duplicate()),
            None => route.any = Some((full, handler)),
        }
        Ok(())
    }

    fn resolve(&self, method: &Method, path: &str) -> Resolution {
        let table = self.table.read();
        let Ok(matched) = table.tree.at(path) else {
            return Resolution::NoMatch;
        };
        let route = &table.routes[*matched.value];

        // A GET route also answers HEAD unless HEAD has its own entry.
        let entry = |wanted: &Method| {
            route.methods.iter()
                .find(|(m, ..)| m == wanted)
                .map(|(_, pattern, handler)| (pattern, handler))
        };
        let hit = entry(method)
            .or_else(|| if *method == Method::HEAD { entry(&Method::GET) } else { None })
            .or(route.any.as_ref().map(|(pattern, handler)| (pattern, handler)));

        match hit {
            Some((pattern, handler)) => Resolution::Matched {
                handler: handler.clone(),
                pattern: Arc::clone(pattern),
                params: matched.params.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect(),
            },
            None => {
                let mut allowed: Vec<Method> = route.methods.iter().map(|(m, ..)| m.clone()).collect();
                if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
                    allowed.push(Method::HEAD);
                }
                allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                Resolution::WrongMethod { pattern: Arc::clone(&route.path), allowed }
            }
        }
    }
}
