//! Unified error type.

use thiserror::Error;

/// The error type returned by multiplexer's fallible operations.
///
/// Application-level outcomes (404, 405, 401, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// two kinds of failure: infrastructure (binding to a port, accepting a
/// connection) and configuration (a route pattern the mux refuses).
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The pattern could not be parsed into a method and a path.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },

    /// The exact method + path pair is already registered.
    #[error("pattern `{pattern}` is already registered")]
    Duplicate { pattern: String },

    /// The path collides with a route already in the radix tree.
    #[error("pattern `{pattern}` conflicts with an existing route: {source}")]
    Conflict {
        pattern: String,
        #[source]
        source: matchit::InsertError,
    },
}

impl Error {
    /// Returns `true` for errors raised while registering routes.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}
