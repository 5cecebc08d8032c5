//! Error types for svsearch-core.
//!
//! Incomplete graph data is not an error anywhere in this crate: missing
//! child ids, cycles and unknown query tokens all degrade to empty results.
//! What remains here are failures a caller must see.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An existence backend failed. Fatal for the query that issued it.
    #[error("existence backend {backend} failed: {message}")]
    Backend { backend: String, message: String },

    /// A request-scoped API was called without an argument it requires.
    #[error("missing required argument: {name}")]
    MissingArgument { name: &'static str },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn backend(backend: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Backend {
            backend: backend.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
