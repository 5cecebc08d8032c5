//! Error types for svsearch-sources.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{name}: cannot read {path}: {err}")]
    Read {
        name: String,
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("{name}: malformed JSON in {path}: {err}")]
    Parse {
        name: String,
        path: PathBuf,
        #[source]
        err: serde_json::Error,
    },

    #[error("{name}: unavailable: {message}")]
    Unavailable { name: String, message: String },
}

impl SourceError {
    pub fn name(&self) -> &str {
        match self {
            SourceError::Read { name, .. }
            | SourceError::Parse { name, .. }
            | SourceError::Unavailable { name, .. } => name,
        }
    }
}

impl From<SourceError> for svsearch_core::Error {
    fn from(err: SourceError) -> Self {
        svsearch_core::Error::backend(err.name().to_string(), &err)
    }
}
