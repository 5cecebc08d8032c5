//! Hierarchy sources: where partial group maps come from.
//!
//! A refresh fetches every source concurrently and merges the results in the
//! order the sources were registered, highest priority first.

use crate::error::SourceError;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use svsearch_core::SvgMap;
use tracing::debug;

#[async_trait]
pub trait HierarchySource: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// One partial hierarchy. The caller owns the result; sources never see
    /// it again.
    async fn fetch(&self) -> Result<SvgMap, SourceError>;
}

/// Fetch every source at once, keeping registration order in the result.
pub async fn fetch_all(sources: &[Arc<dyn HierarchySource>]) -> Result<Vec<SvgMap>, SourceError> {
    try_join_all(sources.iter().map(|source| async move {
        let map = source.fetch().await?;
        debug!(source = source.name(), groups = map.len(), "fetched hierarchy source");
        Ok::<_, SourceError>(map)
    }))
    .await
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

/// A source that always returns the same map.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    nodes: SvgMap,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, nodes: SvgMap) -> Self {
        Self {
            name: name.into(),
            nodes,
        }
    }
}

#[async_trait]
impl HierarchySource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<SvgMap, SourceError> {
        Ok(self.nodes.clone())
    }
}

// ---------------------------------------------------------------------------
// JsonFileSource
// ---------------------------------------------------------------------------

/// A JSON export of `id → node`, re-read on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    /// Named after the file stem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HierarchySource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<SvgMap, SourceError> {
        let raw = read_file(&self.name, &self.path).await?;
        serde_json::from_str(&raw).map_err(|err| SourceError::Parse {
            name: self.name.clone(),
            path: self.path.clone(),
            err,
        })
    }
}

pub(crate) async fn read_file(name: &str, path: &Path) -> Result<String, SourceError> {
    tokio::fs::read_to_string(path).await.map_err(|err| SourceError::Read {
        name: name.to_string(),
        path: path.to_path_buf(),
        err,
    })
}
