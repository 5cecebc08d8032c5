//! Refresher: fetch and merge sources, then publish.

use crate::error::SourceError;
use crate::hierarchy::{fetch_all, HierarchySource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use svsearch_core::config::HierarchyConfig;
use svsearch_core::{Generation, GenerationStore, Overlay, RefreshInput, SynonymTable};
use tracing::{info, warn};

/// Rebuilds a generation from registered sources.
///
/// Sources are merged in registration order, so register the most
/// authoritative first.
#[derive(Debug, Clone)]
pub struct Refresher {
    sources: Vec<Arc<dyn HierarchySource>>,
    overlay: Option<Overlay>,
    synonyms_path: Option<PathBuf>,
    config: HierarchyConfig,
}

impl Refresher {
    pub fn new(config: HierarchyConfig) -> Self {
        Self {
            sources: Vec::new(),
            overlay: None,
            synonyms_path: None,
            config,
        }
    }

    pub fn source(mut self, source: Arc<dyn HierarchySource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn overlay(mut self, overlay: Overlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn synonyms(mut self, path: impl Into<PathBuf>) -> Self {
        self.synonyms_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Fetch every source and the synonym table. Any source failure fails
    /// the refresh; a missing synonym table does not.
    pub async fn fetch(&self) -> Result<RefreshInput, SourceError> {
        let start = Instant::now();
        let sources = fetch_all(&self.sources).await?;
        let synonyms = match &self.synonyms_path {
            Some(path) => load_synonyms(path).await,
            None => SynonymTable::new(),
        };
        info!(
            sources = sources.len(),
            synonyms = synonyms.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched refresh input"
        );
        Ok(RefreshInput {
            sources,
            overlay: self.overlay.clone(),
            synonyms,
        })
    }

    /// Fetch, build and publish. The previous generation stays live until
    /// the new one is complete.
    pub async fn refresh(&self, store: &GenerationStore) -> Result<Arc<Generation>, SourceError> {
        let input = self.fetch().await?;
        Ok(store.refresh(&input, &self.config))
    }

    /// Fetch and build a generation without a store.
    pub async fn build(&self) -> Result<Generation, SourceError> {
        let input = self.fetch().await?;
        Ok(Generation::build(&input, &self.config))
    }
}

/// A missing or malformed synonym file yields an empty table.
async fn load_synonyms(path: &Path) -> SynonymTable {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read synonyms, using empty table");
            return SynonymTable::new();
        }
    };
    match SynonymTable::from_json(&raw) {
        Ok(table) => {
            info!(path = %path.display(), entries = table.len(), "loaded synonym table");
            table
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not parse synonyms, using empty table");
            SynonymTable::new()
        }
    }
}
