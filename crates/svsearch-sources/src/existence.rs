//! Existence backends.
//!
//! | Backend | Report | Typical use |
//! |---------|--------|-------------|
//! | [`StaticRollupBackend`] | rollup | overlay import counts, tests |
//! | [`StaticPresenceBackend`] | presence | per-variable tables, tests |
//! | [`JsonExistenceBackend`] | either | CLI, offline exports |

use crate::error::SourceError;
use crate::hierarchy::read_file;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use svsearch_core::existence::{CountRow, PresenceRow};
use svsearch_core::{ExistenceBackend, ExistenceQuery, ExistenceReport};

fn wanted<'q>(query: &'q ExistenceQuery, ids: &'q [String]) -> (HashSet<&'q str>, HashSet<&'q str>) {
    (
        ids.iter().map(String::as_str).collect(),
        query.entities.iter().map(String::as_str).collect(),
    )
}

fn rollup_rows(query: &ExistenceQuery, rows: &[CountRow]) -> ExistenceReport {
    let (ids, entities) = wanted(query, &query.ids);
    ExistenceReport::Rollup(
        rows.iter()
            .filter(|r| ids.contains(r.id.as_str()) && entities.contains(r.entity.as_str()))
            .cloned()
            .collect(),
    )
}

fn presence_rows(query: &ExistenceQuery, rows: &[PresenceRow]) -> ExistenceReport {
    let (variables, entities) = wanted(query, &query.variables);
    ExistenceReport::Presence(
        rows.iter()
            .filter(|r| variables.contains(r.variable.as_str()) && entities.contains(r.entity.as_str()))
            .cloned()
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// In-memory backends
// ---------------------------------------------------------------------------

/// Counts already rolled up to groups.
#[derive(Debug, Clone)]
pub struct StaticRollupBackend {
    name: String,
    rows: Vec<CountRow>,
}

impl StaticRollupBackend {
    pub fn new(name: impl Into<String>, rows: Vec<CountRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

#[async_trait]
impl ExistenceBackend for StaticRollupBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &ExistenceQuery) -> svsearch_core::Result<ExistenceReport> {
        Ok(rollup_rows(query, &self.rows))
    }
}

/// (entity, variable) pairs with data.
#[derive(Debug, Clone)]
pub struct StaticPresenceBackend {
    name: String,
    rows: Vec<PresenceRow>,
}

impl StaticPresenceBackend {
    pub fn new(name: impl Into<String>, rows: Vec<PresenceRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

#[async_trait]
impl ExistenceBackend for StaticPresenceBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &ExistenceQuery) -> svsearch_core::Result<ExistenceReport> {
        Ok(presence_rows(query, &self.rows))
    }
}

// ---------------------------------------------------------------------------
// JSON file backend
// ---------------------------------------------------------------------------

/// File contents: either `{"rollup": [...]}` or `{"presence": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ExistenceFile {
    Rollup(Vec<CountRow>),
    Presence(Vec<PresenceRow>),
}

/// Reads its rows from a JSON file on every fetch. Read and parse failures
/// surface as backend errors.
#[derive(Debug, Clone)]
pub struct JsonExistenceBackend {
    name: String,
    path: PathBuf,
}

impl JsonExistenceBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }
}

#[async_trait]
impl ExistenceBackend for JsonExistenceBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &ExistenceQuery) -> svsearch_core::Result<ExistenceReport> {
        let raw = read_file(&self.name, &self.path).await?;
        let file: ExistenceFile = serde_json::from_str(&raw).map_err(|err| SourceError::Parse {
            name: self.name.clone(),
            path: self.path.clone(),
            err,
        })?;
        Ok(match file {
            ExistenceFile::Rollup(rows) => rollup_rows(query, &rows),
            ExistenceFile::Presence(rows) => presence_rows(query, &rows),
        })
    }
}
