//! Fake existence backend for integration tests.
//!
//! Answers every fetch from fixed rows, records how often it was called and
//! the last query it saw, and can be told to fail.
//!
//! # Example
//!
//! ```rust,no_run
//! let backend = FakeBackend::rollup("bt", &[("geoId/06", "Count_Person", 3)]);
//! let failing = FakeBackend::failing("mixer");
//! assert_eq!(backend.calls(), 0);
//! ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use svsearch_core::existence::{CountRow, PresenceRow};
use svsearch_core::{Error, ExistenceBackend, ExistenceQuery, ExistenceReport};

#[derive(Debug)]
enum Script {
    Report(ExistenceReport),
    Fail(String),
}

#[derive(Debug)]
pub struct FakeBackend {
    name: String,
    script: Script,
    calls: AtomicUsize,
    last_query: Mutex<Option<ExistenceQuery>>,
}

impl FakeBackend {
    fn with(name: &str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        })
    }

    /// Rows of (entity, id, count).
    pub fn rollup(name: &str, rows: &[(&str, &str, u32)]) -> Arc<Self> {
        let rows = rows
            .iter()
            .map(|(entity, id, count)| CountRow {
                entity: entity.to_string(),
                id: id.to_string(),
                count: *count,
            })
            .collect();
        Self::with(name, Script::Report(ExistenceReport::Rollup(rows)))
    }

    /// Rows of (entity, variable).
    pub fn presence(name: &str, rows: &[(&str, &str)]) -> Arc<Self> {
        let rows = rows
            .iter()
            .map(|(entity, variable)| PresenceRow {
                entity: entity.to_string(),
                variable: variable.to_string(),
            })
            .collect();
        Self::with(name, Script::Report(ExistenceReport::Presence(rows)))
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Self::with(name, Script::Fail("deadline exceeded".to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<ExistenceQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExistenceBackend for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &ExistenceQuery) -> svsearch_core::Result<ExistenceReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        match &self.script {
            Script::Report(report) => Ok(report.clone()),
            Script::Fail(message) => Err(Error::backend(&self.name, message)),
        }
    }
}

/// Upcast for `Vec<Arc<dyn ExistenceBackend>>` literals.
pub fn backends<const N: usize>(list: [Arc<FakeBackend>; N]) -> Vec<Arc<dyn ExistenceBackend>> {
    list.into_iter().map(|b| b as Arc<dyn ExistenceBackend>).collect()
}
