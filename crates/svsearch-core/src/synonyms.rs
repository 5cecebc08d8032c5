//! Synonym table: word or phrase → every synonym it should also be found by.
//!
//! The resource is a JSON list of synonym groups, each group a list of
//! mutually synonymous words or phrases:
//!
//! ```json
//! [["female", "women", "woman"], ["population", "people"]]
//! ```
//!
//! A word that appears in several groups maps to the concatenation of all of
//! them. The table is immutable once built.

use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymTable {
    map: HashMap<String, Vec<String>>,
}

impl SynonymTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from synonym groups.
    pub fn from_groups<I, G, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for group in groups {
            let group: Vec<String> = group.into_iter().map(Into::into).collect();
            for word in &group {
                map.entry(word.clone()).or_default().extend(group.iter().cloned());
            }
        }
        Self { map }
    }

    /// Parse the JSON resource format.
    pub fn from_json(raw: &str) -> Result<Self> {
        let groups: Vec<Vec<String>> = serde_json::from_str(raw)?;
        Ok(Self::from_groups(groups))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let table = Self::from_json(&raw)?;
        info!(path = %path.display(), entries = table.len(), "loaded synonym table");
        Ok(table)
    }

    /// Load the resource, falling back to an empty table if it is missing
    /// or malformed. A refresh never fails on synonyms.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::from_path(path) {
            Ok(table) => table,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not load synonyms, using empty table");
                Self::default()
            }
        }
    }

    pub fn get(&self, word: &str) -> Option<&[String]> {
        self.map.get(word).map(Vec::as_slice)
    }

    /// Keys that are phrases of more than one word.
    pub fn phrases(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.map
            .iter()
            .filter(|(k, _)| k.split_whitespace().nth(1).is_some())
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
