//! Existence layer: which candidates have observations for which entities.
//!
//! Backends report in one of two shapes:
//!
//! ```text
//! Rollup    (entity, id, count)   counts already rolled up to groups
//! Presence  (entity, variable)    per-variable existence only
//! ```
//!
//! Presence reports are rolled up here: every group in the candidate set is
//! credited one per (entity, descendant variable) observed. Reports from
//! different backends are then combined with [`merge_max`].
//!
//! All backends are queried concurrently for one aggregation and any single
//! failure fails the aggregation.

use crate::error::Result;
use crate::hierarchy::Hierarchy;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// id → entity → count. A missing entity means "no data", which is not the
/// same thing as a present zero.
pub type ExistenceCounts = HashMap<String, HashMap<String, u32>>;

/// Derived variable → alternative lists of input variables.
pub type FormulaTable = HashMap<String, Vec<Vec<String>>>;

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRow {
    pub entity: String,
    pub id: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresenceRow {
    pub entity: String,
    pub variable: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistenceReport {
    Rollup(Vec<CountRow>),
    Presence(Vec<PresenceRow>),
}

/// What one aggregation asks of every backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistenceQuery {
    /// Requested ids, groups and variables mixed.
    pub ids: Vec<String>,
    /// Every variable whose presence matters: requested variables plus the
    /// descendant variables of requested groups.
    pub variables: Vec<String>,
    pub entities: Vec<String>,
}

#[async_trait]
pub trait ExistenceBackend: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, query: &ExistenceQuery) -> Result<ExistenceReport>;
}

// ---------------------------------------------------------------------------
// Merge strategy
// ---------------------------------------------------------------------------

/// Combine per-backend counts keeping the larger value for each
/// (id, entity) pair.
///
/// Backends may report partial or superseding counts for the same pair and
/// the larger one is the more complete. Never sums.
pub fn merge_max(into: &mut ExistenceCounts, from: ExistenceCounts) {
    for (id, entities) in from {
        let target = into.entry(id).or_default();
        for (entity, count) in entities {
            target
                .entry(entity)
                .and_modify(|c| *c = (*c).max(count))
                .or_insert(count);
        }
    }
}

// ---------------------------------------------------------------------------
// Rollup plan
// ---------------------------------------------------------------------------

/// Per-aggregation lookup from variables to the requested groups that
/// contain them, at any depth.
#[derive(Debug, Default)]
struct RollupPlan {
    requested: HashSet<String>,
    entities: HashSet<String>,
    variables: BTreeSet<String>,
    containing_groups: HashMap<String, Vec<String>>,
}

impl RollupPlan {
    fn new(hierarchy: &Hierarchy, ids: &[String], entities: &[String]) -> Self {
        let mut plan = Self {
            entities: entities.iter().cloned().collect(),
            ..Default::default()
        };
        for id in ids {
            plan.requested.insert(id.clone());
            if hierarchy.contains(id) {
                for sv in hierarchy.descendant_variables(id) {
                    plan.containing_groups.entry(sv.clone()).or_default().push(id.clone());
                    plan.variables.insert(sv);
                }
            } else {
                plan.variables.insert(id.clone());
            }
        }
        plan
    }

    fn query(&self) -> ExistenceQuery {
        let sorted = |set: &HashSet<String>| -> Vec<String> { set.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect() };
        ExistenceQuery {
            ids: sorted(&self.requested),
            variables: self.variables.iter().cloned().collect(),
            entities: sorted(&self.entities),
        }
    }

    fn rollup(&self, rows: Vec<CountRow>) -> ExistenceCounts {
        let mut out = ExistenceCounts::new();
        for row in rows {
            if !self.requested.contains(&row.id) || !self.entities.contains(&row.entity) {
                continue;
            }
            let slot = out.entry(row.id).or_default().entry(row.entity).or_insert(0);
            *slot = (*slot).max(row.count);
        }
        out
    }

    fn presence(&self, rows: Vec<PresenceRow>) -> ExistenceCounts {
        let mut out = ExistenceCounts::new();
        let distinct: HashSet<PresenceRow> = rows.into_iter().collect();
        for row in distinct {
            if !self.entities.contains(&row.entity) {
                continue;
            }
            if self.requested.contains(&row.variable) {
                out.entry(row.variable.clone())
                    .or_default()
                    .entry(row.entity.clone())
                    .or_insert(0);
            }
            for group in self.containing_groups.get(&row.variable).into_iter().flatten() {
                *out.entry(group.clone())
                    .or_default()
                    .entry(row.entity.clone())
                    .or_insert(0) += 1;
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Fans an existence question out to every backend and merges the answers.
#[derive(Debug, Clone, Default)]
pub struct ExistenceAggregator {
    backends: Vec<Arc<dyn ExistenceBackend>>,
    formulas: FormulaTable,
}

impl ExistenceAggregator {
    pub fn new(backends: Vec<Arc<dyn ExistenceBackend>>) -> Self {
        Self {
            backends,
            formulas: FormulaTable::new(),
        }
    }

    pub fn with_formulas(mut self, formulas: FormulaTable) -> Self {
        self.formulas = formulas;
        self
    }

    pub fn backends(&self) -> &[Arc<dyn ExistenceBackend>] {
        &self.backends
    }

    /// id → entity → count for every id in `ids`. Ids with no data for any
    /// entity are still present with an empty inner map.
    pub async fn count(
        &self,
        hierarchy: &Hierarchy,
        ids: &[String],
        entities: &[String],
    ) -> Result<ExistenceCounts> {
        let mut counts = self.count_direct(hierarchy, ids, entities).await?;
        if !self.formulas.is_empty() {
            self.apply_formulas(hierarchy, ids, entities, &mut counts).await?;
        }
        Ok(counts)
    }

    async fn count_direct(
        &self,
        hierarchy: &Hierarchy,
        ids: &[String],
        entities: &[String],
    ) -> Result<ExistenceCounts> {
        let mut counts: ExistenceCounts = ids.iter().map(|id| (id.clone(), HashMap::new())).collect();
        if ids.is_empty() || entities.is_empty() {
            return Ok(counts);
        }
        let plan = RollupPlan::new(hierarchy, ids, entities);
        let query = plan.query();

        let reports = try_join_all(self.backends.iter().map(|backend| {
            let query = &query;
            async move {
                match backend.fetch(query).await {
                    Ok(report) => Ok((backend.name(), report)),
                    Err(err) => {
                        warn!(backend = backend.name(), error = %err, "existence backend failed");
                        Err(err)
                    }
                }
            }
        }))
        .await?;

        for (name, report) in reports {
            let partial = match report {
                ExistenceReport::Rollup(rows) => plan.rollup(rows),
                ExistenceReport::Presence(rows) => plan.presence(rows),
            };
            debug!(backend = name, ids = partial.len(), "existence backend reported");
            merge_max(&mut counts, partial);
        }
        Ok(counts)
    }

    /// Mark an id as having data (count 0) for an entity when some formula
    /// has data for every one of its inputs. Inputs are checked one entity
    /// at a time and their own formulas are not consulted.
    async fn apply_formulas(
        &self,
        hierarchy: &Hierarchy,
        ids: &[String],
        entities: &[String],
        counts: &mut ExistenceCounts,
    ) -> Result<()> {
        for id in ids {
            let Some(formulas) = self.formulas.get(id) else {
                continue;
            };
            for entity in entities {
                if counts.get(id).is_some_and(|m| m.contains_key(entity)) {
                    continue;
                }
                let scope = std::slice::from_ref(entity);
                for inputs in formulas.iter().filter(|f| !f.is_empty()) {
                    let input_counts = self.count_direct(hierarchy, inputs, scope).await?;
                    let complete = inputs
                        .iter()
                        .all(|input| input_counts.get(input).is_some_and(|m| m.contains_key(entity)));
                    if complete {
                        counts.entry(id.clone()).or_default().insert(entity.clone(), 0);
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

/// The `n`-th largest count among entities, `None` when fewer than `n`
/// entities have data. `n` below 1 is treated as 1.
pub fn nth_largest(counts: Option<&HashMap<String, u32>>, n: usize) -> Option<u32> {
    let n = n.max(1);
    let mut values: Vec<u32> = counts?.values().copied().collect();
    if values.len() < n {
        return None;
    }
    values.sort_unstable_by(|a, b| b.cmp(a));
    Some(values[n - 1])
}
