//! Generation: one immutable build of every derived structure.
//!
//! A refresh builds a complete [`Generation`] off to the side and
//! [`GenerationStore::publish`] swaps it in. Readers call
//! [`GenerationStore::load`] once per request and keep that `Arc` for the
//! whole request, so they never see a half-built state.

use crate::config::HierarchyConfig;
use crate::hierarchy::{merge_sources, Hierarchy, Overlay, ParentIndex};
use crate::index::{IndexBuilder, SearchIndex};
use crate::synonyms::SynonymTable;
use crate::types::SvgMap;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Everything a refresh consumes, already fetched.
#[derive(Debug, Clone, Default)]
pub struct RefreshInput {
    /// Partial hierarchies in descending priority.
    pub sources: Vec<SvgMap>,
    pub overlay: Option<Overlay>,
    pub synonyms: SynonymTable,
}

#[derive(Debug, Clone)]
pub struct Generation {
    /// Assigned by the store on publish; 0 until then.
    pub number: u64,
    pub built_at: DateTime<Utc>,
    pub hierarchy: Hierarchy,
    pub parents: ParentIndex,
    pub index: SearchIndex,
    /// Built over a copy of the hierarchy with blocklisted groups removed.
    pub blocklisted_index: SearchIndex,
}

impl Generation {
    pub fn build(input: &RefreshInput, config: &HierarchyConfig) -> Self {
        let start = Instant::now();
        let hierarchy = merge_sources(config.roots(), &input.sources, input.overlay.as_ref());
        let parents = hierarchy.parent_index();
        let index = IndexBuilder::new(&hierarchy, &parents, &input.synonyms)
            .ignore(config.ignored_groups.iter().cloned())
            .build();
        let blocklisted_index = build_blocklisted(&hierarchy, &parents, &input.synonyms, config);

        info!(
            groups = hierarchy.len(),
            reachable = parents.len(),
            indexed = index.len(),
            indexed_blocklisted = blocklisted_index.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built generation"
        );
        Self {
            number: 0,
            built_at: Utc::now(),
            hierarchy,
            parents,
            index,
            blocklisted_index,
        }
    }

    /// A generation with nothing in it, for a store that has not refreshed
    /// yet.
    pub fn empty(config: &HierarchyConfig) -> Self {
        Self::build(&RefreshInput::default(), config)
    }

    pub fn index(&self, blocklisted: bool) -> &SearchIndex {
        if blocklisted {
            &self.blocklisted_index
        } else {
            &self.index
        }
    }
}

fn build_blocklisted(
    hierarchy: &Hierarchy,
    parents: &ParentIndex,
    synonyms: &SynonymTable,
    config: &HierarchyConfig,
) -> SearchIndex {
    let mut pruned = hierarchy.clone();
    for id in &config.blocklisted_groups {
        pruned.remove_group(parents, id);
    }
    pruned.recount_descendants();
    let pruned_parents = pruned.parent_index();
    IndexBuilder::new(&pruned, &pruned_parents, synonyms)
        .ignore(config.ignored_groups.iter().chain(&config.blocklisted_groups).cloned())
        .build()
}

// ---------------------------------------------------------------------------
// GenerationStore
// ---------------------------------------------------------------------------

/// Holds the current generation. Lock-free for readers.
#[derive(Debug)]
pub struct GenerationStore {
    current: ArcSwap<Generation>,
    published: AtomicU64,
}

impl GenerationStore {
    pub fn new(initial: Generation) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            published: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current generation.
    pub fn load(&self) -> Arc<Generation> {
        self.current.load_full()
    }

    /// Swap in `generation`, returning the one it replaced.
    pub fn publish(&self, mut generation: Generation) -> Arc<Generation> {
        generation.number = self.published.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation = generation.number, built_at = %generation.built_at, "published generation");
        self.current.swap(Arc::new(generation))
    }

    /// Build from `input` and publish.
    pub fn refresh(&self, input: &RefreshInput, config: &HierarchyConfig) -> Arc<Generation> {
        self.publish(Generation::build(input, config));
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::SVG_ROOT;
    use crate::types::{ChildSv, ChildSvg, SvgNode};

    fn input() -> RefreshInput {
        let source: SvgMap = [
            (SVG_ROOT, SvgNode {
                child_stat_var_groups: vec![ChildSvg::new("dc/g/Bad"), ChildSvg::new("dc/g/Good")],
                ..Default::default()
            }),
            ("dc/g/Bad", SvgNode {
                absolute_name: "Bad".into(),
                child_stat_vars: vec![ChildSv::new("sv_bad", "Quarantined")],
                ..Default::default()
            }),
            ("dc/g/Good", SvgNode {
                absolute_name: "Good".into(),
                child_stat_vars: vec![ChildSv::new("sv_good", "Fine")],
                ..Default::default()
            }),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        RefreshInput {
            sources: vec![source],
            ..Default::default()
        }
    }

    #[test]
    fn blocklisted_variant_drops_subtree() {
        let config = HierarchyConfig {
            blocklisted_groups: vec!["dc/g/Bad".into()],
            ..Default::default()
        };
        let generation = Generation::build(&input(), &config);
        assert!(generation.index(false).contains("sv_bad"));
        assert!(!generation.index(true).contains("sv_bad"));
        assert!(generation.index(true).contains("sv_good"));
        assert!(generation.hierarchy.contains("dc/g/Bad"));
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let config = HierarchyConfig::default();
        let store = GenerationStore::new(Generation::empty(&config));
        let before = store.load();
        let after = store.refresh(&input(), &config);
        assert_eq!(before.number, 0);
        assert!(before.index.is_empty());
        assert_eq!(after.number, 1);
        assert!(after.index.contains("sv_good"));
        assert_eq!(store.load().number, 1);
    }
}
