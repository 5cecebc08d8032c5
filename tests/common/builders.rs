//! Test builders: ergonomic constructors for groups, hierarchies and
//! services.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use std::sync::Arc;
use svsearch_core::config::{HierarchyConfig, SearchConfig};
use svsearch_core::hierarchy::SVG_ROOT;
use svsearch_core::{
    ChildSv, ChildSvg, ExistenceAggregator, ExistenceBackend, Generation, GenerationStore,
    Hierarchy, RefreshInput, Roots, SearchService, SvgMap, SvgNode, SynonymTable,
};

// ---------------------------------------------------------------------------
// GroupBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`SvgNode`] test fixtures.
///
/// # Example
///
/// ```rust
/// let node = GroupBuilder::new("Person With Age")
///     .group("dc/g/Person_Age_Female")
///     .var("Count_Person_Upto5Years", "Population Under 5")
///     .build();
/// ```
pub struct GroupBuilder {
    node: SvgNode,
}

impl GroupBuilder {
    pub fn new(absolute_name: impl Into<String>) -> Self {
        Self {
            node: SvgNode {
                absolute_name: absolute_name.into(),
                ..Default::default()
            },
        }
    }

    pub fn group(mut self, id: impl Into<String>) -> Self {
        self.node.child_stat_var_groups.push(ChildSvg::new(id));
        self
    }

    pub fn var(mut self, id: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.node.child_stat_vars.push(ChildSv::new(id, display_name));
        self
    }

    /// Variable with a `prop=value,...` definition.
    pub fn defined_var(
        mut self,
        id: impl Into<String>,
        display_name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        let mut sv = ChildSv::new(id, display_name);
        sv.definition = definition.into();
        self.node.child_stat_vars.push(sv);
        self
    }

    /// Variable searchable under several names.
    pub fn aliased_var(mut self, id: impl Into<String>, names: &[&str]) -> Self {
        let mut sv = ChildSv::new(id, names.first().copied().unwrap_or_default());
        sv.search_names = names.iter().map(|n| n.to_string()).collect();
        self.node.child_stat_vars.push(sv);
        self
    }

    pub fn build(self) -> SvgNode {
        self.node
    }
}

// ---------------------------------------------------------------------------
// HierarchyBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for a partial hierarchy map.
///
/// ```rust
/// let map = HierarchyBuilder::new()
///     .root(&["dc/g/Demographics"])
///     .group("dc/g/Demographics", GroupBuilder::new("Demographics").var("Count_Person", "Population"))
///     .build_map();
/// ```
#[derive(Default)]
pub struct HierarchyBuilder {
    nodes: SvgMap,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default root listing `children`.
    pub fn root(self, children: &[&str]) -> Self {
        let mut root = GroupBuilder::new("");
        for child in children {
            root = root.group(*child);
        }
        self.group(SVG_ROOT, root)
    }

    pub fn group(mut self, id: impl Into<String>, node: GroupBuilder) -> Self {
        self.nodes.insert(id.into(), node.build());
        self
    }

    pub fn build_map(self) -> SvgMap {
        self.nodes
    }

    pub fn build(self) -> Hierarchy {
        Hierarchy::new(Roots::default(), self.nodes)
    }
}

// ---------------------------------------------------------------------------
// Generation / service helpers
// ---------------------------------------------------------------------------

/// Build a generation from sources with the default hierarchy config.
pub fn generation_from(sources: Vec<SvgMap>) -> Generation {
    generation_with(sources, SynonymTable::new(), HierarchyConfig::default())
}

pub fn generation_with(sources: Vec<SvgMap>, synonyms: SynonymTable, config: HierarchyConfig) -> Generation {
    let input = RefreshInput {
        sources,
        overlay: None,
        synonyms,
    };
    Generation::build(&input, &config)
}

/// A service over `generation` answering existence from `backends`.
pub fn service_with(generation: Generation, backends: Vec<Arc<dyn ExistenceBackend>>) -> SearchService {
    SearchService::new(
        Arc::new(GenerationStore::new(generation)),
        ExistenceAggregator::new(backends),
        SearchConfig::default(),
    )
}

/// A service with no existence backends.
pub fn service_from(sources: Vec<SvgMap>) -> SearchService {
    service_with(generation_from(sources), Vec::new())
}
