//! Request-scoped view of a single group.
//!
//! The view is a fresh copy. Child display names and counts come from the
//! canonical hierarchy, and with entities present the counts are replaced by
//! what the existence aggregator reports for those entities.

use crate::error::{Error, Result};
use crate::existence::{nth_largest, ExistenceAggregator};
use crate::generation::Generation;
use crate::types::SvgNode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupNodeRequest {
    pub stat_var_group: String,
    pub entities: Vec<String>,
    /// How many entities must have data for a child to count as having
    /// data. Values below 1 mean 1.
    pub num_entities_existence: usize,
}

impl GroupNodeRequest {
    pub fn new(stat_var_group: impl Into<String>) -> Self {
        Self {
            stat_var_group: stat_var_group.into(),
            entities: Vec::new(),
            num_entities_existence: 1,
        }
    }
}

pub async fn group_node(
    generation: &Generation,
    aggregator: &ExistenceAggregator,
    request: &GroupNodeRequest,
) -> Result<SvgNode> {
    let svg = request.stat_var_group.as_str();
    if svg.is_empty() {
        return Err(Error::MissingArgument { name: "stat_var_group" });
    }
    let hierarchy = &generation.hierarchy;
    let mut view = hierarchy.get(svg).cloned().unwrap_or_default();

    for child in &mut view.child_stat_var_groups {
        if let Some(node) = hierarchy.get(&child.id) {
            child.display_name = node.absolute_name.clone();
            child.descendent_stat_var_count = node.descendent_stat_var_count;
        }
    }
    for sv in &mut view.child_stat_vars {
        sv.has_data = true;
    }
    view.parent_stat_var_groups = generation.parents.parents(svg).to_vec();

    if request.entities.is_empty() {
        return Ok(view);
    }

    let n = request.num_entities_existence.max(1);
    let ids: Vec<String> = std::iter::once(svg.to_string())
        .chain(view.child_stat_var_groups.iter().map(|c| c.id.clone()))
        .chain(view.child_stat_vars.iter().map(|sv| sv.id.clone()))
        .chain(view.parent_stat_var_groups.iter().cloned())
        .collect();
    let counts = aggregator.count(hierarchy, &ids, &request.entities).await?;

    view.descendent_stat_var_count = nth_largest(counts.get(svg), n).unwrap_or(0);
    for child in &mut view.child_stat_var_groups {
        child.descendent_stat_var_count = nth_largest(counts.get(&child.id), n).unwrap_or(0);
    }
    for sv in &mut view.child_stat_vars {
        sv.has_data = counts.get(&sv.id).is_some_and(|m| m.len() >= n);
    }
    Ok(view)
}
