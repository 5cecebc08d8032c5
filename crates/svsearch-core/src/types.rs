//! Core types for svsearch-core.
//!
//! This module defines the data model shared across all layers: the
//! [`SvgNode`] arena entry and the child references it carries.
//!
//! Field names serialize in camelCase so hierarchy exports produced by the
//! upstream graph pipeline deserialize without a translation layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A partial or merged hierarchy: group id → group node.
///
/// Ordered so that every walk over the table is deterministic.
pub type SvgMap = BTreeMap<String, SvgNode>;

/// A statistical-variable group (SVG).
///
/// Nodes never own each other. Child groups are referenced by id and looked
/// up in the surrounding [`SvgMap`], which is what lets one group appear under
/// several parents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SvgNode {
    /// Human-readable absolute name, e.g. "Person With Age".
    pub absolute_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child_stat_var_groups: Vec<ChildSvg>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child_stat_vars: Vec<ChildSv>,
    /// Number of distinct variables reachable below this group.
    pub descendent_stat_var_count: u32,
    /// Direct parents. Only populated on request-scoped views.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parent_stat_var_groups: Vec<String>,
}

/// Reference from a group to one of its child groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildSvg {
    pub id: String,
    /// Cached name of the entity the child specializes on.
    pub specialized_entity: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    /// Cached copy of the child's own descendant count.
    pub descendent_stat_var_count: u32,
}

impl ChildSvg {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Reference from a group to one of its statistical variables (SV).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildSv {
    pub id: String,
    pub display_name: String,
    /// Alternate names the variable is searchable under.
    pub search_names: Vec<String>,
    /// Comma-separated `prop=value` constraint clauses, possibly empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub definition: String,
    /// Only meaningful on request-scoped views; the canonical hierarchy
    /// always leaves this `false`.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub has_data: bool,
}

impl ChildSv {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        Self {
            id: id.into(),
            search_names: vec![display_name.clone()],
            display_name,
            ..Default::default()
        }
    }
}

/// Whether an indexed id is a variable or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    StatVar,
    StatVarGroup,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::StatVar => write!(f, "sv"),
            NodeKind::StatVarGroup => write!(f, "svg"),
        }
    }
}
