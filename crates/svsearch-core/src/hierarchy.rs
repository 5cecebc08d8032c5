//! Hierarchy layer: merges ranked partial group graphs into one arena.
//!
//! The hierarchy is a DAG of [`SvgNode`]s keyed by id. Every relationship is
//! an id lookup into the table, so a group shared by several parents is
//! stored once and groups that no path from the root reaches simply sit in
//! the table unindexed.
//!
//! Two operations here walk the graph recursively; both keep an explicit
//! on-path set so that a malformed cycle yields an empty contribution instead
//! of unbounded recursion.

use crate::types::{ChildSvg, SvgMap, SvgNode};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, info};

/// Default root of the group hierarchy. A virtual node linking the top-level
/// category groups.
pub const SVG_ROOT: &str = "dc/g/Root";
/// Root of groups imported from custom data.
pub const CUSTOM_SVG_ROOT: &str = "dc/g/Custom_Root";

// ---------------------------------------------------------------------------
// Roots
// ---------------------------------------------------------------------------

/// The distinguished ids the merge engine treats specially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roots {
    pub root: String,
    pub custom_root: String,
}

impl Default for Roots {
    fn default() -> Self {
        Self {
            root: SVG_ROOT.to_string(),
            custom_root: CUSTOM_SVG_ROOT.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// A merged group hierarchy with recomputed descendant counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    roots: Roots,
    nodes: SvgMap,
}

impl Hierarchy {
    /// Wrap an already merged table and recompute descendant counts.
    pub fn new(roots: Roots, nodes: SvgMap) -> Self {
        let mut hierarchy = Self { roots, nodes };
        hierarchy.recount_descendants();
        hierarchy
    }

    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    pub fn root(&self) -> &str {
        &self.roots.root
    }

    pub fn nodes(&self) -> &SvgMap {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&SvgNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct variable ids referenced by any group.
    pub fn variable_count(&self) -> usize {
        self.nodes
            .values()
            .flat_map(|n| n.child_stat_vars.iter().map(|sv| sv.id.as_str()))
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn into_nodes(self) -> SvgMap {
        self.nodes
    }

    /// Recompute every descendant count reachable from the root.
    ///
    /// A group's count is the size of the union of its own variables and the
    /// descendant sets of its child groups. The cached count on each parent's
    /// child reference is set to the same value. Groups the root cannot reach
    /// keep whatever counts their source carried.
    pub fn recount_descendants(&mut self) {
        let counts: HashMap<String, u32> = {
            let mut memo = HashMap::new();
            let mut on_path = HashSet::new();
            descendants(&self.nodes, &self.roots.root, &mut memo, &mut on_path);
            memo.into_iter()
                .map(|(id, set)| (id.to_string(), set.len() as u32))
                .collect()
        };
        for (id, node) in self.nodes.iter_mut() {
            let Some(&own) = counts.get(id) else {
                continue;
            };
            node.descendent_stat_var_count = own;
            for child in &mut node.child_stat_var_groups {
                child.descendent_stat_var_count = counts.get(&child.id).copied().unwrap_or(0);
            }
        }
    }

    /// All distinct variable ids reachable below `id`. Unknown ids yield an
    /// empty set.
    pub fn descendant_variables(&self, id: &str) -> BTreeSet<String> {
        let mut memo = HashMap::new();
        let mut on_path = HashSet::new();
        descendants(&self.nodes, id, &mut memo, &mut on_path)
            .iter()
            .map(|sv| sv.to_string())
            .collect()
    }

    /// Every group id at or below each of `ids`, following child-group
    /// references only.
    pub fn collect_subtrees<'a, I>(&self, ids: I) -> HashSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let mut stack: Vec<String> = ids
            .into_iter()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.child_stat_var_groups.iter().map(|c| c.id.clone()));
            }
        }
        seen
    }

    /// Build the parent lookup for everything reachable from the root.
    pub fn parent_index(&self) -> ParentIndex {
        ParentIndex::build(self)
    }

    /// Remove a group, every group below it, and every parent's reference to
    /// each removed group. Variables are dropped with their groups.
    ///
    /// Counts are left stale; call [`Hierarchy::recount_descendants`] after
    /// the last removal.
    pub fn remove_group(&mut self, parents: &ParentIndex, id: &str) {
        let mut visited = HashSet::new();
        self.remove_group_inner(parents, id, &mut visited);
    }

    fn remove_group_inner(&mut self, parents: &ParentIndex, id: &str, visited: &mut HashSet<String>) {
        if !visited.insert(id.to_string()) {
            return;
        }
        let children: Vec<String> = self
            .nodes
            .get(id)
            .map(|n| n.child_stat_var_groups.iter().map(|c| c.id.clone()).collect())
            .unwrap_or_default();
        for child in children {
            self.remove_group_inner(parents, &child, visited);
        }
        for parent in parents.parents(id) {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.child_stat_var_groups.retain(|c| c.id != id);
            }
        }
        self.nodes.remove(id);
    }

    /// A pruned copy holding only the given variables.
    ///
    /// A group survives if it still has a variable or any surviving
    /// descendant group; references to pruned groups are dropped and groups
    /// left without children are removed. The canonical hierarchy is not
    /// touched.
    pub fn filter_by_variables(&self, variables: &HashSet<String>) -> Hierarchy {
        let mut result: SvgMap = self
            .nodes
            .iter()
            .map(|(id, node)| {
                let filtered = SvgNode {
                    absolute_name: node.absolute_name.clone(),
                    child_stat_var_groups: node.child_stat_var_groups.clone(),
                    child_stat_vars: node
                        .child_stat_vars
                        .iter()
                        .filter(|sv| variables.contains(&sv.id))
                        .cloned()
                        .collect(),
                    ..Default::default()
                };
                (id.clone(), filtered)
            })
            .collect();

        let valid: HashSet<String> = {
            let mut memo = HashMap::new();
            let mut on_path = HashSet::new();
            for id in result.keys() {
                has_variables(&result, id, &mut memo, &mut on_path);
            }
            memo.into_iter()
                .filter(|(_, ok)| *ok)
                .map(|(id, _)| id.to_string())
                .collect()
        };

        result.retain(|_, node| {
            node.child_stat_var_groups.retain(|c| valid.contains(&c.id));
            !(node.child_stat_vars.is_empty() && node.child_stat_var_groups.is_empty())
        });
        debug!(kept = result.len(), of = self.nodes.len(), "filtered hierarchy by variables");
        Hierarchy::new(self.roots.clone(), result)
    }
}

/// Post-order union of descendant variables, memoized per id.
fn descendants<'a>(
    nodes: &'a SvgMap,
    id: &'a str,
    memo: &mut HashMap<&'a str, Rc<HashSet<&'a str>>>,
    on_path: &mut HashSet<&'a str>,
) -> Rc<HashSet<&'a str>> {
    if let Some(set) = memo.get(id) {
        return Rc::clone(set);
    }
    let Some(node) = nodes.get(id) else {
        return Rc::default();
    };
    if !on_path.insert(id) {
        return Rc::default();
    }
    let mut set: HashSet<&'a str> = node.child_stat_vars.iter().map(|sv| sv.id.as_str()).collect();
    for child in &node.child_stat_var_groups {
        set.extend(descendants(nodes, &child.id, memo, on_path).iter().copied());
    }
    on_path.remove(id);
    let set = Rc::new(set);
    memo.insert(id, Rc::clone(&set));
    set
}

fn has_variables<'a>(
    nodes: &'a SvgMap,
    id: &'a str,
    memo: &mut HashMap<&'a str, bool>,
    on_path: &mut HashSet<&'a str>,
) -> bool {
    if let Some(&ok) = memo.get(id) {
        return ok;
    }
    let Some(node) = nodes.get(id) else {
        return false;
    };
    if !on_path.insert(id) {
        return false;
    }
    let ok = !node.child_stat_vars.is_empty()
        || node
            .child_stat_var_groups
            .iter()
            .any(|c| has_variables(nodes, &c.id, memo, on_path));
    on_path.remove(id);
    memo.insert(id, ok);
    ok
}

// ---------------------------------------------------------------------------
// Merge engine
// ---------------------------------------------------------------------------

/// Nodes from a private import, spliced in after every ranked source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    pub nodes: SvgMap,
    /// Top group of the import; linked under the global root.
    pub root_svg: String,
    pub import_name: String,
}

/// Folds ranked partial hierarchies into one [`Hierarchy`].
///
/// Sources must be added in descending priority. The first source to
/// mention an id supplies its node; later sources can only add child
/// references the node does not have yet.
#[derive(Debug)]
pub struct HierarchyMerger {
    roots: Roots,
    merged: SvgMap,
    custom_root: Option<SvgNode>,
    sources: usize,
}

impl HierarchyMerger {
    pub fn new(roots: Roots) -> Self {
        Self {
            roots,
            merged: SvgMap::new(),
            custom_root: None,
            sources: 0,
        }
    }

    /// Merge one source. The caller's map is only read.
    pub fn add_source(&mut self, source: &SvgMap) -> &mut Self {
        for (id, node) in source {
            if *id == self.roots.custom_root && self.custom_root.is_none() {
                self.custom_root = Some(node.clone());
            }
            match self.merged.get_mut(id) {
                Some(existing) => union_children(existing, node),
                None => {
                    self.merged.insert(id.clone(), node.clone());
                }
            }
        }
        self.sources += 1;
        self
    }

    /// Link the custom root, splice the overlay, and recount.
    pub fn finish(mut self, overlay: Option<&Overlay>) -> Hierarchy {
        let start = Instant::now();
        if let Some(custom) = self.custom_root.take() {
            let custom_id = self.roots.custom_root.clone();
            let root = self.merged.entry(self.roots.root.clone()).or_default();
            if !root.child_stat_var_groups.iter().any(|c| c.id == custom_id) {
                root.child_stat_var_groups.push(ChildSvg {
                    id: custom_id,
                    specialized_entity: custom.absolute_name,
                    ..Default::default()
                });
            }
        }
        if let Some(overlay) = overlay {
            splice_overlay(&mut self.merged, &self.roots.root, overlay);
        }
        let hierarchy = Hierarchy::new(self.roots, self.merged);
        info!(
            sources = self.sources,
            groups = hierarchy.len(),
            variables = hierarchy.variable_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "merged hierarchy"
        );
        hierarchy
    }
}

/// Merge `sources` (descending priority) and an optional overlay.
pub fn merge_sources(roots: Roots, sources: &[SvgMap], overlay: Option<&Overlay>) -> Hierarchy {
    let mut merger = HierarchyMerger::new(roots);
    for source in sources {
        merger.add_source(source);
    }
    merger.finish(overlay)
}

/// First-seen-wins set union of child references.
///
/// References from `incoming` whose id `existing` already lists are dropped;
/// the rest are appended in `incoming` order. The existing node's own fields
/// and counts are never overwritten.
pub fn union_children(existing: &mut SvgNode, incoming: &SvgNode) {
    let mut seen_groups: HashSet<String> = existing
        .child_stat_var_groups
        .iter()
        .map(|c| c.id.clone())
        .collect();
    for child in &incoming.child_stat_var_groups {
        if seen_groups.insert(child.id.clone()) {
            existing.child_stat_var_groups.push(child.clone());
        }
    }
    let mut seen_vars: HashSet<String> = existing
        .child_stat_vars
        .iter()
        .map(|sv| sv.id.clone())
        .collect();
    for sv in &incoming.child_stat_vars {
        if seen_vars.insert(sv.id.clone()) {
            existing.child_stat_vars.push(sv.clone());
        }
    }
}

fn splice_overlay(merged: &mut SvgMap, root_id: &str, overlay: &Overlay) {
    for (id, node) in &overlay.nodes {
        merged.insert(id.clone(), node.clone());
    }
    if overlay.root_svg.is_empty() {
        return;
    }
    let root = merged.entry(root_id.to_string()).or_default();
    if !root.child_stat_var_groups.iter().any(|c| c.id == overlay.root_svg) {
        root.child_stat_var_groups.push(ChildSvg {
            id: overlay.root_svg.clone(),
            specialized_entity: overlay.import_name.clone(),
            display_name: overlay.import_name.clone(),
            descendent_stat_var_count: 0,
        });
    }
}

// ---------------------------------------------------------------------------
// Parent index
// ---------------------------------------------------------------------------

/// Direct parents of every id reachable from the root, sorted.
///
/// Ids with no entry are unreachable and treated as non-existent by the
/// index builder and the query executor. The root itself has no parents but
/// is always reachable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentIndex {
    root: String,
    parents: HashMap<String, Vec<String>>,
}

impl ParentIndex {
    /// Breadth-first walk from the root recording each child's parents.
    pub fn build(hierarchy: &Hierarchy) -> Self {
        let nodes = hierarchy.nodes();
        let root = hierarchy.root().to_string();
        let mut parents: HashMap<String, Vec<String>> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::from([root.as_str()]);
        let mut queue: VecDeque<&str> = VecDeque::from([root.as_str()]);

        while let Some(id) = queue.pop_front() {
            let Some(node) = nodes.get(id) else {
                continue;
            };
            for child in &node.child_stat_var_groups {
                parents.entry(child.id.clone()).or_default().push(id.to_string());
                if seen.insert(child.id.as_str()) {
                    queue.push_back(child.id.as_str());
                }
            }
            for sv in &node.child_stat_vars {
                parents.entry(sv.id.clone()).or_default().push(id.to_string());
            }
        }
        for list in parents.values_mut() {
            list.sort();
            list.dedup();
        }
        Self { root, parents }
    }

    /// Sorted direct parents, empty for the root and unreachable ids.
    pub fn parents(&self, id: &str) -> &[String] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.parents.contains_key(id)
    }

    pub fn is_reachable(&self, id: &str) -> bool {
        id == self.root || self.parents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.parents.iter()
    }

    /// Every group on some path from `id` up to the root, excluding `id`.
    pub fn ancestors(&self, id: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut stack: Vec<&str> = self.parents(id).iter().map(String::as_str).collect();
        while let Some(parent) = stack.pop() {
            if out.insert(parent.to_string()) {
                stack.extend(self.parents(parent).iter().map(String::as_str));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChildSv;
    use pretty_assertions::assert_eq;

    fn group(name: &str, groups: &[&str], vars: &[&str]) -> SvgNode {
        SvgNode {
            absolute_name: name.to_string(),
            child_stat_var_groups: groups.iter().map(|g| ChildSvg::new(*g)).collect(),
            child_stat_vars: vars.iter().map(|v| ChildSv::new(*v, *v)).collect(),
            ..Default::default()
        }
    }

    fn map(entries: Vec<(&str, SvgNode)>) -> SvgMap {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn diamond_counts_shared_variable_once() {
        let h = Hierarchy::new(
            Roots::default(),
            map(vec![
                (SVG_ROOT, group("Root", &["a", "b"], &[])),
                ("a", group("A", &["c"], &["sv1"])),
                ("b", group("B", &["c"], &[])),
                ("c", group("C", &[], &["sv2", "sv3"])),
            ]),
        );
        assert_eq!(h.get(SVG_ROOT).unwrap().descendent_stat_var_count, 3);
        assert_eq!(h.get("a").unwrap().descendent_stat_var_count, 3);
        assert_eq!(h.get("b").unwrap().descendent_stat_var_count, 2);
        let root_refs: Vec<u32> = h.get(SVG_ROOT).unwrap().child_stat_var_groups.iter().map(|c| c.descendent_stat_var_count).collect();
        assert_eq!(root_refs, vec![3, 2]);
    }

    #[test]
    fn missing_child_and_cycle_are_empty() {
        let h = Hierarchy::new(
            Roots::default(),
            map(vec![
                (SVG_ROOT, group("Root", &["a", "ghost"], &[])),
                ("a", group("A", &["b"], &["sv1"])),
                ("b", group("B", &["a"], &["sv2"])),
            ]),
        );
        assert_eq!(h.get(SVG_ROOT).unwrap().descendent_stat_var_count, 2);
        assert_eq!(h.get(SVG_ROOT).unwrap().child_stat_var_groups[1].descendent_stat_var_count, 0);
    }

    #[test]
    fn merge_first_source_wins_then_union() {
        let high = map(vec![("g", SvgNode {
            absolute_name: "High".into(),
            child_stat_vars: vec![ChildSv::new("sv1", "first")],
            ..Default::default()
        })]);
        let low = map(vec![("g", SvgNode {
            absolute_name: "Low".into(),
            child_stat_vars: vec![ChildSv::new("sv1", "second"), ChildSv::new("sv2", "two")],
            ..Default::default()
        })]);
        let h = merge_sources(Roots::default(), &[high.clone(), low], None);
        let g = h.get("g").unwrap();
        assert_eq!(g.absolute_name, "High");
        assert_eq!(g.child_stat_vars.len(), 2);
        assert_eq!(g.child_stat_vars[0].display_name, "first");
        assert_eq!(high["g"].child_stat_vars.len(), 1);
    }

    #[test]
    fn custom_root_linked_once() {
        let base = map(vec![(SVG_ROOT, group("Root", &["dc/g/Demographics"], &[]))]);
        let custom = map(vec![(CUSTOM_SVG_ROOT, group("Custom Variables", &[], &["custom_sv"]))]);
        let h = merge_sources(Roots::default(), &[base, custom.clone(), custom], None);
        let root = h.get(SVG_ROOT).unwrap();
        let linked: Vec<&ChildSvg> = root.child_stat_var_groups.iter().filter(|c| c.id == CUSTOM_SVG_ROOT).collect();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].specialized_entity, "Custom Variables");
        assert_eq!(linked[0].descendent_stat_var_count, 1);
    }

    #[test]
    fn overlay_spliced_under_root() {
        let base = map(vec![(SVG_ROOT, group("Root", &[], &[]))]);
        let overlay = Overlay {
            nodes: map(vec![("private/g/Root", group("Private", &[], &["p1", "p2"]))]),
            root_svg: "private/g/Root".into(),
            import_name: "My Import".into(),
        };
        let h = merge_sources(Roots::default(), &[base], Some(&overlay));
        let child = &h.get(SVG_ROOT).unwrap().child_stat_var_groups[0];
        assert_eq!(child.id, "private/g/Root");
        assert_eq!(child.display_name, "My Import");
        assert_eq!(child.descendent_stat_var_count, 2);
    }

    #[test]
    fn parent_index_skips_orphans_and_sorts() {
        let h = Hierarchy::new(
            Roots::default(),
            map(vec![
                (SVG_ROOT, group("Root", &["z", "a"], &[])),
                ("z", group("Z", &["shared"], &[])),
                ("a", group("A", &["shared"], &["sv"])),
                ("shared", group("Shared", &[], &["sv"])),
                ("orphan", group("Orphan", &[], &["lost"])),
            ]),
        );
        let parents = h.parent_index();
        assert_eq!(parents.parents("shared"), ["a".to_string(), "z".to_string()]);
        assert_eq!(parents.parents("sv"), ["a".to_string(), "shared".to_string()]);
        assert!(!parents.contains("orphan"));
        assert!(!parents.contains("lost"));
        assert!(parents.is_reachable(SVG_ROOT));
        assert_eq!(
            parents.ancestors("sv").into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), SVG_ROOT.into(), "shared".into(), "z".into()]
        );
    }

    #[test]
    fn remove_group_cascades_and_unlinks() {
        let mut h = Hierarchy::new(
            Roots::default(),
            map(vec![
                (SVG_ROOT, group("Root", &["bad", "good"], &[])),
                ("bad", group("Bad", &["bad_child"], &["sv_bad"])),
                ("bad_child", group("Bad child", &[], &["sv_bad_2"])),
                ("good", group("Good", &[], &["sv_good"])),
            ]),
        );
        let parents = h.parent_index();
        h.remove_group(&parents, "bad");
        h.recount_descendants();
        assert!(!h.contains("bad"));
        assert!(!h.contains("bad_child"));
        let root = h.get(SVG_ROOT).unwrap();
        assert_eq!(root.child_stat_var_groups.len(), 1);
        assert_eq!(root.descendent_stat_var_count, 1);
    }

    #[test]
    fn filter_keeps_groups_with_surviving_variables() {
        let h = Hierarchy::new(
            Roots::default(),
            map(vec![
                (SVG_ROOT, group("Root", &["a", "b"], &[])),
                ("a", group("A", &["a1"], &[])),
                ("a1", group("A1", &[], &["keep", "drop"])),
                ("b", group("B", &[], &["drop2"])),
            ]),
        );
        let keep: HashSet<String> = ["keep".to_string()].into();
        let filtered = h.filter_by_variables(&keep);
        assert!(filtered.contains("a1"));
        assert!(!filtered.contains("b"));
        assert_eq!(filtered.get(SVG_ROOT).unwrap().child_stat_var_groups.len(), 1);
        assert_eq!(filtered.get("a1").unwrap().child_stat_vars.len(), 1);
        assert_eq!(filtered.get(SVG_ROOT).unwrap().descendent_stat_var_count, 1);
        assert_eq!(h.get("b").unwrap().child_stat_vars.len(), 1);
    }
}
