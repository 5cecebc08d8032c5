//! Search index: a character trie over variable and group names.
//!
//! Every token of a node's names (plus the variable's own id and any
//! synonyms) is inserted one character per trie level. The terminal node of
//! a token carries a [`Leaf`] listing the ids that produced it and the
//! literal text in the name that produced it, which is what search results
//! report for highlighting.
//!
//! # Ranking
//!
//! | Node | `approx_num_pv` | `num_known_pv` |
//! |------|-----------------|----------------|
//! | variable with definition | clauses outside the known vocabulary | clauses inside it |
//! | variable without definition | `_`-separated id segments | same as approx |
//! | group | `_`-separated id segments | same as approx |
//!
//! A single-segment id gets [`NON_CURATED_NUM_PV`] so it sorts after every
//! curated node.

use crate::hierarchy::{Hierarchy, ParentIndex};
use crate::synonyms::SynonymTable;
use crate::types::{ChildSv, NodeKind, SvgNode};
use phf::phf_set;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::Instant;
use tracing::info;

/// Specificity assigned to ids without an underscore. Only needs to exceed
/// the clause count of any curated variable.
pub const NON_CURATED_NUM_PV: usize = 30;

/// Properties every curated variable carries. They say little about how
/// specific a variable is, so they only break ties.
static KNOWN_PROPERTIES: phf::Set<&'static str> = phf_set! {
    "mp",
    "pt",
    "st",
    "mq",
};

// ---------------------------------------------------------------------------
// Tokenization
// ---------------------------------------------------------------------------

/// Lower-case, treat commas as spaces, split on whitespace.
///
/// Shared by index building and query parsing so both sides agree on what a
/// token is.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text).split_whitespace().map(str::to_string).collect()
}

fn normalize(text: &str) -> String {
    text.to_lowercase().replace(',', " ")
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingInfo {
    /// Estimated number of constraining clauses. Lower is more general.
    pub approx_num_pv: usize,
    /// Clauses from the known vocabulary. Tie-break only.
    pub num_known_pv: usize,
    pub ranking_name: String,
}

impl RankingInfo {
    pub fn for_variable(sv: &ChildSv) -> Self {
        let (approx_num_pv, num_known_pv) = if sv.definition.is_empty() {
            let approx = segment_estimate(&sv.id);
            (approx, approx)
        } else {
            let (mut other, mut known) = (0, 0);
            for clause in sv.definition.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                let property = clause.split_once('=').map_or(clause, |(p, _)| p).trim();
                if KNOWN_PROPERTIES.contains(property) {
                    known += 1;
                } else {
                    other += 1;
                }
            }
            (other, known)
        };
        Self {
            approx_num_pv,
            num_known_pv,
            ranking_name: sv.display_name.clone(),
        }
    }

    pub fn for_group(id: &str, node: &SvgNode) -> Self {
        let approx = segment_estimate(id);
        Self {
            approx_num_pv: approx,
            num_known_pv: approx,
            ranking_name: node.absolute_name.clone(),
        }
    }
}

fn segment_estimate(id: &str) -> usize {
    match id.split('_').count() {
        1 => NON_CURATED_NUM_PV,
        n => n,
    }
}

/// Total order used for every ranked list: specificity, known clauses,
/// name, then id.
pub fn compare_ranked(a: &RankingInfo, a_id: &str, b: &RankingInfo, b_id: &str) -> Ordering {
    a.approx_num_pv
        .cmp(&b.approx_num_pv)
        .then(a.num_known_pv.cmp(&b.num_known_pv))
        .then_with(|| a.ranking_name.cmp(&b.ranking_name))
        .then_with(|| a_id.cmp(b_id))
}

// ---------------------------------------------------------------------------
// Trie
// ---------------------------------------------------------------------------

/// Payload of a node where at least one token ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaf {
    pub sv_ids: BTreeSet<String>,
    pub svg_ids: BTreeSet<String>,
    /// Text in the indexed names that produced the tokens ending here.
    pub matches: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    leaf: Option<Leaf>,
}

impl TrieNode {
    pub fn insert(&mut self, key: &str, id: &str, kind: NodeKind, matched: &str) {
        let mut node = self;
        for c in key.chars() {
            node = node.children.entry(c).or_default();
        }
        let leaf = node.leaf.get_or_insert_with(Leaf::default);
        match kind {
            NodeKind::StatVar => leaf.sv_ids.insert(id.to_string()),
            NodeKind::StatVarGroup => leaf.svg_ids.insert(id.to_string()),
        };
        leaf.matches.insert(matched.to_string());
    }

    /// Follow `prefix` one character at a time. `None` as soon as a
    /// character has no child.
    pub fn find(&self, prefix: &str) -> Option<&TrieNode> {
        let mut node = self;
        for c in prefix.chars() {
            node = node.children.get(&c)?;
        }
        Some(node)
    }

    pub fn child(&self, c: char) -> Option<&TrieNode> {
        self.children.get(&c)
    }

    pub fn leaf(&self) -> Option<&Leaf> {
        self.leaf.as_ref()
    }

    /// Every leaf in the subtree rooted here, including this node's own.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }
}

pub struct Leaves<'a> {
    stack: Vec<&'a TrieNode>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Leaf;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            self.stack.extend(node.children.values());
            if let Some(leaf) = &node.leaf {
                return Some(leaf);
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// SearchIndex
// ---------------------------------------------------------------------------

/// Trie plus ranking table. Every ranked id ends at some leaf and every id
/// at a leaf is ranked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchIndex {
    root: TrieNode,
    ranking: HashMap<String, RankingInfo>,
}

impl SearchIndex {
    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    pub fn ranking(&self, id: &str) -> Option<&RankingInfo> {
        self.ranking.get(id)
    }

    pub fn rankings(&self) -> impl Iterator<Item = (&String, &RankingInfo)> {
        self.ranking.iter()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ranking.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ranking.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }

    /// Index a variable under its search names, its id, and their synonyms.
    pub fn add_variable(&mut self, sv: &ChildSv, synonyms: &SynonymTable) {
        if sv.id.is_empty() {
            return;
        }
        let joined = sv.search_names.join(" ");
        let id_match = if joined.contains(&sv.id) { sv.id.as_str() } else { "" };
        let mut keys = vec![(sv.id.to_lowercase(), id_match.to_string())];
        keys.extend(name_keys(&joined, synonyms));
        self.insert_keys(&sv.id, NodeKind::StatVar, &keys);
        self.ranking.insert(sv.id.clone(), RankingInfo::for_variable(sv));
    }

    /// Index a group under its absolute name and synonyms.
    pub fn add_group(&mut self, id: &str, node: &SvgNode, synonyms: &SynonymTable) {
        let keys = name_keys(&node.absolute_name, synonyms);
        if keys.is_empty() {
            return;
        }
        self.insert_keys(id, NodeKind::StatVarGroup, &keys);
        self.ranking.insert(id.to_string(), RankingInfo::for_group(id, node));
    }

    fn insert_keys(&mut self, id: &str, kind: NodeKind, keys: &[(String, String)]) {
        for (key, matched) in keys {
            self.root.insert(key, id, kind, matched);
        }
    }
}

/// (index key, match text) pairs for a name.
///
/// Each token maps to itself and to each of its single-word synonyms, all
/// reporting the token as their match. Multi-word table keys count only
/// when the phrase occurs in the processed name, and report the phrase.
fn name_keys(name: &str, synonyms: &SynonymTable) -> Vec<(String, String)> {
    let tokens = tokenize(name);
    let mut keys = Vec::new();
    for token in &tokens {
        keys.push((token.clone(), token.clone()));
        for synonym in synonyms.get(token).unwrap_or_default() {
            if is_single_word(synonym) {
                keys.push((synonym.clone(), token.clone()));
            }
        }
    }
    if tokens.len() > 1 {
        let processed = tokens.join(" ");
        for (phrase, phrase_synonyms) in synonyms.phrases() {
            if !processed.contains(phrase) {
                continue;
            }
            for synonym in phrase_synonyms.iter().filter(|s| is_single_word(s)) {
                keys.push((synonym.clone(), phrase.to_string()));
            }
        }
    }
    keys
}

fn is_single_word(s: &str) -> bool {
    let mut words = s.split_whitespace();
    words.next().is_some() && words.next().is_none()
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds a [`SearchIndex`] from a merged hierarchy.
///
/// Groups under an ignored root, and groups the root cannot reach, are
/// skipped along with their variables. A variable listed by several groups
/// is indexed the first time an eligible group lists it.
pub struct IndexBuilder<'a> {
    hierarchy: &'a Hierarchy,
    parents: &'a ParentIndex,
    synonyms: &'a SynonymTable,
    ignored_roots: Vec<String>,
    index_groups: bool,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(hierarchy: &'a Hierarchy, parents: &'a ParentIndex, synonyms: &'a SynonymTable) -> Self {
        Self {
            hierarchy,
            parents,
            synonyms,
            ignored_roots: Vec::new(),
            index_groups: true,
        }
    }

    /// Exclude these groups and everything below them.
    pub fn ignore<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_roots.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Whether groups themselves become searchable. On by default.
    pub fn index_groups(mut self, yes: bool) -> Self {
        self.index_groups = yes;
        self
    }

    pub fn build(self) -> SearchIndex {
        let start = Instant::now();
        let ignored: HashSet<String> = self
            .hierarchy
            .collect_subtrees(self.ignored_roots.iter().map(String::as_str));
        let mut index = SearchIndex::default();
        let mut seen_sv: HashSet<&str> = HashSet::new();
        let mut groups = 0usize;

        for (svg_id, node) in self.hierarchy.nodes() {
            if ignored.contains(svg_id) || !self.parents.is_reachable(svg_id) {
                continue;
            }
            if self.index_groups && svg_id != self.hierarchy.root() {
                index.add_group(svg_id, node, self.synonyms);
                groups += 1;
            }
            for sv in &node.child_stat_vars {
                if seen_sv.insert(sv.id.as_str()) {
                    index.add_variable(sv, self.synonyms);
                }
            }
        }
        info!(
            variables = seen_sv.len(),
            groups,
            ignored = ignored.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built search index"
        );
        index
    }
}
