//! Query layer: AND matching over the trie, ranking and grouping.
//!
//! Everything in this module is synchronous and works on a borrowed
//! [`SearchIndex`]. Existence filtering and truncation happen in
//! [`SearchService`](crate::service::SearchService), which owns the async
//! side.
//!
//! # Matching
//!
//! ```text
//! "female pop"  ──tokenize──►  [female, pop]
//!                                 │      │
//!                      trie prefix walk  trie prefix walk
//!                                 │      │
//!                        hits(id) ∩ hits(id)   (every distinct token)
//! ```

use crate::existence::ExistenceCounts;
use crate::hierarchy::ParentIndex;
use crate::index::{compare_ranked, tokenize, RankingInfo, SearchIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: String,
    /// Scope results to candidates with data for at least one of these.
    pub entities: Vec<String>,
    /// Search the index built without blocklisted groups.
    pub blocklisted: bool,
    /// Return variables only.
    pub sv_only: bool,
    /// Attach variables to their best matched parent group.
    pub grouped: bool,
    /// Result bound; the configured default applies when absent.
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// A matched id with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchResult {
    pub dcid: String,
    pub name: String,
}

/// A matched group with the matched variables attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupResult {
    pub dcid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stat_vars: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub stat_vars: Vec<SearchResult>,
    pub stat_var_groups: Vec<GroupResult>,
    /// Literal name text that satisfied the query, sorted.
    pub matches: Vec<String>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Ranked candidates for one query, before existence filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matches {
    pub stat_vars: Vec<SearchResult>,
    pub stat_var_groups: Vec<SearchResult>,
    pub matches: Vec<String>,
}

impl Matches {
    pub fn is_empty(&self) -> bool {
        self.stat_vars.is_empty() && self.stat_var_groups.is_empty()
    }
}

/// Distinct query tokens, in first-seen order.
pub fn query_tokens(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// id → token → match strings seen for that token.
type Hits<'a> = HashMap<&'a str, HashMap<&'a str, BTreeSet<&'a str>>>;

/// Match every token against the index and keep ids hit by all of them.
///
/// Tokens are expected to be distinct (see [`query_tokens`]). An empty token
/// list or any token without a trie path yields no candidates.
pub fn match_tokens(index: &SearchIndex, tokens: &[String], sv_only: bool) -> Matches {
    if tokens.is_empty() {
        return Matches::default();
    }
    let mut sv_hits: Hits<'_> = HashMap::new();
    let mut svg_hits: Hits<'_> = HashMap::new();

    for token in tokens {
        let Some(node) = index.root().find(token) else {
            debug!(token = %token, "token has no trie path");
            return Matches::default();
        };
        for leaf in node.leaves() {
            let matched = leaf.matches.iter().map(String::as_str);
            for id in &leaf.sv_ids {
                record(&mut sv_hits, id, token, matched.clone());
            }
            if !sv_only {
                for id in &leaf.svg_ids {
                    record(&mut svg_hits, id, token, matched.clone());
                }
            }
        }
    }

    let mut all_matches: BTreeSet<&str> = BTreeSet::new();
    let stat_vars = qualify(index, sv_hits, tokens.len(), &mut all_matches);
    let stat_var_groups = qualify(index, svg_hits, tokens.len(), &mut all_matches);
    debug!(
        tokens = tokens.len(),
        stat_vars = stat_vars.len(),
        stat_var_groups = stat_var_groups.len(),
        "matched query"
    );
    Matches {
        stat_vars,
        stat_var_groups,
        matches: all_matches.into_iter().map(str::to_string).collect(),
    }
}

fn record<'a>(
    hits: &mut Hits<'a>,
    id: &'a str,
    token: &'a str,
    matched: impl Iterator<Item = &'a str>,
) {
    hits.entry(id).or_default().entry(token).or_default().extend(matched);
}

fn qualify<'a>(
    index: &SearchIndex,
    hits: Hits<'a>,
    token_count: usize,
    all_matches: &mut BTreeSet<&'a str>,
) -> Vec<SearchResult> {
    let mut ranked: Vec<(&'a str, &RankingInfo)> = Vec::new();
    for (id, per_token) in hits {
        if per_token.len() != token_count {
            continue;
        }
        let Some(info) = index.ranking(id) else {
            continue;
        };
        for matched in per_token.into_values() {
            all_matches.extend(matched);
        }
        ranked.push((id, info));
    }
    ranked.sort_by(|(a_id, a), (b_id, b)| compare_ranked(a, a_id, b, b_id));
    ranked
        .into_iter()
        .map(|(id, info)| SearchResult {
            dcid: id.to_string(),
            name: info.ranking_name.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Existence filter
// ---------------------------------------------------------------------------

/// Drop candidates without data for any requested entity.
pub fn retain_with_data(results: &mut Vec<SearchResult>, counts: &ExistenceCounts) {
    results.retain(|r| counts.get(&r.dcid).is_some_and(|m| !m.is_empty()));
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Attach each variable to its highest-ranked parent among the matched
/// groups.
///
/// Returns the variables left without a matched parent (order preserved)
/// and every matched group, sorted by attached count descending then rank.
pub fn group_results(
    index: &SearchIndex,
    parents: &ParentIndex,
    stat_vars: Vec<SearchResult>,
    stat_var_groups: Vec<SearchResult>,
) -> (Vec<SearchResult>, Vec<GroupResult>) {
    let fallback = RankingInfo::default();
    let rank = |id: &str| index.ranking(id).unwrap_or(&fallback);
    let matched: HashSet<&str> = stat_var_groups.iter().map(|g| g.dcid.as_str()).collect();

    let mut attached: HashMap<String, Vec<SearchResult>> = HashMap::new();
    let mut top_level = Vec::new();
    for sv in stat_vars {
        let best = parents
            .parents(&sv.dcid)
            .iter()
            .map(String::as_str)
            .filter(|p| matched.contains(p))
            .min_by(|a, b| compare_ranked(rank(*a), a, rank(*b), b));
        match best {
            Some(group) => attached.entry(group.to_string()).or_default().push(sv),
            None => top_level.push(sv),
        }
    }

    let mut groups: Vec<GroupResult> = stat_var_groups
        .into_iter()
        .map(|g| GroupResult {
            stat_vars: attached.remove(&g.dcid).unwrap_or_default(),
            dcid: g.dcid,
            name: g.name,
        })
        .collect();
    groups.sort_by(|a, b| {
        b.stat_vars
            .len()
            .cmp(&a.stat_vars.len())
            .then_with(|| compare_ranked(rank(a.dcid.as_str()), &a.dcid, rank(b.dcid.as_str()), &b.dcid))
    });
    (top_level, groups)
}

/// Groups as a flat response list, nothing attached.
pub fn ungrouped(stat_var_groups: Vec<SearchResult>) -> Vec<GroupResult> {
    stat_var_groups
        .into_iter()
        .map(|g| GroupResult {
            dcid: g.dcid,
            name: g.name,
            stat_vars: Vec::new(),
        })
        .collect()
}
