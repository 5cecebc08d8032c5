//! Domain-specific assertion macros for svsearch harnesses.
//!
//! These wrap `pretty_assertions` and add context-rich failure messages that
//! make it clear *which* result list was wrong and what it held instead.

use svsearch_core::{SearchResponse, SearchResult};

/// Ids of a result list, in order.
pub fn ids(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.dcid.as_str()).collect()
}

/// Ids of the group list of a response, in order.
pub fn group_ids(response: &SearchResponse) -> Vec<&str> {
    response.stat_var_groups.iter().map(|g| g.dcid.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Result assertions
// ---------------------------------------------------------------------------

/// Assert the exact ranked variable ids of a response.
///
/// ```rust
/// assert_stat_vars!(response, ["Count_Person", "Count_Person_Female"]);
/// ```
#[macro_export]
macro_rules! assert_stat_vars {
    ($response:expr, [$($id:expr),* $(,)?]) => {{
        let response: &svsearch_core::SearchResponse = &$response;
        let actual: Vec<&str> = response.stat_vars.iter().map(|r| r.dcid.as_str()).collect();
        let expected: Vec<&str> = vec![$($id),*];
        pretty_assertions::assert_eq!(
            actual, expected,
            "assert_stat_vars! failed for ranked variable list (matches: {:?})",
            response.matches
        );
    }};
}

/// Assert that an id appears nowhere in a response, neither as a variable,
/// a group, nor attached under a group.
#[macro_export]
macro_rules! assert_not_found {
    ($response:expr, $id:expr) => {{
        let response: &svsearch_core::SearchResponse = &$response;
        let id: &str = $id;
        let in_vars = response.stat_vars.iter().any(|r| r.dcid == id);
        let in_groups = response.stat_var_groups.iter().any(|g| g.dcid == id);
        let attached = response
            .stat_var_groups
            .iter()
            .any(|g| g.stat_vars.iter().any(|r| r.dcid == id));
        if in_vars || in_groups || attached {
            panic!(
                "assert_not_found! failed: {:?} present (vars: {}, groups: {}, attached: {})\n  response: {:#?}",
                id, in_vars, in_groups, attached, response
            );
        }
    }};
}

// ---------------------------------------------------------------------------
// Existence assertions
// ---------------------------------------------------------------------------

/// Assert the count for an (id, entity) pair.
///
/// ```rust
/// assert_count!(counts, "Count_Person", "geoId/06", 5);
/// ```
#[macro_export]
macro_rules! assert_count {
    ($counts:expr, $id:expr, $entity:expr, $expected:expr) => {{
        let counts: &svsearch_core::ExistenceCounts = &$counts;
        let (id, entity): (&str, &str) = ($id, $entity);
        let expected: u32 = $expected;
        match counts.get(id).and_then(|m| m.get(entity)) {
            Some(actual) if *actual == expected => {}
            Some(actual) => panic!(
                "assert_count! failed for ({:?}, {:?}):\n  expected: {}\n  actual:   {}",
                id, entity, expected, actual
            ),
            None => panic!(
                "assert_count! failed: no data for ({:?}, {:?}).\n  entities with data: {:?}",
                id,
                entity,
                counts.get(id).map(|m| m.keys().collect::<Vec<_>>())
            ),
        }
    }};
}

/// Assert that an (id, entity) pair has no data (absent, not zero).
#[macro_export]
macro_rules! assert_no_data {
    ($counts:expr, $id:expr, $entity:expr) => {{
        let counts: &svsearch_core::ExistenceCounts = &$counts;
        let (id, entity): (&str, &str) = ($id, $entity);
        if let Some(actual) = counts.get(id).and_then(|m| m.get(entity)) {
            panic!(
                "assert_no_data! failed: ({:?}, {:?}) has count {}",
                id, entity, actual
            );
        }
    }};
}
