//! Search service: the request-facing entry point.
//!
//! Ties the published generation, the existence aggregator and the search
//! limits together:
//!
//! 1. tokenize; an empty query returns an empty response
//! 2. match against the requested index variant and rank
//! 3. with entities, cap each list at `prefilter_cap` and drop candidates
//!    the aggregator reports no data for
//! 4. optionally group variables under matched groups
//! 5. truncate to the request limit

use crate::config::SearchConfig;
use crate::error::Result;
use crate::existence::{ExistenceAggregator, ExistenceCounts};
use crate::generation::{Generation, GenerationStore};
use crate::node::{group_node, GroupNodeRequest};
use crate::query::{
    group_results, match_tokens, query_tokens, retain_with_data, ungrouped, SearchRequest,
    SearchResponse,
};
use crate::types::SvgNode;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SearchService {
    store: Arc<GenerationStore>,
    aggregator: ExistenceAggregator,
    config: SearchConfig,
}

impl SearchService {
    pub fn new(store: Arc<GenerationStore>, aggregator: ExistenceAggregator, config: SearchConfig) -> Self {
        Self {
            store,
            aggregator,
            config,
        }
    }

    pub fn store(&self) -> &Arc<GenerationStore> {
        &self.store
    }

    pub fn generation(&self) -> Arc<Generation> {
        self.store.load()
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let start = Instant::now();
        let tokens = query_tokens(&request.query);
        if tokens.is_empty() {
            return Ok(SearchResponse::default());
        }
        let generation = self.store.load();
        let index = generation.index(request.blocklisted);
        let mut found = match_tokens(index, &tokens, request.sv_only);

        if !request.entities.is_empty() && !found.is_empty() {
            found.stat_vars.truncate(self.config.prefilter_cap);
            found.stat_var_groups.truncate(self.config.prefilter_cap);
            let ids: Vec<String> = found
                .stat_vars
                .iter()
                .chain(&found.stat_var_groups)
                .map(|r| r.dcid.clone())
                .collect();
            let counts = self
                .aggregator
                .count(&generation.hierarchy, &ids, &request.entities)
                .await?;
            retain_with_data(&mut found.stat_vars, &counts);
            retain_with_data(&mut found.stat_var_groups, &counts);
        }

        let (mut stat_vars, mut stat_var_groups) = if request.grouped {
            group_results(index, &generation.parents, found.stat_vars, found.stat_var_groups)
        } else {
            (found.stat_vars, ungrouped(found.stat_var_groups))
        };
        let limit = request.limit.unwrap_or(self.config.default_limit);
        stat_vars.truncate(limit);
        stat_var_groups.truncate(limit);

        debug!(
            query = %request.query,
            generation = generation.number,
            stat_vars = stat_vars.len(),
            stat_var_groups = stat_var_groups.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "search complete"
        );
        Ok(SearchResponse {
            stat_vars,
            stat_var_groups,
            matches: found.matches,
        })
    }

    pub async fn group_node(&self, request: &GroupNodeRequest) -> Result<SvgNode> {
        let generation = self.store.load();
        group_node(&generation, &self.aggregator, request).await
    }

    /// Raw existence counts against the current hierarchy.
    pub async fn existence(&self, ids: &[String], entities: &[String]) -> Result<ExistenceCounts> {
        let generation = self.store.load();
        self.aggregator.count(&generation.hierarchy, ids, entities).await
    }
}
