//! svsearch: statistical-variable hierarchy search.
//!
//! Re-exports the workspace crates so integration tests and the CLI can
//! import everything from one place.
//!
//! # Architecture
//!
//! ```text
//! HierarchySource ──► Refresher ──► GenerationStore ──► SearchService
//!                                                          │
//!                         ExistenceBackend ◄───────────────┘
//! ```

pub use svsearch_core;
pub use svsearch_sources;

pub use svsearch_core::{
    Error, Generation, GenerationStore, GroupNodeRequest, Result, SearchRequest, SearchResponse,
    SearchService,
};
pub use svsearch_sources::{Refresher, SourceError};
