//! svsearch-core: statistical-variable hierarchy and search.
//!
//! This crate exposes the layers as public modules, plus the shared types
//! used across all of them.
//!
//! # Architecture
//!
//! ```text
//! sources ──► Merge ──► ParentIndex ──► IndexBuilder ──► Generation
//!                                                          │
//!  request ──► SearchService ──► match / rank / group ◄────┘
//!                    │
//!                    └──► ExistenceAggregator ──► backends (fan-out)
//! ```
//!
//! Everything in a [`Generation`] is immutable once built. A refresh builds
//! a new one and publishes it through [`GenerationStore`]; only existence
//! backends perform I/O.

pub mod config;
pub mod error;
pub mod existence;
pub mod generation;
pub mod hierarchy;
pub mod index;
pub mod node;
pub mod query;
pub mod service;
pub mod synonyms;
pub mod types;

pub use error::{Error, Result};
pub use existence::{ExistenceAggregator, ExistenceBackend, ExistenceCounts, ExistenceQuery, ExistenceReport};
pub use generation::{Generation, GenerationStore, RefreshInput};
pub use hierarchy::{Hierarchy, HierarchyMerger, Overlay, ParentIndex, Roots};
pub use index::{IndexBuilder, RankingInfo, SearchIndex};
pub use node::GroupNodeRequest;
pub use query::{GroupResult, SearchRequest, SearchResponse, SearchResult};
pub use service::SearchService;
pub use synonyms::SynonymTable;
pub use types::{ChildSv, ChildSvg, NodeKind, SvgMap, SvgNode};
