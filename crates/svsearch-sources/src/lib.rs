//! svsearch-sources: adapters that feed the svsearch core.
//!
//! Hierarchy sources produce partial group maps for a refresh; existence
//! backends answer per-query existence questions. Each comes in an
//! in-memory flavour (tests, overlays) and a JSON-file flavour (the CLI,
//! offline exports).

pub mod error;
pub mod existence;
pub mod hierarchy;
pub mod refresh;

pub use error::SourceError;
pub use existence::{JsonExistenceBackend, StaticPresenceBackend, StaticRollupBackend};
pub use hierarchy::{HierarchySource, JsonFileSource, StaticSource};
pub use refresh::Refresher;
