//! Shared test utilities for svsearch integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Every helper is deterministic: hierarchies are built
//! from ordered maps and fake backends answer from fixed rows.

pub mod assertions;
pub mod builders;
pub mod fake_backend;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fake_backend::*;
pub use fixtures::*;
