//! Per-run state shared by the stages of one orchestration.
//!
//! This module provides:
//! - an append-only [`ContextStore`] of submitted processes keyed by stage
//! - an [`OutputNamespace`] where inspectors attach accepted outputs
//! - the [`RunContext`] that bundles them with the launch inputs

mod namespace;
mod run;
mod store;

pub use namespace::OutputNamespace;
pub use run::RunContext;
pub use store::{ContextEntry, ContextStore};
