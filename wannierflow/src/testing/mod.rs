//! Testing utilities for the Wannier90 bands workflow.
//!
//! This module provides:
//! - Canned structures, code selections and process outputs
//! - A scripted workflow engine and a static stage action
//! - Assertions over sequence reports and events

mod assertions;
pub mod fixtures;
pub mod mocks;

pub use assertions::{
    assert_event_sequence, assert_namespaces, assert_sequence_done, assert_sequence_failed_at,
    assert_stage_status,
};
pub use mocks::{ScriptedEngine, StaticAction};
