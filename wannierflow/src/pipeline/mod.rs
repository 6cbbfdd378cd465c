//! Stage sequencing.
//!
//! This module provides:
//! - [`Stage`] records with a gate, an action and a completion inspector
//! - a [`SequenceBuilder`] that validates the static stage order
//! - the [`StageSequencer`] that drives a run through the engine

mod builder;
mod integration_tests;
mod sequencer;
mod stage;

pub use builder::SequenceBuilder;
pub use sequencer::{OutlineStep, SequenceReport, StageSequencer};
pub use stage::{ExposeOutputs, Gate, GatePredicate, Inspector, Stage, StageAction};
