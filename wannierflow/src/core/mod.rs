//! Core domain model types for wannierflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage status and sequence state enums
//! - Declared exit codes
//! - Stage outcomes and records

mod exit_code;
mod outcome;
mod record;
mod status;

pub use exit_code::ExitCode;
pub use outcome::{lookup_path, Outputs, StageOutcome};
pub use record::StageRecord;
pub use status::{SequenceState, StageStatus};
