//! # Wannierflow
//!
//! Orchestration core for Quantum ESPRESSO + Wannier90 bands workflows.
//!
//! A run is a fixed sequence of four stages, each submitting one
//! sub-workflow to an external workflow engine and inspecting it when it
//! finishes:
//!
//! - **DFT bands**: SCF and band structure with `pw.x`
//! - **Wannierization**: disentanglement scan and band interpolation
//! - **Isosurfaces** (optional): `±` contours of the plotted Wannier functions
//! - **dHvA frequencies** (optional): SKEAF on the interpolated Fermi surface
//!
//! The first failing stage ends the run with its declared exit code.
//! Configuration and host errors are raised before anything is submitted.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wannierflow::prelude::*;
//!
//! let parameters = WorkflowParameters::from_json_file("parameters.json")?;
//! let workflow = Wannier90BandsWorkflow::new()?;
//! let report = workflow
//!     .launch(&engine, &codes, structure, &parameters, Outputs::new())
//!     .await?;
//!
//! let outputs = report.into_result()?;
//! let summary = Wannier90Results::new(&outputs).summary();
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod assembler;
pub mod codes;
pub mod config;
pub mod context;
pub mod core;
pub mod electrons;
pub mod engine;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod results;
pub mod structure;
pub mod testing;
pub mod volumetric;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::assembler::{get_builder, StageOverrides, WorkflowInputs};
    pub use crate::codes::{check_codes, CodeDescriptor, CodeResources, CodeSelection, Parallelization};
    pub use crate::config::{
        AdvancedSettings, ElectronicType, FrozenType, ProjectionType, Protocol, SpinType,
        Wannier90Settings, WorkflowParameters,
    };
    pub use crate::context::{ContextStore, OutputNamespace, RunContext};
    pub use crate::core::{ExitCode, Outputs, SequenceState, StageOutcome, StageStatus};
    pub use crate::engine::{
        LocalEngine, ProcessHandle, ProcessKind, ProcessRecord, ProcessResult, ProcessRunner,
        SubmissionRequest, WorkflowEngine,
    };
    pub use crate::errors::{
        ConfigurationError, FileParseError, NonIntegerElectronCountError,
        ResourceHostMismatchError, StageFailure, WannierflowError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{Gate, SequenceReport, Stage, StageSequencer};
    pub use crate::results::Wannier90Results;
    pub use crate::structure::{PseudoPotential, PseudoTable, Structure};
    pub use crate::volumetric::{process_folder, IsosurfaceRunner, VolumetricData};
    pub use crate::workflow::Wannier90BandsWorkflow;
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_prelude_builds_workflow() {
        let workflow = Wannier90BandsWorkflow::new().unwrap();
        assert_eq!(workflow.sequencer().stages().len(), 4);
        assert_eq!(ExitCode::PW_BANDS_FAILED.status, 400);
    }
}
