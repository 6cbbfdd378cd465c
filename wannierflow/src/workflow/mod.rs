//! The Wannier90 bands workflow.
//!
//! Four stages in a fixed order:
//!
//! | stage | action / inspector | gate |
//! |---|---|---|
//! | `pw_bands` | `run_dft_bands` / `inspect_dft_bands` | always |
//! | `wannier90_bands` | `run_wannierization` / `inspect_wannierization` | always |
//! | `generate_isosurface` | `generate_isosurface` / `inspect_generate_isosurface` | `plot_wannier_functions` |
//! | `skeaf` | `run_fermi_surface_frequencies` / `inspect_fermi_surface_frequencies` | `compute_dhva_frequencies` |

mod actions;
pub mod ports;
pub mod skeaf;

pub use actions::{linspace, GenerateIsosurface, RunDftBands, RunFermiSurfaceFrequencies, RunWannierization};

use crate::assembler::{get_builder, WorkflowInputs};
use crate::codes::CodeSelection;
use crate::config::WorkflowParameters;
use crate::context::RunContext;
use crate::core::{ExitCode, Outputs};
use crate::engine::WorkflowEngine;
use crate::errors::{SequenceValidationError, WannierflowError};
use crate::events::{EventSink, NoOpEventSink};
use crate::pipeline::{ExposeOutputs, Gate, OutlineStep, SequenceBuilder, SequenceReport, Stage, StageSequencer};
use crate::structure::Structure;
use std::sync::Arc;
use tracing::info;

/// Name of the sequence.
pub const WORKFLOW_NAME: &str = "Wannier90BandsWorkflow";
/// DFT bands stage.
pub const PW_BANDS: &str = "pw_bands";
/// Wannierization stage.
pub const WANNIER90_BANDS: &str = "wannier90_bands";
/// Isosurface stage.
pub const GENERATE_ISOSURFACE: &str = "generate_isosurface";
/// Fermi-surface frequency stage.
pub const SKEAF: &str = "skeaf";

/// Builds the four-stage sequence.
///
/// # Errors
///
/// Returns a validation error only if the stage list is malformed.
pub fn build_sequence() -> Result<StageSequencer, SequenceValidationError> {
    SequenceBuilder::new(WORKFLOW_NAME)
        .stage(Stage::new(
            PW_BANDS,
            Arc::new(RunDftBands),
            Arc::new(ExposeOutputs::new("inspect_dft_bands", ExitCode::PW_BANDS_FAILED)),
        ))?
        .stage(Stage::new(
            WANNIER90_BANDS,
            Arc::new(RunWannierization),
            Arc::new(ExposeOutputs::new("inspect_wannierization", ExitCode::WANNIER90_BANDS_FAILED)),
        ))?
        .stage(
            Stage::new(
                GENERATE_ISOSURFACE,
                Arc::new(GenerateIsosurface),
                Arc::new(
                    ExposeOutputs::new("inspect_generate_isosurface", ExitCode::GENERATE_ISOSURFACE_FAILED)
                        .with_ports(&ports::ISOSURFACE_PORTS),
                ),
            )
            .with_gate(Gate::flag("plot_wannier_functions")),
        )?
        .stage(
            Stage::new(
                SKEAF,
                Arc::new(RunFermiSurfaceFrequencies),
                Arc::new(ExposeOutputs::new("inspect_fermi_surface_frequencies", ExitCode::SKEAF_FAILED)),
            )
            .with_gate(Gate::flag("compute_dhva_frequencies")),
        )?
        .build()
}

/// Orchestrates QE, Wannier90 and SKEAF through a workflow engine.
#[derive(Clone)]
pub struct Wannier90BandsWorkflow {
    sequencer: StageSequencer,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Wannier90BandsWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wannier90BandsWorkflow")
            .field("sequencer", &self.sequencer)
            .finish_non_exhaustive()
    }
}

impl Wannier90BandsWorkflow {
    /// Creates the workflow with a no-op event sink.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the stage list is malformed.
    pub fn new() -> Result<Self, WannierflowError> {
        Ok(Self {
            sequencer: build_sequence()?,
            event_sink: Arc::new(NoOpEventSink),
        })
    }

    /// Sets the event sink for every run.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the underlying sequencer.
    #[must_use]
    pub fn sequencer(&self) -> &StageSequencer {
        &self.sequencer
    }

    /// Returns the steps in execution order.
    #[must_use]
    pub fn outline(&self) -> Vec<OutlineStep> {
        self.sequencer.outline()
    }

    /// Creates the context of a new run wired to this workflow's event sink.
    #[must_use]
    pub fn start(&self, inputs: WorkflowInputs) -> RunContext {
        RunContext::new(inputs).with_event_sink(Arc::clone(&self.event_sink))
    }

    /// Runs the workflow on a caller-owned context.
    ///
    /// When a stage aborts with an error, everything attached by the earlier
    /// stages stays readable through `run.outputs` and `run.store`.
    ///
    /// # Errors
    ///
    /// See [`StageSequencer::run`].
    pub async fn run_in(
        &self,
        engine: &dyn WorkflowEngine,
        run: &RunContext,
    ) -> Result<SequenceReport, WannierflowError> {
        self.sequencer.run(engine, run).await
    }

    /// Runs the workflow on already assembled inputs.
    ///
    /// Use [`start`](Self::start) and [`run_in`](Self::run_in) to keep the
    /// partial outputs of a run that aborts with an error.
    ///
    /// # Errors
    ///
    /// See [`StageSequencer::run`].
    pub async fn run(
        &self,
        engine: &dyn WorkflowEngine,
        inputs: WorkflowInputs,
    ) -> Result<SequenceReport, WannierflowError> {
        let run = self.start(inputs);
        self.run_in(engine, &run).await
    }

    /// Assembles the inputs and runs the workflow.
    ///
    /// Configuration and host errors are returned before the engine sees
    /// any submission.
    ///
    /// # Errors
    ///
    /// Returns the assembler's configuration errors or the run's errors.
    pub async fn launch(
        &self,
        engine: &dyn WorkflowEngine,
        codes: &CodeSelection,
        structure: Structure,
        parameters: &WorkflowParameters,
        extra_kwargs: Outputs,
    ) -> Result<SequenceReport, WannierflowError> {
        let inputs = get_builder(codes, structure, parameters, extra_kwargs)?;
        info!(
            formula = %inputs.structure.formula(),
            protocol = %inputs.protocol,
            "Launching {}", WORKFLOW_NAME
        );
        self.run(engine, inputs).await
    }
}
