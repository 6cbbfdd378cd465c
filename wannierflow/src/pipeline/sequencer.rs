//! The stage sequencer.
//!
//! Stages run strictly in their static order. For each stage the gate is
//! evaluated; a closed gate skips the stage. An open gate leads to the
//! action being prepared and submitted, the sequencer suspending until the
//! engine reports completion, the process being recorded in the context
//! store, and the inspector classifying it. On success the outputs are
//! attached under the stage name. On failure no later stage is touched and
//! the report carries the stage's exit code.

use super::Stage;
use crate::context::{ContextEntry, RunContext};
use crate::core::{ExitCode, Outputs, SequenceState, StageOutcome, StageRecord, StageStatus};
use crate::engine::WorkflowEngine;
use crate::errors::{StageFailure, WannierflowError};
use crate::events::{self, stage_payload};
use crate::observability::stage_span;
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

/// One line of the sequence outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineStep {
    /// Stage the step belongs to.
    pub stage: String,
    /// Step label.
    pub step: String,
    /// Gate guarding the step, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
}

/// Result of running a sequence to a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    /// The run id.
    pub run_id: Uuid,
    /// The sequence name.
    pub sequence: String,
    /// Terminal state, `Done` or `Failed(i)`.
    pub state: SequenceState,
    /// One record per stage reached, in order.
    pub records: Vec<StageRecord>,
    /// Exit code of the failed stage, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<ExitCode>,
    /// The output namespace at termination.
    pub outputs: Outputs,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
}

impl SequenceReport {
    /// Returns true if the sequence reached `Done`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == SequenceState::Done
    }

    /// Returns the record of a stage.
    #[must_use]
    pub fn record(&self, stage: &str) -> Option<&StageRecord> {
        self.records.iter().find(|record| record.name == stage)
    }

    /// Returns the name of the failed stage, if any.
    #[must_use]
    pub fn failed_stage(&self) -> Option<&str> {
        self.records
            .iter()
            .find(|record| record.status == StageStatus::Failed)
            .map(|record| record.name.as_str())
    }

    /// Returns the stages whose action was submitted, in order.
    #[must_use]
    pub fn submitted_stages(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|record| record.process_id.is_some())
            .map(|record| record.name.as_str())
            .collect()
    }

    /// Returns the stages with the given status, in order.
    #[must_use]
    pub fn stages_with_status(&self, status: StageStatus) -> Vec<&str> {
        self.records
            .iter()
            .filter(|record| record.status == status)
            .map(|record| record.name.as_str())
            .collect()
    }

    /// Converts the report into the output tree or the stage failure.
    ///
    /// # Errors
    ///
    /// Returns `StageFailure` if a stage failed.
    pub fn into_result(self) -> Result<Outputs, WannierflowError> {
        let failure = self
            .failed_stage()
            .map(str::to_string)
            .zip(self.exit_code);
        match failure {
            Some((stage, exit_code)) => Err(StageFailure::new(stage, exit_code).into()),
            None => Ok(self.outputs),
        }
    }
}

/// Runs a fixed list of stages against a workflow engine.
#[derive(Debug, Clone)]
pub struct StageSequencer {
    name: String,
    stages: Vec<Stage>,
}

impl StageSequencer {
    pub(super) fn new(name: String, stages: Vec<Stage>) -> Self {
        Self { name, stages }
    }

    /// Returns the sequence name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stages in order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns the stage names in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Returns the action and inspector steps in execution order.
    #[must_use]
    pub fn outline(&self) -> Vec<OutlineStep> {
        self.stages
            .iter()
            .flat_map(|stage| {
                let gate = stage.gate().describe();
                [stage.action().label(), stage.inspector().label()]
                    .into_iter()
                    .map(move |step| OutlineStep {
                        stage: stage.name().to_string(),
                        step: step.to_string(),
                        gate: gate.clone(),
                    })
            })
            .collect()
    }

    /// Runs every stage in order until the sequence is done or a stage fails.
    ///
    /// A stage rejected by its inspector yields `Ok` with a `Failed` state and
    /// the stage's exit code.
    ///
    /// # Errors
    ///
    /// Returns the error of an action that could not be prepared, an engine
    /// error, or a context conflict. Nothing after the failing stage runs.
    pub async fn run(
        &self,
        engine: &dyn WorkflowEngine,
        run: &RunContext,
    ) -> Result<SequenceReport, WannierflowError> {
        let start = Instant::now();
        let stage_count = self.stages.len();
        let mut state = SequenceState::INITIAL;
        let mut records = Vec::with_capacity(stage_count);

        info!(sequence = %self.name, run_id = %run.run_id(), stages = stage_count, "Starting sequence");

        for (index, stage) in self.stages.iter().enumerate() {
            let payload = stage_payload(run.run_id(), stage.name(), index);
            let mut record = StageRecord::started(stage.name());

            if !stage.gate().evaluate(run) {
                state = self.advance(state, SequenceState::Skipped(index));
                info!(stage = %stage.name(), gate = ?stage.gate(), "Gate closed, skipping stage");
                run.emit(events::STAGE_SKIPPED, payload).await;
                records.push(record.finish(StageStatus::Skipped));
                state = self.advance(state, self.after(index));
                continue;
            }

            state = self.advance(state, SequenceState::Running(index));
            run.emit(events::STAGE_STARTED, payload.clone()).await;

            let span = stage_span(&self.name, &run.run_id().to_string(), stage.name(), index);
            let executed = self
                .execute_stage(stage, engine, run, &mut record, &payload)
                .instrument(span)
                .await;
            let outcome = match executed {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(stage = %stage.name(), error = %err, "Stage aborted");
                    record.error = Some(err.to_string());
                    records.push(record.finish(StageStatus::Failed));

                    let mut failed = payload;
                    failed["error"] = json!(err.to_string());
                    run.emit(events::STAGE_FAILED, failed.clone()).await;
                    run.emit(events::SEQUENCE_FAILED, failed).await;
                    return Err(err);
                }
            };

            match outcome {
                StageOutcome::Success { .. } => {
                    state = self.advance(state, SequenceState::Completed(index));
                    info!(stage = %stage.name(), "{} completed successfully", stage.name());
                    run.emit(events::STAGE_COMPLETED, payload).await;
                    records.push(record.finish(StageStatus::Completed));
                    state = self.advance(state, self.after(index));
                }
                StageOutcome::Failure { exit_code } => {
                    state = self.advance(state, SequenceState::Failed(index));
                    warn!(stage = %stage.name(), exit_code = %exit_code, "{} failed", stage.name());
                    record.exit_code = Some(exit_code);
                    records.push(record.finish(StageStatus::Failed));

                    let mut failed = payload;
                    failed["exit_status"] = json!(exit_code.status);
                    failed["exit_label"] = json!(exit_code.label);
                    run.emit(events::STAGE_FAILED, failed.clone()).await;
                    run.emit(events::SEQUENCE_FAILED, failed).await;

                    return Ok(self.report(run, state, records, Some(exit_code), start));
                }
            }
        }

        info!(sequence = %self.name, run_id = %run.run_id(), "Sequence done");
        run.emit(
            events::SEQUENCE_COMPLETED,
            json!({
                "run_id": run.run_id().to_string(),
                "namespaces": run.outputs.namespaces(),
            }),
        )
        .await;

        Ok(self.report(run, state, records, None, start))
    }

    async fn execute_stage(
        &self,
        stage: &Stage,
        engine: &dyn WorkflowEngine,
        run: &RunContext,
        record: &mut StageRecord,
        payload: &serde_json::Value,
    ) -> Result<StageOutcome, WannierflowError> {
        debug!(stage = %stage.name(), step = %stage.action().label(), "Preparing submission");
        let request = stage.action().prepare(run).await?;
        let handle = engine.submit(request).await?;
        record.process_id = Some(handle.id);

        info!(stage = %stage.name(), pk = handle.pk, "submitting `{}` <PK={}>", handle.process, handle.pk);
        let mut submitted = payload.clone();
        submitted["process"] = json!(handle.process.process_class());
        submitted["pk"] = json!(handle.pk);
        run.emit(events::STAGE_SUBMITTED, submitted).await;

        let process = engine.await_completion(&handle).await?;
        run.store.insert(
            stage.name(),
            ContextEntry {
                handle,
                record: process.clone(),
            },
        )?;

        debug!(stage = %stage.name(), step = %stage.inspector().label(), "Inspecting process");
        let outcome = stage.inspector().inspect(&process).await;
        if let StageOutcome::Success { outputs } = &outcome {
            run.outputs.attach(stage.name(), outputs.clone())?;
        }
        Ok(outcome)
    }

    fn after(&self, index: usize) -> SequenceState {
        if index + 1 < self.stages.len() {
            SequenceState::Pending(index + 1)
        } else {
            SequenceState::Done
        }
    }

    fn advance(&self, from: SequenceState, to: SequenceState) -> SequenceState {
        debug_assert!(
            from.can_transition_to(to, self.stages.len()),
            "illegal transition {from} -> {to}"
        );
        debug!(sequence = %self.name, from = %from, to = %to, "Sequence transition");
        to
    }

    fn report(
        &self,
        run: &RunContext,
        state: SequenceState,
        records: Vec<StageRecord>,
        exit_code: Option<ExitCode>,
        start: Instant,
    ) -> SequenceReport {
        SequenceReport {
            run_id: run.run_id(),
            sequence: self.name.clone(),
            state,
            records,
            exit_code,
            outputs: run.outputs.to_tree(),
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }
}
