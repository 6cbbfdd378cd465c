//! Stage records: gate, action and completion inspector.

use crate::context::RunContext;
use crate::core::{ExitCode, Outputs, StageOutcome};
use crate::engine::{ProcessRecord, SubmissionRequest};
use crate::errors::WannierflowError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A predicate over the run context.
pub type GatePredicate = Arc<dyn Fn(&RunContext) -> bool + Send + Sync>;

/// Decides whether a stage runs.
#[derive(Clone, Default)]
pub enum Gate {
    /// The stage always runs.
    #[default]
    Always,
    /// The stage runs when the named boolean kwarg is true.
    Flag(String),
    /// The stage runs when the predicate holds.
    Predicate(GatePredicate),
}

impl Gate {
    /// Creates a gate on a boolean kwarg.
    #[must_use]
    pub fn flag(key: impl Into<String>) -> Self {
        Self::Flag(key.into())
    }

    /// Creates a gate from a predicate.
    #[must_use]
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&RunContext) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    /// Evaluates the gate against a run.
    #[must_use]
    pub fn evaluate(&self, run: &RunContext) -> bool {
        match self {
            Self::Always => true,
            Self::Flag(key) => run.flag(key),
            Self::Predicate(predicate) => predicate(run),
        }
    }

    /// Short description for outlines and logs; `None` for `Always`.
    #[must_use]
    pub fn describe(&self) -> Option<String> {
        match self {
            Self::Always => None,
            Self::Flag(key) => Some(key.clone()),
            Self::Predicate(_) => Some("<predicate>".to_string()),
        }
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Flag(key) => f.debug_tuple("Flag").field(key).finish(),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// Builds the submission of a stage from the run so far.
///
/// Actions read the launch inputs and the outputs attached by earlier
/// stages. They never submit anything themselves; the sequencer hands the
/// returned request to the engine.
#[async_trait]
pub trait StageAction: Send + Sync {
    /// Step label, e.g. `run_dft_bands`.
    fn label(&self) -> &str;

    /// Assembles the submission.
    ///
    /// # Arguments
    ///
    /// * `run` - The run context with inputs, kwargs and upstream outputs
    ///
    /// # Errors
    ///
    /// Returns an error if a required upstream output or input is missing or
    /// invalid. The sequencer propagates it unchanged.
    async fn prepare(&self, run: &RunContext) -> Result<SubmissionRequest, WannierflowError>;
}

/// Classifies a terminated process as success or failure.
///
/// On success the returned outputs are attached under the stage name. On
/// failure nothing is attached and the sequence halts with the exit code.
#[async_trait]
pub trait Inspector: Send + Sync {
    /// Step label, e.g. `inspect_dft_bands`.
    fn label(&self) -> &str;

    /// Inspects the process record.
    async fn inspect(&self, record: &ProcessRecord) -> StageOutcome;
}

/// Exposes a finished process's outputs, or fails with a fixed exit code.
///
/// With declared ports, every port must be present; otherwise nothing is
/// exposed and the stage fails.
#[derive(Debug, Clone)]
pub struct ExposeOutputs {
    label: String,
    exit_code: ExitCode,
    ports: Option<Vec<String>>,
}

impl ExposeOutputs {
    /// Exposes every output of the process.
    #[must_use]
    pub fn new(label: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            label: label.into(),
            exit_code,
            ports: None,
        }
    }

    /// Restricts exposure to the given ports.
    #[must_use]
    pub fn with_ports(mut self, ports: &[&str]) -> Self {
        self.ports = Some(ports.iter().map(|p| (*p).to_string()).collect());
        self
    }

    /// Returns the exit code reported on failure.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }
}

#[async_trait]
impl Inspector for ExposeOutputs {
    fn label(&self) -> &str {
        &self.label
    }

    async fn inspect(&self, record: &ProcessRecord) -> StageOutcome {
        if !record.is_finished_ok() {
            warn!(process = %record.handle, state = ?record.state, "{} did not finish ok", record.handle.process);
            return StageOutcome::failure(self.exit_code);
        }

        let Some(ports) = &self.ports else {
            return StageOutcome::success(record.outputs.clone());
        };

        let mut exposed = Outputs::new();
        for port in ports {
            match record.outputs.get(port) {
                Some(value) => {
                    exposed.insert(port.clone(), value.clone());
                }
                None => {
                    warn!(process = %record.handle, port = %port, "Declared output port missing");
                    return StageOutcome::failure(self.exit_code);
                }
            }
        }
        StageOutcome::success(exposed)
    }
}

/// One unit of the fixed execution sequence.
#[derive(Clone)]
pub struct Stage {
    name: String,
    gate: Gate,
    action: Arc<dyn StageAction>,
    inspector: Arc<dyn Inspector>,
}

impl Stage {
    /// Creates an always-on stage.
    ///
    /// `name` is both the context key and the output namespace.
    #[must_use]
    pub fn new(name: impl Into<String>, action: Arc<dyn StageAction>, inspector: Arc<dyn Inspector>) -> Self {
        Self {
            name: name.into(),
            gate: Gate::Always,
            action,
            inspector,
        }
    }

    /// Sets the gate.
    #[must_use]
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the gate.
    #[must_use]
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Returns the action.
    #[must_use]
    pub fn action(&self) -> &Arc<dyn StageAction> {
        &self.action
    }

    /// Returns the inspector.
    #[must_use]
    pub fn inspector(&self) -> &Arc<dyn Inspector> {
        &self.inspector
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("gate", &self.gate)
            .field("action", &self.action.label())
            .field("inspector", &self.inspector.label())
            .finish()
    }
}
