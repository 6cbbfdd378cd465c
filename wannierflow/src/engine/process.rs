//! Process handles, submissions and terminal records.

use crate::core::{lookup_path, Outputs};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of sub-workflow the orchestration submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    /// DFT SCF + bands workflow.
    PwBands,
    /// Automated Wannierization with parameter optimisation.
    Wannier90Optimize,
    /// Python job running the isosurface extraction.
    PythonJob,
    /// Fermi-surface frequency workflow.
    Skeaf,
}

impl ProcessKind {
    /// Process class name as the engine knows it.
    #[must_use]
    pub fn process_class(&self) -> &'static str {
        match self {
            Self::PwBands => "PwBandsWorkChain",
            Self::Wannier90Optimize => "Wannier90OptimizeWorkChain",
            Self::PythonJob => "PythonJob",
            Self::Skeaf => "SkeafWorkChain",
        }
    }
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.process_class())
    }
}

/// A unit of work handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// What to run.
    pub process: ProcessKind,
    /// Link label of the call (the stage name).
    pub call_link_label: String,
    /// Fully assembled inputs.
    pub inputs: Outputs,
    /// Host the process must run on, when it matters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computer: Option<String>,
}

impl SubmissionRequest {
    /// Creates a new submission.
    #[must_use]
    pub fn new(process: ProcessKind, call_link_label: impl Into<String>, inputs: Outputs) -> Self {
        Self {
            process,
            call_link_label: call_link_label.into(),
            inputs,
            computer: None,
        }
    }

    /// Pins the submission to a host.
    #[must_use]
    pub fn on_computer(mut self, computer: impl Into<String>) -> Self {
        self.computer = Some(computer.into());
        self
    }

    /// Looks up a dotted path in the inputs.
    #[must_use]
    pub fn input(&self, path: &str) -> Option<&serde_json::Value> {
        lookup_path(&self.inputs, path)
    }
}

/// Opaque handle to a submitted process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessHandle {
    /// Unique id.
    pub id: Uuid,
    /// Engine-assigned primary key.
    pub pk: u64,
    /// What was submitted.
    pub process: ProcessKind,
    /// Link label of the call.
    pub call_link_label: String,
}

impl ProcessHandle {
    /// Creates a handle with a fresh id.
    #[must_use]
    pub fn new(pk: u64, process: ProcessKind, call_link_label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pk,
            process,
            call_link_label: call_link_label.into(),
        }
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<PK={}>", self.process, self.pk)
    }
}

/// Terminal state of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessState {
    /// The process ran to completion with an exit status (0 means ok).
    Finished {
        /// Exit status.
        exit_status: i32,
    },
    /// The process raised.
    Excepted {
        /// The exception message.
        message: String,
    },
    /// The process was killed.
    Killed,
}

/// A terminated process and its outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// The handle it was submitted under.
    pub handle: ProcessHandle,
    /// How it terminated.
    pub state: ProcessState,
    /// Output tree.
    #[serde(default)]
    pub outputs: Outputs,
}

impl ProcessRecord {
    /// Returns true if the process finished with exit status 0.
    #[must_use]
    pub fn is_finished_ok(&self) -> bool {
        matches!(self.state, ProcessState::Finished { exit_status: 0 })
    }

    /// Looks up a dotted path in the outputs.
    #[must_use]
    pub fn output(&self, path: &str) -> Option<&serde_json::Value> {
        lookup_path(&self.outputs, path)
    }
}
