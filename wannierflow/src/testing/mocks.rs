//! Test doubles for actions and the workflow engine.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::RunContext;
use crate::core::Outputs;
use crate::engine::{
    ProcessHandle, ProcessKind, ProcessRecord, ProcessResult, SubmissionRequest, WorkflowEngine,
};
use crate::errors::{ConfigurationError, EngineError, WannierflowError};
use crate::pipeline::StageAction;

/// An action that submits a fixed, empty request.
#[derive(Debug)]
pub struct StaticAction {
    label: String,
    kind: ProcessKind,
    fail_with: Option<String>,
    calls: Mutex<usize>,
}

impl StaticAction {
    /// Creates an action that submits `kind` under its own label.
    #[must_use]
    pub fn new(label: impl Into<String>, kind: ProcessKind) -> Self {
        Self {
            label: label.into(),
            kind,
            fail_with: None,
            calls: Mutex::new(0),
        }
    }

    /// Creates an action whose preparation always fails.
    #[must_use]
    pub fn failing(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::new(label, ProcessKind::PythonJob)
        }
    }

    /// Returns how many times the action was prepared.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl StageAction for StaticAction {
    fn label(&self) -> &str {
        &self.label
    }

    async fn prepare(&self, _run: &RunContext) -> Result<SubmissionRequest, WannierflowError> {
        *self.calls.lock() += 1;
        match &self.fail_with {
            Some(message) => Err(ConfigurationError::new(message.clone()).into()),
            None => Ok(SubmissionRequest::new(self.kind, self.label.clone(), Outputs::new())),
        }
    }
}

/// An engine that answers each process kind with a scripted result.
///
/// Every submission is recorded. Kinds without a script are rejected.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    scripts: HashMap<ProcessKind, ProcessResult>,
    submissions: Mutex<Vec<SubmissionRequest>>,
    handles: Mutex<HashMap<uuid::Uuid, ProcessKind>>,
    next_pk: AtomicU64,
}

impl ScriptedEngine {
    /// Creates an engine with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the result of a process kind.
    #[must_use]
    pub fn with_result(mut self, kind: ProcessKind, result: ProcessResult) -> Self {
        self.scripts.insert(kind, result);
        self
    }

    /// Scripts a successful result with the given outputs.
    #[must_use]
    pub fn with_outputs(self, kind: ProcessKind, outputs: Outputs) -> Self {
        self.with_result(kind, ProcessResult::ok(outputs))
    }

    /// Returns every submitted request, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<SubmissionRequest> {
        self.submissions.lock().clone()
    }

    /// Returns the submitted process kinds, in order.
    #[must_use]
    pub fn submitted_kinds(&self) -> Vec<ProcessKind> {
        self.submissions.lock().iter().map(|request| request.process).collect()
    }

    /// Returns the last request of a kind.
    #[must_use]
    pub fn submission(&self, kind: ProcessKind) -> Option<SubmissionRequest> {
        self.submissions
            .lock()
            .iter()
            .rev()
            .find(|request| request.process == kind)
            .cloned()
    }
}

#[async_trait]
impl WorkflowEngine for ScriptedEngine {
    async fn submit(&self, request: SubmissionRequest) -> Result<ProcessHandle, EngineError> {
        self.submissions.lock().push(request.clone());
        if !self.scripts.contains_key(&request.process) {
            return Err(EngineError::SubmissionRejected {
                process: request.process.to_string(),
                reason: "no scripted result".to_string(),
            });
        }

        let pk = self.next_pk.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = ProcessHandle::new(pk, request.process, request.call_link_label);
        self.handles.lock().insert(handle.id, handle.process);
        Ok(handle)
    }

    async fn await_completion(&self, handle: &ProcessHandle) -> Result<ProcessRecord, EngineError> {
        let kind = self
            .handles
            .lock()
            .remove(&handle.id)
            .ok_or_else(|| EngineError::UnknownHandle { id: handle.id.to_string() })?;
        let result = self
            .scripts
            .get(&kind)
            .cloned()
            .ok_or_else(|| EngineError::UnknownHandle { id: handle.id.to_string() })?;

        Ok(ProcessRecord {
            handle: handle.clone(),
            state: result.state,
            outputs: result.outputs,
        })
    }
}
