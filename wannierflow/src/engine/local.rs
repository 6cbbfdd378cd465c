//! In-process engine backed by tokio tasks.

use super::{ProcessHandle, ProcessKind, ProcessRecord, ProcessState, SubmissionRequest, WorkflowEngine};
use crate::core::Outputs;
use crate::errors::EngineError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Terminal state and outputs produced by a runner.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessResult {
    /// How the process terminated.
    pub state: ProcessState,
    /// What it produced.
    pub outputs: Outputs,
}

impl ProcessResult {
    /// A successful result.
    #[must_use]
    pub fn ok(outputs: Outputs) -> Self {
        Self {
            state: ProcessState::Finished { exit_status: 0 },
            outputs,
        }
    }

    /// A result with a non-zero exit status.
    #[must_use]
    pub fn failed(exit_status: i32) -> Self {
        Self {
            state: ProcessState::Finished { exit_status },
            outputs: Outputs::new(),
        }
    }

    /// A result for a process that raised.
    #[must_use]
    pub fn excepted(message: impl Into<String>) -> Self {
        Self {
            state: ProcessState::Excepted {
                message: message.into(),
            },
            outputs: Outputs::new(),
        }
    }
}

/// Executes one kind of process.
#[async_trait]
pub trait ProcessRunner: Send + Sync + Debug {
    /// Runs the process to completion.
    async fn run(&self, request: SubmissionRequest) -> ProcessResult;
}

/// A closure-based runner.
pub struct FnRunner<F>
where
    F: Fn(&SubmissionRequest) -> ProcessResult + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnRunner<F>
where
    F: Fn(&SubmissionRequest) -> ProcessResult + Send + Sync,
{
    /// Creates a new closure-based runner.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnRunner<F>
where
    F: Fn(&SubmissionRequest) -> ProcessResult + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRunner").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> ProcessRunner for FnRunner<F>
where
    F: Fn(&SubmissionRequest) -> ProcessResult + Send + Sync,
{
    async fn run(&self, request: SubmissionRequest) -> ProcessResult {
        (self.func)(&request)
    }
}

/// Engine that runs every process as a tokio task in this process.
#[derive(Debug, Default)]
pub struct LocalEngine {
    runners: HashMap<ProcessKind, Arc<dyn ProcessRunner>>,
    tasks: DashMap<Uuid, JoinHandle<ProcessResult>>,
    next_pk: AtomicU64,
}

impl LocalEngine {
    /// Creates an engine with no runners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the runner for a process kind.
    #[must_use]
    pub fn with_runner(mut self, kind: ProcessKind, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runners.insert(kind, runner);
        self
    }

    /// Returns the number of submitted processes not yet awaited.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}

#[async_trait]
impl WorkflowEngine for LocalEngine {
    async fn submit(&self, request: SubmissionRequest) -> Result<ProcessHandle, EngineError> {
        let runner = self
            .runners
            .get(&request.process)
            .cloned()
            .ok_or_else(|| EngineError::SubmissionRejected {
                process: request.process.to_string(),
                reason: "no runner registered".to_string(),
            })?;

        let pk = self.next_pk.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = ProcessHandle::new(pk, request.process, &request.call_link_label);
        debug!(process = %handle, label = %request.call_link_label, "Spawning local process");

        let task = tokio::spawn(async move { runner.run(request).await });
        self.tasks.insert(handle.id, task);
        Ok(handle)
    }

    async fn await_completion(&self, handle: &ProcessHandle) -> Result<ProcessRecord, EngineError> {
        let (_, task) = self
            .tasks
            .remove(&handle.id)
            .ok_or_else(|| EngineError::UnknownHandle {
                id: handle.id.to_string(),
            })?;

        let result = task.await.map_err(|err| EngineError::Join(err.to_string()))?;
        info!(process = %handle, state = ?result.state, "Local process terminated");

        Ok(ProcessRecord {
            handle: handle.clone(),
            state: result.state,
            outputs: result.outputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_runner() -> Arc<dyn ProcessRunner> {
        Arc::new(FnRunner::new("echo", |request: &SubmissionRequest| {
            ProcessResult::ok(request.inputs.clone())
        }))
    }

    #[tokio::test]
    async fn test_submit_and_await() {
        let engine = LocalEngine::new().with_runner(ProcessKind::PwBands, echo_runner());
        let mut inputs = Outputs::new();
        inputs.insert("protocol".to_string(), serde_json::json!("fast"));

        let handle = engine
            .submit(SubmissionRequest::new(ProcessKind::PwBands, "pw_bands", inputs))
            .await
            .unwrap();
        assert_eq!(handle.pk, 1);
        assert_eq!(engine.pending(), 1);

        let record = engine.await_completion(&handle).await.unwrap();
        assert!(record.is_finished_ok());
        assert_eq!(record.output("protocol"), Some(&serde_json::json!("fast")));
        assert_eq!(engine.pending(), 0);
    }

    #[tokio::test]
    async fn test_unregistered_kind_rejected() {
        let engine = LocalEngine::new();
        let result = engine
            .submit(SubmissionRequest::new(ProcessKind::Skeaf, "skeaf", Outputs::new()))
            .await;
        assert!(matches!(result, Err(EngineError::SubmissionRejected { .. })));
    }

    #[tokio::test]
    async fn test_await_twice_is_unknown() {
        let engine = LocalEngine::new().with_runner(ProcessKind::PythonJob, echo_runner());
        let handle = engine
            .submit(SubmissionRequest::new(ProcessKind::PythonJob, "generate_isosurface", Outputs::new()))
            .await
            .unwrap();

        engine.await_completion(&handle).await.unwrap();
        let again = engine.await_completion(&handle).await;
        assert!(matches!(again, Err(EngineError::UnknownHandle { .. })));
    }

    #[tokio::test]
    async fn test_failed_result() {
        let runner: Arc<dyn ProcessRunner> =
            Arc::new(FnRunner::new("fail", |_: &SubmissionRequest| ProcessResult::failed(401)));
        let engine = LocalEngine::new().with_runner(ProcessKind::Wannier90Optimize, runner);
        let handle = engine
            .submit(SubmissionRequest::new(ProcessKind::Wannier90Optimize, "wannier90_bands", Outputs::new()))
            .await
            .unwrap();

        let record = engine.await_completion(&handle).await.unwrap();
        assert!(!record.is_finished_ok());
        assert_eq!(record.state, ProcessState::Finished { exit_status: 401 });
    }
}
