//! Capability interface to the external workflow engine.
//!
//! The orchestration never talks to a concrete scheduler. It hands a
//! [`SubmissionRequest`] to [`WorkflowEngine::submit`], receives a
//! [`ProcessHandle`], and suspends on [`WorkflowEngine::await_completion`]
//! until the engine reports a [`ProcessRecord`]. Adapters for batch
//! schedulers, task queues or the bundled [`LocalEngine`] implement the trait.

mod local;
mod process;

pub use local::{FnRunner, LocalEngine, ProcessResult, ProcessRunner};
pub use process::{ProcessHandle, ProcessKind, ProcessRecord, ProcessState, SubmissionRequest};

use crate::errors::EngineError;
use async_trait::async_trait;

/// Submits units of work and waits for their completion.
///
/// An engine owns scheduling, retries of individual calculations and
/// persistence. The sequencer only needs two calls: a non-blocking hand-off
/// and a suspension point that resolves once the process is terminal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Hands a process over to the engine without waiting for it.
    ///
    /// # Arguments
    ///
    /// * `request` - The process kind, its inputs and the code it runs on
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the submission.
    async fn submit(&self, request: SubmissionRequest) -> Result<ProcessHandle, EngineError>;

    /// Suspends until the process behind `handle` has terminated.
    ///
    /// The returned record carries the terminal state and every output the
    /// process produced, whether or not it finished ok.
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle returned by [`submit`](Self::submit)
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown or the process was lost.
    async fn await_completion(&self, handle: &ProcessHandle) -> Result<ProcessRecord, EngineError>;
}
