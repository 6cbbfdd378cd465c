//! The mutable context of one orchestration run.

use super::{ContextStore, OutputNamespace};
use crate::assembler::WorkflowInputs;
use crate::events::{EventSink, NoOpEventSink};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Launch inputs plus the state accumulated while stages run.
///
/// Inputs are fixed at construction. Only the sequencer writes to the store
/// and the namespace.
pub struct RunContext {
    run_id: Uuid,
    inputs: WorkflowInputs,
    /// Submitted processes, keyed by stage name.
    pub store: ContextStore,
    /// Outputs accepted by inspectors.
    pub outputs: OutputNamespace,
    event_sink: Arc<dyn EventSink>,
}

impl RunContext {
    /// Creates a context for a fresh run.
    #[must_use]
    pub fn new(inputs: WorkflowInputs) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            inputs,
            store: ContextStore::new(),
            outputs: OutputNamespace::new(),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the launch inputs.
    #[must_use]
    pub fn inputs(&self) -> &WorkflowInputs {
        &self.inputs
    }

    /// Returns a keyword argument.
    #[must_use]
    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.inputs.kwargs.get(key)
    }

    /// Returns a boolean keyword argument, false when absent or not a bool.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.kwarg(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Emits an event through the sink.
    pub async fn emit(&self, event_type: &str, data: Value) {
        self.event_sink.emit(event_type, Some(data)).await;
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("stages", &self.store.stages())
            .field("namespaces", &self.outputs.namespaces())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use serde_json::json;

    #[test]
    fn test_flags_read_from_kwargs() {
        let mut inputs = fixtures::workflow_inputs();
        inputs.kwargs.insert("plot_wannier_functions".to_string(), json!(true));
        inputs.kwargs.insert("compute_dhva_frequencies".to_string(), json!("yes"));

        let run = RunContext::new(inputs);
        assert!(run.flag("plot_wannier_functions"));
        assert!(!run.flag("compute_dhva_frequencies"));
        assert!(!run.flag("missing"));
    }

    #[test]
    fn test_fresh_run_is_empty() {
        let run = RunContext::new(fixtures::workflow_inputs());
        assert!(run.store.is_empty());
        assert!(run.outputs.namespaces().is_empty());
        assert_ne!(run.run_id(), RunContext::new(fixtures::workflow_inputs()).run_id());
    }
}
