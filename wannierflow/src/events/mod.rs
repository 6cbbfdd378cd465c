//! Lifecycle events emitted by the stage sequencer.
//!
//! Every stage transition is published to an [`EventSink`] as a named event
//! with a JSON payload. The names are fixed; consumers filter by prefix.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A stage's gate passed and its action is about to run.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage's sub-workflow was handed to the engine.
pub const STAGE_SUBMITTED: &str = "stage.submitted";
/// A stage's inspector accepted the sub-workflow.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// A stage's gate evaluated false.
pub const STAGE_SKIPPED: &str = "stage.skipped";
/// A stage's inspector rejected the sub-workflow.
pub const STAGE_FAILED: &str = "stage.failed";
/// Every stage completed or was skipped.
pub const SEQUENCE_COMPLETED: &str = "sequence.completed";
/// The sequence halted on a failed stage.
pub const SEQUENCE_FAILED: &str = "sequence.failed";

/// Builds the payload shared by every stage event.
#[must_use]
pub fn stage_payload(run_id: uuid::Uuid, stage: &str, index: usize) -> serde_json::Value {
    serde_json::json!({
        "run_id": run_id.to_string(),
        "stage": stage,
        "index": index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_payload() {
        let run_id = uuid::Uuid::nil();
        let payload = stage_payload(run_id, "pw_bands", 0);
        assert_eq!(payload["stage"], "pw_bands");
        assert_eq!(payload["index"], 0);
        assert_eq!(payload["run_id"], "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_event_names_share_prefixes() {
        for name in [STAGE_STARTED, STAGE_SUBMITTED, STAGE_COMPLETED, STAGE_SKIPPED, STAGE_FAILED] {
            assert!(name.starts_with("stage."));
        }
        assert!(SEQUENCE_COMPLETED.starts_with("sequence."));
        assert!(SEQUENCE_FAILED.starts_with("sequence."));
    }
}
