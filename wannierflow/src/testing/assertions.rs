//! Assertions over sequence reports and emitted events.

use crate::core::{StageStatus, SequenceState};
use crate::events::CollectingEventSink;
use crate::pipeline::SequenceReport;

/// Asserts that the sequence reached `Done`.
pub fn assert_sequence_done(report: &SequenceReport) {
    assert_eq!(
        report.state,
        SequenceState::Done,
        "Expected the sequence to finish, got {} (failed stage: {:?})",
        report.state,
        report.failed_stage()
    );
}

/// Asserts that the sequence failed at the given stage with the given exit status.
pub fn assert_sequence_failed_at(report: &SequenceReport, stage: &str, exit_status: u32) {
    assert_eq!(report.failed_stage(), Some(stage), "Unexpected failed stage");
    assert_eq!(
        report.exit_code.map(|code| code.status),
        Some(exit_status),
        "Unexpected exit code for stage '{stage}'"
    );
}

/// Asserts the recorded status of a stage.
pub fn assert_stage_status(report: &SequenceReport, stage: &str, expected: StageStatus) {
    let actual = report.record(stage).map(|record| record.status);
    assert_eq!(
        actual,
        Some(expected),
        "Expected stage '{stage}' to be {expected}, got {actual:?}"
    );
}

/// Asserts the exact set of top-level output namespaces.
pub fn assert_namespaces(report: &SequenceReport, expected: &[&str]) {
    let mut actual: Vec<&str> = report.outputs.keys().map(String::as_str).collect();
    actual.sort_unstable();
    let mut expected = expected.to_vec();
    expected.sort_unstable();
    assert_eq!(actual, expected, "Unexpected output namespaces");
}

/// Asserts that the events were emitted in exactly this order.
pub fn assert_event_sequence(sink: &CollectingEventSink, expected: &[&str]) {
    let names = sink.names();
    let actual: Vec<&str> = names.iter().map(String::as_str).collect();
    assert_eq!(actual, expected, "Unexpected event sequence");
}
