//! Timestamped record of one stage's passage through the sequencer.

use super::{ExitCode, StageStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// What happened to one stage during a run.
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    /// Stage name (context key and output prefix).
    pub name: String,
    /// Final status.
    pub status: StageStatus,
    /// When the stage was reached.
    pub started_at: DateTime<Utc>,
    /// When the stage reached its final status.
    pub ended_at: DateTime<Utc>,
    /// Id of the submitted process, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<Uuid>,
    /// Exit code, if the inspector rejected the stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<ExitCode>,
    /// Error message, if the action raised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageRecord {
    /// Creates a record for a stage that has just been reached.
    #[must_use]
    pub fn started(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            status: StageStatus::Pending,
            started_at: now,
            ended_at: now,
            process_id: None,
            exit_code: None,
            error: None,
        }
    }

    /// Marks the record with its final status.
    #[must_use]
    pub fn finish(mut self, status: StageStatus) -> Self {
        self.status = status;
        self.ended_at = Utc::now();
        self
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_ms(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lifecycle() {
        let record = StageRecord::started("pw_bands");
        assert_eq!(record.status, StageStatus::Pending);

        std::thread::sleep(std::time::Duration::from_millis(5));
        let record = record.finish(StageStatus::Completed);
        assert_eq!(record.status, StageStatus::Completed);
        assert!(record.duration_ms() >= 5.0);
    }

    #[test]
    fn test_record_serialization_skips_empty() {
        let record = StageRecord::started("skeaf").finish(StageStatus::Skipped);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "skipped");
        assert!(json.get("exit_code").is_none());
        assert!(json.get("process_id").is_none());
    }
}
