//! Stage status and sequence state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not been reached yet.
    #[default]
    Pending,
    /// Stage action has been submitted and is awaiting completion.
    Running,
    /// Stage inspector reported success.
    Completed,
    /// Stage gate evaluated false.
    Skipped,
    /// Stage action or inspector reported failure.
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped | Self::Failed)
    }

    /// Returns true if later stages may proceed past this one.
    #[must_use]
    pub fn allows_progress(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

/// Position of a sequence in its state machine.
///
/// The index refers to the stage's position in the static order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum SequenceState {
    /// Stage `i` is next and has not been evaluated.
    Pending(usize),
    /// Stage `i` has been submitted.
    Running(usize),
    /// Stage `i` completed successfully.
    Completed(usize),
    /// Stage `i` was gated off.
    Skipped(usize),
    /// Stage `i` failed; terminal for the whole sequence.
    Failed(usize),
    /// Every stage completed or was skipped.
    Done,
}

impl SequenceState {
    /// The initial state of every sequence.
    pub const INITIAL: Self = Self::Pending(0);

    /// Returns true for `Done` and `Failed(_)`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Returns the stage index this state refers to, if any.
    #[must_use]
    pub fn stage_index(&self) -> Option<usize> {
        match *self {
            Self::Pending(i)
            | Self::Running(i)
            | Self::Completed(i)
            | Self::Skipped(i)
            | Self::Failed(i) => Some(i),
            Self::Done => None,
        }
    }

    /// Returns true if moving to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self, stage_count: usize) -> bool {
        match (*self, next) {
            (Self::Pending(i), Self::Running(j) | Self::Skipped(j)) => i == j,
            (Self::Running(i), Self::Completed(j) | Self::Failed(j)) => i == j,
            (Self::Completed(i) | Self::Skipped(i), Self::Pending(j)) => j == i + 1 && j < stage_count,
            (Self::Completed(i) | Self::Skipped(i), Self::Done) => i + 1 == stage_count,
            _ => false,
        }
    }
}

impl fmt::Display for SequenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending(i) => write!(f, "pending({i})"),
            Self::Running(i) => write!(f, "running({i})"),
            Self::Completed(i) => write!(f, "completed({i})"),
            Self::Skipped(i) => write!(f, "skipped({i})"),
            Self::Failed(i) => write!(f, "failed({i})"),
            Self::Done => write!(f, "done"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Completed.to_string(), "completed");
        assert_eq!(StageStatus::Skipped.to_string(), "skipped");
        assert_eq!(StageStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_stage_status_is_terminal() {
        assert!(StageStatus::Completed.is_terminal());
        assert!(StageStatus::Skipped.is_terminal());
        assert!(StageStatus::Failed.is_terminal());
        assert!(!StageStatus::Pending.is_terminal());
        assert!(!StageStatus::Running.is_terminal());
        assert!(!StageStatus::Failed.allows_progress());
    }

    #[test]
    fn test_sequence_transitions() {
        let s = SequenceState::INITIAL;
        assert!(s.can_transition_to(SequenceState::Running(0), 2));
        assert!(s.can_transition_to(SequenceState::Skipped(0), 2));
        assert!(!s.can_transition_to(SequenceState::Completed(0), 2));
        assert!(SequenceState::Running(0).can_transition_to(SequenceState::Failed(0), 2));
        assert!(SequenceState::Completed(0).can_transition_to(SequenceState::Pending(1), 2));
        assert!(!SequenceState::Completed(0).can_transition_to(SequenceState::Done, 2));
        assert!(SequenceState::Skipped(1).can_transition_to(SequenceState::Done, 2));
        assert!(!SequenceState::Failed(0).can_transition_to(SequenceState::Pending(1), 2));
    }

    #[test]
    fn test_sequence_terminal() {
        assert!(SequenceState::Done.is_terminal());
        assert!(SequenceState::Failed(3).is_terminal());
        assert!(!SequenceState::Running(3).is_terminal());
        assert_eq!(SequenceState::Failed(3).stage_index(), Some(3));
        assert_eq!(SequenceState::Done.stage_index(), None);
    }

    #[test]
    fn test_sequence_state_serialize() {
        let json = serde_json::to_string(&SequenceState::Failed(1)).unwrap();
        assert_eq!(json, r#"{"state":"failed","stage":1}"#);
        let json = serde_json::to_string(&StageStatus::Skipped).unwrap();
        assert_eq!(json, r#""skipped""#);
    }
}
