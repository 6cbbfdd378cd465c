//! Sequence builder with validation.

use super::{Stage, StageSequencer};
use crate::errors::{ErrorInfo, SequenceValidationError};

/// Builds a validated, statically ordered stage sequence.
#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    name: String,
    stages: Vec<Stage>,
}

impl SequenceBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Appends a stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or already used.
    pub fn stage(mut self, stage: Stage) -> Result<Self, SequenceValidationError> {
        if stage.name().is_empty() {
            return Err(SequenceValidationError::new("Stage name cannot be empty").with_error_info(
                ErrorInfo::new("SEQUENCE-EMPTY-NAME", "Stage has no name")
                    .with_fix_hint("Name every stage; the name is its context key and output namespace."),
            ));
        }

        if self.stages.iter().any(|existing| existing.name() == stage.name()) {
            return Err(SequenceValidationError::new(format!(
                "Stage '{}' is already part of sequence '{}'",
                stage.name(),
                self.name
            ))
            .with_stages(vec![stage.name().to_string()])
            .with_error_info(
                ErrorInfo::new("SEQUENCE-DUPLICATE", format!("Duplicate stage '{}'", stage.name()))
                    .with_fix_hint("Stage names double as context keys and must be unique."),
            ));
        }

        self.stages.push(stage);
        Ok(self)
    }

    /// Builds the sequencer.
    ///
    /// # Errors
    ///
    /// Returns an error if no stage was added.
    pub fn build(self) -> Result<StageSequencer, SequenceValidationError> {
        if self.stages.is_empty() {
            return Err(SequenceValidationError::new("Sequence has no stages").with_error_info(
                ErrorInfo::new("SEQUENCE-EMPTY", "Cannot build an empty sequence")
                    .with_fix_hint("Add at least one stage before building the sequence."),
            ));
        }

        Ok(StageSequencer::new(self.name, self.stages))
    }

    /// Returns the sequence name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExitCode;
    use crate::pipeline::ExposeOutputs;
    use crate::testing::mocks::StaticAction;
    use crate::engine::ProcessKind;
    use std::sync::Arc;

    fn stage(name: &str) -> Stage {
        Stage::new(
            name,
            Arc::new(StaticAction::new(format!("run_{name}"), ProcessKind::PwBands)),
            Arc::new(ExposeOutputs::new(format!("inspect_{name}"), ExitCode::PW_BANDS_FAILED)),
        )
    }

    #[test]
    fn test_build_in_order() {
        let sequencer = SequenceBuilder::new("bands")
            .stage(stage("a"))
            .unwrap()
            .stage(stage("b"))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(sequencer.stage_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let err = SequenceBuilder::new("bands").build().unwrap_err();
        assert_eq!(err.error_info.unwrap().code, "SEQUENCE-EMPTY");
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let err = SequenceBuilder::new("bands")
            .stage(stage("a"))
            .unwrap()
            .stage(stage("a"))
            .unwrap_err();
        assert_eq!(err.stages, vec!["a"]);
        assert_eq!(err.error_info.unwrap().code, "SEQUENCE-DUPLICATE");
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(SequenceBuilder::new("bands").stage(stage("")).is_err());
    }
}
