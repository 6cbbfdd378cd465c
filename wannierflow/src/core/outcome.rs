//! Per-stage outcome produced by a completion inspector.

use super::ExitCode;
use serde::Serialize;

/// Output tree of a process or namespace.
pub type Outputs = serde_json::Map<String, serde_json::Value>;

/// Looks up a dotted path (e.g., `"wannier90_plot.remote_folder"`) in a tree.
#[must_use]
pub fn lookup_path<'a>(tree: &'a Outputs, path: &str) -> Option<&'a serde_json::Value> {
    let mut parts = path.split('.');
    let first = tree.get(parts.next()?)?;
    parts.try_fold(first, |node, part| node.get(part))
}

/// Result of inspecting a finished stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage succeeded; these outputs are attached under its prefix.
    Success {
        /// The outputs to expose.
        outputs: Outputs,
    },
    /// The stage failed with a declared exit code.
    Failure {
        /// The exit code.
        exit_code: ExitCode,
    },
}

impl StageOutcome {
    /// Creates a success outcome.
    #[must_use]
    pub fn success(outputs: Outputs) -> Self {
        Self::Success { outputs }
    }

    /// Creates a failure outcome.
    #[must_use]
    pub fn failure(exit_code: ExitCode) -> Self {
        Self::Failure { exit_code }
    }

    /// Returns true on success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the exit code on failure.
    #[must_use]
    pub fn exit_code(&self) -> Option<ExitCode> {
        match self {
            Self::Failure { exit_code } => Some(*exit_code),
            Self::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let ok = StageOutcome::success(Outputs::new());
        assert!(ok.is_success());
        assert_eq!(ok.exit_code(), None);

        let failed = StageOutcome::failure(ExitCode::PW_BANDS_FAILED);
        assert!(!failed.is_success());
        assert_eq!(failed.exit_code(), Some(ExitCode::PW_BANDS_FAILED));
    }

    #[test]
    fn test_lookup_path() {
        let tree: Outputs = serde_json::from_value(serde_json::json!({
            "wannier90_plot": {"remote_folder": {"path": "/scratch/abc"}}
        }))
        .unwrap();
        assert_eq!(
            lookup_path(&tree, "wannier90_plot.remote_folder.path"),
            Some(&serde_json::json!("/scratch/abc"))
        );
        assert!(lookup_path(&tree, "wannier90_plot.missing").is_none());
        assert!(lookup_path(&tree, "").is_none());
    }

    #[test]
    fn test_outcome_serialize() {
        let json = serde_json::to_value(StageOutcome::failure(ExitCode::SKEAF_FAILED)).unwrap();
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["exit_code"]["status"], 403);
    }
}
