//! Error types for the wannierflow orchestration core.
//!
//! Configuration and host errors are raised before any stage is submitted.
//! Stage failures carry the exit code of the stage whose inspector rejected
//! the sub-workflow. File-parse errors belong to the volumetric collaborator
//! and are recorded per file rather than aborting the batch.

use crate::core::ExitCode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// The main error type for wannierflow operations.
#[derive(Debug, Error)]
pub enum WannierflowError {
    /// The user configuration is invalid or inconsistent.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The selected codes live on different execution hosts.
    #[error("{0}")]
    ResourceHostMismatch(#[from] ResourceHostMismatchError),

    /// A stage's sub-workflow did not finish successfully.
    #[error("{0}")]
    StageFailure(#[from] StageFailure),

    /// The derived electron count is not integral.
    #[error("{0}")]
    NonIntegerElectronCount(#[from] NonIntegerElectronCountError),

    /// A volumetric file could not be parsed.
    #[error("{0}")]
    FileParse(#[from] FileParseError),

    /// An isosurface could not be extracted.
    #[error("{0}")]
    Isosurface(#[from] IsosurfaceError),

    /// A context entry was written twice.
    #[error("{0}")]
    ContextConflict(#[from] ContextConflictError),

    /// An output namespace was attached twice.
    #[error("{0}")]
    NamespaceConflict(#[from] NamespaceConflictError),

    /// The stage sequence is malformed.
    #[error("{0}")]
    Validation(#[from] SequenceValidationError),

    /// The workflow engine rejected or lost a process.
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for WannierflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Diagnostic metadata attached to errors.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "CONFIG-HOST-MISMATCH").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("summary".to_string(), serde_json::json!(self.summary));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        if !self.context.is_empty() {
            map.insert("context".to_string(), serde_json::json!(self.context));
        }
        map
    }
}

/// Error raised when the user configuration is invalid.
#[derive(Debug, Clone, Error)]
#[error("Configuration error: {message}")]
pub struct ConfigurationError {
    /// The error message.
    pub message: String,
    /// The offending configuration key, if known.
    pub key: Option<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ErrorInfo>,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            key: None,
            error_info: None,
        }
    }

    /// Sets the offending key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Creates an error for a missing code selection.
    #[must_use]
    pub fn missing_code(label: &str) -> Self {
        Self::new(format!("A code must be selected for '{label}'"))
            .with_key(format!("codes.{label}"))
            .with_error_info(
                ErrorInfo::new("CONFIG-MISSING-CODE", format!("Code '{label}' is not selected"))
                    .with_fix_hint("Select an installed code for every step the workflow will run."),
            )
    }
}

/// Error raised when the collaborating codes are not on one host.
///
/// Intermediate artifacts (wavefunctions, charge densities) are large files
/// that are never transferred between hosts, so every code must share one.
#[derive(Debug, Clone, Error)]
#[error(
    "All selected codes must be installed on the same computer. This is because the \
     calculations rely on large files that are not retrieved. Hosts: {}",
    format_hosts(.hosts)
)]
pub struct ResourceHostMismatchError {
    /// Code label to host identifier.
    pub hosts: BTreeMap<String, String>,
    /// Diagnostic info.
    pub error_info: ErrorInfo,
}

impl ResourceHostMismatchError {
    /// Creates a new host mismatch error.
    #[must_use]
    pub fn new(hosts: BTreeMap<String, String>) -> Self {
        let distinct: Vec<&String> = {
            let mut seen: Vec<&String> = hosts.values().collect();
            seen.sort();
            seen.dedup();
            seen
        };
        let info = ErrorInfo::new(
            "CONFIG-HOST-MISMATCH",
            format!("Codes span {} hosts", distinct.len()),
        )
        .with_fix_hint("Pick codes configured on a single computer.");

        Self {
            hosts,
            error_info: info,
        }
    }
}

impl From<ResourceHostMismatchError> for ConfigurationError {
    fn from(err: ResourceHostMismatchError) -> Self {
        Self {
            message: err.to_string(),
            key: Some("codes".to_string()),
            error_info: Some(err.error_info),
        }
    }
}

fn format_hosts(hosts: &BTreeMap<String, String>) -> String {
    hosts
        .iter()
        .map(|(code, host)| format!("{code}@{host}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error raised when a stage's sub-workflow fails.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}' failed with exit code {} ({}): {}", .exit_code.status, .exit_code.label, .exit_code.message)]
pub struct StageFailure {
    /// The failing stage.
    pub stage: String,
    /// The declared exit code.
    pub exit_code: ExitCode,
}

impl StageFailure {
    /// Creates a new stage failure.
    #[must_use]
    pub fn new(stage: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            stage: stage.into(),
            exit_code,
        }
    }
}

/// Error raised when the derived electron count is not an integer.
#[derive(Debug, Clone, Error)]
#[error("Non-integer number of electrons: {value} (tolerance {tolerance})")]
pub struct NonIntegerElectronCountError {
    /// The derived (fractional) count.
    pub value: f64,
    /// The tolerance used.
    pub tolerance: f64,
}

impl NonIntegerElectronCountError {
    /// Creates a new error.
    #[must_use]
    pub fn new(value: f64, tolerance: f64) -> Self {
        Self { value, tolerance }
    }
}

/// Error raised when a volumetric file is malformed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to parse {}: {message}", .file.as_deref().unwrap_or("volumetric data"))]
pub struct FileParseError {
    /// The file being parsed, if known.
    pub file: Option<String>,
    /// What went wrong.
    pub message: String,
    /// 1-based line number, if known.
    pub line: Option<usize>,
}

impl FileParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            file: None,
            message: message.into(),
            line: None,
        }
    }

    /// Sets the file name.
    #[must_use]
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Sets the line number.
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Creates the declared/actual sample-count mismatch error.
    #[must_use]
    pub fn size_mismatch(expected: usize, actual: usize) -> Self {
        Self::new(format!(
            "mismatch in density data size: expected {expected} values, found {actual}"
        ))
    }
}

/// Error raised when an isosurface cannot be extracted.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IsosurfaceError {
    /// The requested level lies outside the data range.
    #[error("Surface level {level} must be within volume data range [{min}, {max}]")]
    LevelOutOfRange {
        /// The requested level.
        level: f64,
        /// The data minimum.
        min: f64,
        /// The data maximum.
        max: f64,
    },

    /// The grid is too small to contain a cell.
    #[error("Grid of shape {shape:?} needs at least two points along every axis")]
    GridTooSmall {
        /// The grid shape.
        shape: [usize; 3],
    },

    /// Percentile outside [0, 100] or empty data.
    #[error("Invalid percentile {percentile} for {len} samples")]
    InvalidPercentile {
        /// The percentile requested.
        percentile: f64,
        /// Number of samples.
        len: usize,
    },

    /// The step size is zero.
    #[error("Step size must be at least 1")]
    InvalidStepSize,
}

/// Error raised when writing a context entry twice.
#[derive(Debug, Clone, Error)]
#[error("Context conflict: entry '{key}' already exists")]
pub struct ContextConflictError {
    /// The conflicting key.
    pub key: String,
}

impl ContextConflictError {
    /// Creates a new context conflict error.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Error raised when attaching an output namespace twice.
#[derive(Debug, Clone, Error)]
#[error("Output conflict for namespace '{namespace}': {message}")]
pub struct NamespaceConflictError {
    /// The namespace.
    pub namespace: String,
    /// Additional message.
    pub message: String,
}

impl NamespaceConflictError {
    /// Creates a new namespace conflict error.
    #[must_use]
    pub fn new(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            message: message.into(),
        }
    }
}

/// Error raised when a stage sequence fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SequenceValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved.
    pub stages: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ErrorInfo>,
}

impl SequenceValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }
}

/// Errors reported by a workflow engine adapter.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine refused the submission.
    #[error("Submission of {process} rejected: {reason}")]
    SubmissionRejected {
        /// The process kind.
        process: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The handle is unknown or was already awaited.
    #[error("Unknown process handle: {id}")]
    UnknownHandle {
        /// The handle id.
        id: String,
    },

    /// A required output is missing from a finished process.
    #[error("Process '{stage}' is missing output '{path}'")]
    MissingOutput {
        /// The stage (context key) whose outputs were read.
        stage: String,
        /// The dotted output path.
        path: String,
    },

    /// The process task could not be joined.
    #[error("Process task failed: {0}")]
    Join(String),
}

impl EngineError {
    /// Creates a missing-output error.
    #[must_use]
    pub fn missing_output(stage: impl Into<String>, path: impl Into<String>) -> Self {
        Self::MissingOutput {
            stage: stage.into(),
            path: path.into(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        match self {
            Self::SubmissionRejected { process, reason } => {
                map.insert("type".to_string(), serde_json::json!("SubmissionRejected"));
                map.insert("process".to_string(), serde_json::json!(process));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::UnknownHandle { id } => {
                map.insert("type".to_string(), serde_json::json!("UnknownHandle"));
                map.insert("id".to_string(), serde_json::json!(id));
            }
            Self::MissingOutput { stage, path } => {
                map.insert("type".to_string(), serde_json::json!("MissingOutput"));
                map.insert("stage".to_string(), serde_json::json!(stage));
                map.insert("path".to_string(), serde_json::json!(path));
            }
            Self::Join(reason) => {
                map.insert("type".to_string(), serde_json::json!("Join"));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
        }
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Default suggestions for error codes.
pub struct ErrorSuggestions;

impl ErrorSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "CONFIG-HOST-MISMATCH" => Some(
                "The Wannierization reads the SCF charge density in place. \
                 Configure pw.x, projwfc.x, pw2wannier90.x and wannier90.x on one computer.",
            ),
            "CONFIG-MISSING-CODE" => Some("Select a code in the resources panel for every required step."),
            "SEQUENCE-EMPTY" => Some("Add at least one stage before building the sequence."),
            "SEQUENCE-DUPLICATE" => Some("Stage names double as context keys and must be unique."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_creation() {
        let info = ErrorInfo::new("TEST-001", "Test error")
            .with_fix_hint("Fix this by doing that")
            .with_context_entry("stage", "pw_bands");

        assert_eq!(info.code, "TEST-001");
        assert_eq!(info.fix_hint, Some("Fix this by doing that".to_string()));
        assert_eq!(info.context.get("stage"), Some(&"pw_bands".to_string()));
        assert_eq!(info.to_dict().get("code").unwrap(), "TEST-001");
    }

    #[test]
    fn test_host_mismatch_message() {
        let mut hosts = BTreeMap::new();
        hosts.insert("pw".to_string(), "daint".to_string());
        hosts.insert("wannier90".to_string(), "localhost".to_string());

        let err = ResourceHostMismatchError::new(hosts);
        let message = err.to_string();
        assert!(message.contains("same computer"));
        assert!(message.contains("pw@daint"));
        assert!(message.contains("wannier90@localhost"));
        assert_eq!(err.error_info.summary, "Codes span 2 hosts");
    }

    #[test]
    fn test_host_mismatch_into_configuration_error() {
        let mut hosts = BTreeMap::new();
        hosts.insert("pw".to_string(), "a".to_string());
        hosts.insert("projwfc".to_string(), "b".to_string());

        let config: ConfigurationError = ResourceHostMismatchError::new(hosts).into();
        assert_eq!(config.key.as_deref(), Some("codes"));
        assert_eq!(config.error_info.unwrap().code, "CONFIG-HOST-MISMATCH");
    }

    #[test]
    fn test_size_mismatch_message() {
        let err = FileParseError::size_mismatch(8, 7).in_file("wf_00001.xsf");
        assert!(err.to_string().contains("mismatch in density data size"));
        assert!(err.to_string().contains("wf_00001.xsf"));
    }

    #[test]
    fn test_stage_failure_display() {
        let err = StageFailure::new("pw_bands", ExitCode::PW_BANDS_FAILED);
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("ERROR_PW_BANDS_WORKCHAIN_FAILED"));
    }

    #[test]
    fn test_engine_error_to_dict() {
        let err = EngineError::missing_output("pw_bands", "band_structure");
        let dict = err.to_dict();
        assert_eq!(dict.get("type").unwrap(), "MissingOutput");
        assert_eq!(dict.get("path").unwrap(), "band_structure");
    }

    #[test]
    fn test_suggestions() {
        assert!(ErrorSuggestions::get("CONFIG-HOST-MISMATCH").is_some());
        assert!(ErrorSuggestions::get("UNKNOWN").is_none());
    }
}
