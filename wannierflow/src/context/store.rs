//! Append-only store of submitted processes.

use crate::engine::{ProcessHandle, ProcessRecord};
use crate::errors::{ContextConflictError, EngineError};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

/// A submitted process and its terminal record.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    /// The handle returned at submission.
    pub handle: ProcessHandle,
    /// The record reported at completion.
    pub record: ProcessRecord,
}

impl ContextEntry {
    /// Looks up a dotted path in the process outputs.
    #[must_use]
    pub fn output(&self, path: &str) -> Option<&Value> {
        self.record.output(path)
    }

    /// Looks up a dotted path, failing with the stage and path when missing.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::MissingOutput` if nothing is stored at `path`.
    pub fn require_output(&self, stage: &str, path: &str) -> Result<&Value, EngineError> {
        self.output(path)
            .ok_or_else(|| EngineError::missing_output(stage, path))
    }
}

/// Maps stage names to their processes.
///
/// Entries are written once and never overwritten or removed.
#[derive(Debug, Default)]
pub struct ContextStore {
    entries: RwLock<BTreeMap<String, ContextEntry>>,
}

impl ContextStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the process of a stage.
    ///
    /// # Errors
    ///
    /// Returns `ContextConflictError` if the stage already has an entry.
    pub fn insert(&self, stage: impl Into<String>, entry: ContextEntry) -> Result<(), ContextConflictError> {
        let stage = stage.into();
        let mut entries = self.entries.write();

        if entries.contains_key(&stage) {
            return Err(ContextConflictError::new(stage));
        }

        entries.insert(stage, entry);
        Ok(())
    }

    /// Returns a copy of a stage's entry.
    #[must_use]
    pub fn get(&self, stage: &str) -> Option<ContextEntry> {
        self.entries.read().get(stage).cloned()
    }

    /// Returns a stage's entry or a missing-output error naming the stage.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::MissingOutput` if the stage never ran.
    pub fn require(&self, stage: &str) -> Result<ContextEntry, EngineError> {
        self.get(stage)
            .ok_or_else(|| EngineError::missing_output(stage, "<process>"))
    }

    /// Checks whether a stage has an entry.
    #[must_use]
    pub fn contains(&self, stage: &str) -> bool {
        self.entries.read().contains_key(stage)
    }

    /// Returns the stage names with entries, sorted.
    #[must_use]
    pub fn stages(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
