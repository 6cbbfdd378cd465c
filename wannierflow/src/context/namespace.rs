//! Result namespace populated by completion inspectors.

use crate::core::{lookup_path, Outputs};
use crate::errors::NamespaceConflictError;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

/// Outputs accepted by inspectors, grouped by stage prefix.
///
/// A namespace is attached whole or not at all, and only once.
#[derive(Debug, Default)]
pub struct OutputNamespace {
    branches: RwLock<BTreeMap<String, Outputs>>,
}

impl OutputNamespace {
    /// Creates an empty namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a stage's outputs under `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `NamespaceConflictError` if `namespace` is already attached.
    pub fn attach(&self, namespace: impl Into<String>, outputs: Outputs) -> Result<(), NamespaceConflictError> {
        let namespace = namespace.into();
        let mut branches = self.branches.write();

        if branches.contains_key(&namespace) {
            return Err(NamespaceConflictError::new(namespace, "outputs already attached"));
        }

        branches.insert(namespace, outputs);
        Ok(())
    }

    /// Returns a copy of one branch.
    #[must_use]
    pub fn branch(&self, namespace: &str) -> Option<Outputs> {
        self.branches.read().get(namespace).cloned()
    }

    /// Looks up a dotted path such as `wannier90_bands.bands_distance`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        let (namespace, rest) = path.split_once('.').unwrap_or((path, ""));
        let branches = self.branches.read();
        let branch = branches.get(namespace)?;
        if rest.is_empty() {
            return Some(Value::Object(branch.clone()));
        }
        lookup_path(branch, rest).cloned()
    }

    /// Returns the attached namespaces, sorted.
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        self.branches.read().keys().cloned().collect()
    }

    /// Returns the whole tree, one key per namespace.
    #[must_use]
    pub fn to_tree(&self) -> Outputs {
        self.branches
            .read()
            .iter()
            .map(|(namespace, outputs)| (namespace.clone(), Value::Object(outputs.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outputs(value: Value) -> Outputs {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_attach_and_get() {
        let ns = OutputNamespace::new();
        ns.attach("wannier90_bands", outputs(json!({"bands_distance": 0.012, "wannier90_optimal": {"output_parameters": {"number_wfs": 8}}})))
            .unwrap();

        assert_eq!(ns.get("wannier90_bands.bands_distance"), Some(json!(0.012)));
        assert_eq!(
            ns.get("wannier90_bands.wannier90_optimal.output_parameters.number_wfs"),
            Some(json!(8))
        );
        assert!(ns.get("wannier90_bands").unwrap().is_object());
        assert!(ns.get("skeaf.frequencies").is_none());
    }

    #[test]
    fn test_attach_twice_conflicts() {
        let ns = OutputNamespace::new();
        ns.attach("pw_bands", outputs(json!({"band_structure": [1]}))).unwrap();
        let err = ns.attach("pw_bands", outputs(json!({}))).unwrap_err();
        assert_eq!(err.namespace, "pw_bands");
        assert_eq!(ns.get("pw_bands.band_structure"), Some(json!([1])));
    }

    #[test]
    fn test_to_tree() {
        let ns = OutputNamespace::new();
        ns.attach("wannier90_bands", Outputs::new()).unwrap();
        ns.attach("pw_bands", Outputs::new()).unwrap();
        assert_eq!(ns.namespaces(), vec!["pw_bands", "wannier90_bands"]);
        assert_eq!(ns.to_tree().len(), 2);
    }
}
