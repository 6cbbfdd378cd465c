//! Code selections, execution hosts and parallelization.
//!
//! Every collaborating code must run on the same host: the Wannierization
//! reads the SCF outputs in place and the isosurface job reads the
//! Wannier90 plot folder in place.

use crate::errors::{ConfigurationError, ResourceHostMismatchError, WannierflowError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Codes every run needs.
pub const REQUIRED_CODES: [&str; 4] = ["pw", "pw2wannier90", "projwfc", "wannier90"];

/// Code needed when Wannier functions are plotted.
pub const ISOSURFACE_CODES: [&str; 1] = ["python"];

/// Codes needed when dHvA frequencies are computed.
pub const SKEAF_CODES: [&str; 2] = ["wan2skeaf", "skeaf"];

/// A code the plugin knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownCode {
    /// Selection key.
    pub key: &'static str,
    /// Executable name.
    pub name: &'static str,
    /// Default calculation plugin.
    pub default_plugin: &'static str,
}

/// All codes the resources panel offers.
pub const KNOWN_CODES: [KnownCode; 7] = [
    KnownCode { key: "pw", name: "pw.x", default_plugin: "quantumespresso.pw" },
    KnownCode { key: "projwfc", name: "projwfc.x", default_plugin: "quantumespresso.projwfc" },
    KnownCode {
        key: "pw2wannier90",
        name: "pw2wannier90.x",
        default_plugin: "quantumespresso.pw2wannier90",
    },
    KnownCode { key: "wannier90", name: "wannier90.x", default_plugin: "wannier90.wannier90" },
    KnownCode { key: "python", name: "python", default_plugin: "pythonjob.pythonjob" },
    KnownCode { key: "wan2skeaf", name: "wan2skeaf.py", default_plugin: "skeaf.wan2skeaf" },
    KnownCode { key: "skeaf", name: "skeaf", default_plugin: "skeaf.skeaf" },
];

/// Looks up a known code by selection key.
#[must_use]
pub fn known_code(key: &str) -> Option<&'static KnownCode> {
    KNOWN_CODES.iter().find(|code| code.key == key)
}

/// An installed code on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDescriptor {
    /// Full label (e.g., "pw-7.2@daint").
    pub label: String,
    /// Host identifier the code is installed on.
    pub computer: String,
    /// Calculation plugin.
    pub plugin: String,
}

impl CodeDescriptor {
    /// Creates a new code descriptor.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        computer: impl Into<String>,
        plugin: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            computer: computer.into(),
            plugin: plugin.into(),
        }
    }

    /// Creates a descriptor for a known code with its default plugin.
    #[must_use]
    pub fn known(key: &str, computer: impl Into<String>) -> Self {
        let computer = computer.into();
        let plugin = known_code(key).map_or(key, |code| code.default_plugin);
        Self::new(format!("{key}@{computer}"), computer, plugin)
    }
}

/// A code selection with its resource request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeResources {
    /// The selected code, if any.
    pub code: Option<CodeDescriptor>,
    /// Number of machines.
    #[serde(default = "default_nodes")]
    pub nodes: u32,
    /// MPI tasks per machine.
    #[serde(default = "default_ntasks")]
    pub ntasks_per_node: u32,
}

fn default_nodes() -> u32 {
    1
}

fn default_ntasks() -> u32 {
    1
}

impl CodeResources {
    /// Creates a selection with one node and one task.
    #[must_use]
    pub fn new(code: CodeDescriptor) -> Self {
        Self {
            code: Some(code),
            nodes: default_nodes(),
            ntasks_per_node: default_ntasks(),
        }
    }

    /// Sets the resource request.
    #[must_use]
    pub fn with_resources(mut self, nodes: u32, ntasks_per_node: u32) -> Self {
        self.nodes = nodes;
        self.ntasks_per_node = ntasks_per_node;
        self
    }
}

/// Parallelization forwarded to every sub-workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parallelization {
    /// Number of machines.
    pub num_machines: u32,
    /// MPI processes per machine.
    pub num_mpiprocs_per_machine: u32,
}

/// Selected codes keyed by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CodeSelection(BTreeMap<String, CodeResources>);

impl CodeSelection {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a selection for a role.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, resources: CodeResources) -> Self {
        self.0.insert(key.into(), resources);
        self
    }

    /// Returns the selected code for a role.
    #[must_use]
    pub fn code(&self, key: &str) -> Option<&CodeDescriptor> {
        self.0.get(key).and_then(|resources| resources.code.as_ref())
    }

    /// Returns the resources for a role.
    #[must_use]
    pub fn resources(&self, key: &str) -> Option<&CodeResources> {
        self.0.get(key)
    }

    /// Returns the selected code for a role or a configuration error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if nothing is selected for `key`.
    pub fn require(&self, key: &str) -> Result<&CodeDescriptor, ConfigurationError> {
        self.code(key).ok_or_else(|| ConfigurationError::missing_code(key))
    }

    /// Returns the parallelization derived from the pw.x request.
    #[must_use]
    pub fn parallelization(&self) -> Option<Parallelization> {
        self.resources("pw").map(|resources| Parallelization {
            num_machines: resources.nodes,
            num_mpiprocs_per_machine: resources.ntasks_per_node,
        })
    }

    /// Returns the selected codes for the given roles, keyed by role.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if any role has no code.
    pub fn subset(&self, keys: &[&str]) -> Result<BTreeMap<String, CodeDescriptor>, ConfigurationError> {
        keys.iter()
            .map(|key| Ok(((*key).to_string(), self.require(key)?.clone())))
            .collect()
    }
}

/// Checks that every needed code is selected and that all share one host.
///
/// # Errors
///
/// Returns a configuration error for a missing code and a
/// `ResourceHostMismatchError` when the hosts differ.
pub fn check_codes(selection: &CodeSelection, keys: &[&str]) -> Result<(), WannierflowError> {
    let codes = selection.subset(keys)?;
    let hosts: BTreeMap<String, String> = codes
        .into_iter()
        .map(|(key, code)| (key, code.computer))
        .collect();

    let mut distinct: Vec<&String> = hosts.values().collect();
    distinct.sort();
    distinct.dedup();
    if distinct.len() > 1 {
        return Err(ResourceHostMismatchError::new(hosts).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection_on(host: &str) -> CodeSelection {
        REQUIRED_CODES
            .iter()
            .fold(CodeSelection::new(), |selection, key| {
                selection.with(*key, CodeResources::new(CodeDescriptor::known(key, host)))
            })
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(known_code("pw").unwrap().default_plugin, "quantumespresso.pw");
        assert_eq!(known_code("python").unwrap().default_plugin, "pythonjob.pythonjob");
        assert!(known_code("vasp").is_none());
        assert_eq!(CodeDescriptor::known("wannier90", "daint").label, "wannier90@daint");
    }

    #[test]
    fn test_same_host_passes() {
        assert!(check_codes(&selection_on("daint"), &REQUIRED_CODES).is_ok());
    }

    #[test]
    fn test_host_mismatch() {
        let selection = selection_on("daint").with(
            "wannier90",
            CodeResources::new(CodeDescriptor::known("wannier90", "localhost")),
        );
        let err = check_codes(&selection, &REQUIRED_CODES).unwrap_err();
        match err {
            WannierflowError::ResourceHostMismatch(e) => {
                assert_eq!(e.hosts.get("wannier90").unwrap(), "localhost");
                assert_eq!(e.hosts.get("pw").unwrap(), "daint");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_code() {
        let selection = selection_on("daint").with(
            "projwfc",
            CodeResources {
                code: None,
                nodes: 1,
                ntasks_per_node: 1,
            },
        );
        let err = check_codes(&selection, &REQUIRED_CODES).unwrap_err();
        assert!(matches!(err, WannierflowError::Configuration(ref e) if e.key.as_deref() == Some("codes.projwfc")));
    }

    #[test]
    fn test_parallelization_from_pw() {
        let selection = selection_on("daint").with(
            "pw",
            CodeResources::new(CodeDescriptor::known("pw", "daint")).with_resources(2, 36),
        );
        assert_eq!(
            selection.parallelization(),
            Some(Parallelization {
                num_machines: 2,
                num_mpiprocs_per_machine: 36
            })
        );
        assert_eq!(CodeSelection::new().parallelization(), None);
    }
}
