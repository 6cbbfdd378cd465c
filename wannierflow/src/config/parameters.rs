//! Launch parameters: workchain choices, advanced overrides and plugin settings.

use super::Wannier90Settings;
use crate::core::Outputs;
use crate::errors::{ConfigurationError, ErrorInfo, WannierflowError};
use crate::structure::PseudoTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Accuracy protocol shared by all sub-workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Low-cost settings for testing.
    Fast,
    /// Balanced settings.
    #[default]
    Moderate,
    /// Converged settings.
    Precise,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Moderate => write!(f, "moderate"),
            Self::Precise => write!(f, "precise"),
        }
    }
}

/// Electronic character of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ElectronicType {
    /// Metallic occupations (smearing).
    #[default]
    Metal,
    /// Fixed occupations.
    Insulator,
    /// Let the protocol decide.
    Automatic,
}

impl fmt::Display for ElectronicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metal => write!(f, "metal"),
            Self::Insulator => write!(f, "insulator"),
            Self::Automatic => write!(f, "automatic"),
        }
    }
}

/// Spin treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpinType {
    /// Spin-unpolarised.
    #[default]
    None,
    /// Collinear magnetism.
    Collinear,
    /// Non-collinear magnetism.
    NonCollinear,
    /// Spin-orbit coupling.
    SpinOrbit,
}

impl fmt::Display for SpinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Collinear => write!(f, "collinear"),
            Self::NonCollinear => write!(f, "non_collinear"),
            Self::SpinOrbit => write!(f, "spin_orbit"),
        }
    }
}

/// Workchain-level choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkchainSettings {
    /// Accuracy protocol.
    #[serde(default)]
    pub protocol: Protocol,
    /// Electronic type.
    #[serde(default)]
    pub electronic_type: ElectronicType,
    /// Spin type.
    #[serde(default)]
    pub spin_type: SpinType,
}

/// Advanced pw.x overrides, kept as an opaque tree.
///
/// Pseudopotentials live under `pw.pseudos`, initial magnetic moments under
/// `initial_magnetic_moments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct AdvancedSettings(pub Outputs);

impl AdvancedSettings {
    /// Creates empty advanced settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a top-level key.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Sets the pseudopotential table under `pw.pseudos`.
    #[must_use]
    pub fn with_pseudos(mut self, pseudos: &PseudoTable) -> Self {
        let pw = self
            .0
            .entry("pw".to_string())
            .or_insert_with(|| serde_json::json!({}));
        if let serde_json::Value::Object(map) = pw {
            map.insert("pseudos".to_string(), pseudos.to_value());
        }
        self
    }

    /// Returns the initial magnetic moments, if set.
    #[must_use]
    pub fn initial_magnetic_moments(&self) -> Option<&serde_json::Value> {
        self.0
            .get("initial_magnetic_moments")
            .filter(|value| !value.is_null())
    }

    /// Returns the raw tree.
    #[must_use]
    pub fn as_map(&self) -> &Outputs {
        &self.0
    }
}

/// Everything the user configured before launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorkflowParameters {
    /// Workchain-level choices.
    #[serde(default)]
    pub workchain: WorkchainSettings,
    /// Advanced pw.x overrides.
    #[serde(default)]
    pub advanced: AdvancedSettings,
    /// Plugin settings.
    #[serde(default)]
    pub wannier90: Wannier90Settings,
}

impl WorkflowParameters {
    /// Creates parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.workchain.protocol = protocol;
        self
    }

    /// Sets the electronic type.
    #[must_use]
    pub fn with_electronic_type(mut self, electronic_type: ElectronicType) -> Self {
        self.workchain.electronic_type = electronic_type;
        self
    }

    /// Sets the spin type.
    #[must_use]
    pub fn with_spin_type(mut self, spin_type: SpinType) -> Self {
        self.workchain.spin_type = spin_type;
        self
    }

    /// Sets the advanced overrides.
    #[must_use]
    pub fn with_advanced(mut self, advanced: AdvancedSettings) -> Self {
        self.advanced = advanced;
        self
    }

    /// Sets the plugin settings.
    #[must_use]
    pub fn with_wannier90(mut self, settings: Wannier90Settings) -> Self {
        self.wannier90 = settings;
        self
    }

    /// Parses parameters from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the JSON does not describe valid
    /// parameters.
    pub fn from_json_str(json: &str) -> Result<Self, WannierflowError> {
        let params: Self = serde_json::from_str(json).map_err(|err| {
            ConfigurationError::new(format!("Invalid workflow parameters: {err}"))
                .with_error_info(ErrorInfo::new("CONFIG-INVALID-JSON", err.to_string()))
        })?;
        params.validate()?;
        Ok(params)
    }

    /// Reads parameters from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or a configuration
    /// error if its content is invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, WannierflowError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` on inconsistent settings.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.wannier90.validate()?;
        if self.wannier90.compute_dhva_frequencies && !self.wannier90.compute_fermi_surface {
            return Err(ConfigurationError::new(
                "dHvA frequencies require the Fermi surface to be computed",
            )
            .with_key("wannier90.compute_dhva_frequencies"));
        }
        Ok(())
    }

    /// Returns non-fatal warnings about the chosen settings.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.workchain.electronic_type == ElectronicType::Insulator {
            warnings.push(
                "Electronic type 'insulator' is not supported yet; the metal setting also \
                 works for insulating materials."
                    .to_string(),
            );
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::PseudoPotential;

    #[test]
    fn test_from_json_with_defaults() {
        let params = WorkflowParameters::from_json_str(
            r#"{
                "workchain": {"protocol": "fast", "electronic_type": "metal", "spin_type": "none"},
                "wannier90": {"plot_wannier_functions": true}
            }"#,
        )
        .unwrap();

        assert_eq!(params.workchain.protocol, Protocol::Fast);
        assert!(params.wannier90.plot_wannier_functions);
        assert!(params.wannier90.exclude_semicore);
        assert!(params.advanced.as_map().is_empty());
    }

    #[test]
    fn test_invalid_json() {
        let err = WannierflowError::from(ConfigurationError::new("x"));
        assert!(matches!(err, WannierflowError::Configuration(_)));

        let result = WorkflowParameters::from_json_str(r#"{"workchain": {"protocol": "slow"}}"#);
        assert!(matches!(result, Err(WannierflowError::Configuration(_))));
    }

    #[test]
    fn test_dhva_requires_fermi_surface() {
        let mut params = WorkflowParameters::new();
        params.wannier90.compute_dhva_frequencies = true;
        assert!(params.validate().is_err());

        params.wannier90.compute_fermi_surface = true;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_insulator_warning() {
        let params = WorkflowParameters::new().with_electronic_type(ElectronicType::Insulator);
        assert_eq!(params.warnings().len(), 1);
        assert!(WorkflowParameters::new().warnings().is_empty());
    }

    #[test]
    fn test_advanced_pseudos() {
        let mut table = PseudoTable::new();
        table.insert("Si", PseudoPotential::new("Si", 4.0));

        let advanced = AdvancedSettings::new()
            .with_entry("initial_magnetic_moments", serde_json::Value::Null)
            .with_pseudos(&table);

        assert!(advanced.initial_magnetic_moments().is_none());
        assert_eq!(advanced.as_map()["pw"]["pseudos"]["Si"]["z_valence"], 4.0);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"workchain": {"spin_type": "collinear"}}"#).unwrap();

        let params = WorkflowParameters::from_json_file(&path).unwrap();
        assert_eq!(params.workchain.spin_type, SpinType::Collinear);

        let missing = WorkflowParameters::from_json_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(WannierflowError::Io(_))));
    }
}
