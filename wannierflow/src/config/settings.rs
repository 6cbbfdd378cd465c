//! Plugin settings for the Wannier90 bands workflow.
//!
//! The settings are captured once at launch and never mutated afterwards.
//! [`Wannier90Settings::model_state`] and [`Wannier90Settings::from_model_state`]
//! provide the serialisable round trip used to persist and restore them;
//! keys missing from a stored state fall back to the declared defaults.

use crate::core::Outputs;
use crate::errors::{ConfigurationError, ErrorInfo};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Method used to build the starting projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProjectionType {
    /// Pseudo-atomic orbitals from the pseudopotential (PDWF).
    #[default]
    #[serde(rename = "atomic_projectors_qe")]
    AtomicProjectorsQe,
    /// Selected columns of the density matrix.
    #[serde(rename = "SCDM")]
    Scdm,
    /// Analytic hydrogenic orbitals.
    #[serde(rename = "analytic")]
    Analytic,
}

impl fmt::Display for ProjectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtomicProjectorsQe => write!(f, "atomic_projectors_qe"),
            Self::Scdm => write!(f, "SCDM"),
            Self::Analytic => write!(f, "analytic"),
        }
    }
}

/// Criterion used to select frozen states in the disentanglement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrozenType {
    /// Freeze a state if either projectability or energy criterion holds.
    #[default]
    FixedPlusProjectability,
    /// Freeze states above a projectability threshold.
    Projectability,
    /// Freeze states below `E_F + energy_window`.
    EnergyFixed,
}

impl FrozenType {
    /// Returns true if the energy window takes part in the selection.
    #[must_use]
    pub fn uses_energy_window(&self) -> bool {
        matches!(self, Self::FixedPlusProjectability | Self::EnergyFixed)
    }
}

impl fmt::Display for FrozenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedPlusProjectability => write!(f, "fixed_plus_projectability"),
            Self::Projectability => write!(f, "projectability"),
            Self::EnergyFixed => write!(f, "energy_fixed"),
        }
    }
}

/// Magnetic field orientation in spherical angles (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldOrientation {
    /// Azimuthal angle φ.
    pub phi: f64,
    /// Polar angle θ.
    pub theta: f64,
}

/// Settings of the Wannier90 plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wannier90Settings {
    /// Exclude semicore states (low-energy flat bands) from the Wannierization.
    #[serde(default = "default_true")]
    pub exclude_semicore: bool,
    /// Compute real-space Wannier functions and their isosurfaces.
    #[serde(default)]
    pub plot_wannier_functions: bool,
    /// Retrieve the real-space Hamiltonian (`.tb` file).
    #[serde(default)]
    pub retrieve_hamiltonian: bool,
    /// Retrieve the Hamiltonian matrices.
    #[serde(default)]
    pub retrieve_matrices: bool,
    /// Run the exhaustive PDWF threshold scan.
    #[serde(default)]
    pub scan_pdwf_parameter: bool,
    /// Compute the Fermi surface.
    #[serde(default)]
    pub compute_fermi_surface: bool,
    /// k-point spacing for the Fermi surface (1/Å).
    #[serde(default = "default_fermi_surface_kpoint_distance")]
    pub fermi_surface_kpoint_distance: f64,
    /// Compute de Haas-van Alphen frequencies.
    #[serde(default)]
    pub compute_dhva_frequencies: bool,
    /// Starting field φ (degrees).
    #[serde(default)]
    pub dhva_starting_phi: f64,
    /// Starting field θ (degrees).
    #[serde(default)]
    pub dhva_starting_theta: f64,
    /// Final field φ (degrees).
    #[serde(default = "default_ending_angle")]
    pub dhva_ending_phi: f64,
    /// Final field θ (degrees).
    #[serde(default = "default_ending_angle")]
    pub dhva_ending_theta: f64,
    /// Number of rotation steps between the two orientations.
    #[serde(default = "default_num_rotation")]
    pub dhva_num_rotation: u32,
    /// Number of `dis_proj_max` values scanned.
    #[serde(default = "default_disproj_max")]
    pub number_of_disproj_max: u32,
    /// Number of `dis_proj_min` values scanned.
    #[serde(default = "default_disproj_min")]
    pub number_of_disproj_min: u32,
    /// Starting projections.
    #[serde(default)]
    pub projection_type: ProjectionType,
    /// Frozen-state selection.
    #[serde(default)]
    pub frozen_type: FrozenType,
    /// Upper limit of the frozen energy window above `E_F` (eV).
    #[serde(default = "default_energy_window")]
    pub energy_window: f64,
}

fn default_true() -> bool {
    true
}

fn default_fermi_surface_kpoint_distance() -> f64 {
    0.04
}

fn default_ending_angle() -> f64 {
    90.0
}

fn default_num_rotation() -> u32 {
    90
}

fn default_disproj_max() -> u32 {
    15
}

fn default_disproj_min() -> u32 {
    2
}

fn default_energy_window() -> f64 {
    2.0
}

impl Default for Wannier90Settings {
    fn default() -> Self {
        Self {
            exclude_semicore: true,
            plot_wannier_functions: false,
            retrieve_hamiltonian: false,
            retrieve_matrices: false,
            scan_pdwf_parameter: false,
            compute_fermi_surface: false,
            fermi_surface_kpoint_distance: default_fermi_surface_kpoint_distance(),
            compute_dhva_frequencies: false,
            dhva_starting_phi: 0.0,
            dhva_starting_theta: 0.0,
            dhva_ending_phi: default_ending_angle(),
            dhva_ending_theta: default_ending_angle(),
            dhva_num_rotation: default_num_rotation(),
            number_of_disproj_max: default_disproj_max(),
            number_of_disproj_min: default_disproj_min(),
            projection_type: ProjectionType::default(),
            frozen_type: FrozenType::default(),
            energy_window: default_energy_window(),
        }
    }
}

impl Wannier90Settings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables Wannier function plotting.
    #[must_use]
    pub fn with_plot_wannier_functions(mut self, enabled: bool) -> Self {
        self.plot_wannier_functions = enabled;
        self
    }

    /// Enables dHvA frequencies (and the Fermi surface they need).
    #[must_use]
    pub fn with_dhva_frequencies(mut self, enabled: bool) -> Self {
        self.compute_dhva_frequencies = enabled;
        if enabled {
            self.compute_fermi_surface = true;
        }
        self
    }

    /// Sets semicore exclusion.
    #[must_use]
    pub fn with_exclude_semicore(mut self, enabled: bool) -> Self {
        self.exclude_semicore = enabled;
        self
    }

    /// Sets the frozen-state selection.
    #[must_use]
    pub fn with_frozen_type(mut self, frozen_type: FrozenType) -> Self {
        self.frozen_type = frozen_type;
        self
    }

    /// Sets the disjoint-projection scan sizes.
    #[must_use]
    pub fn with_disproj_counts(mut self, max: u32, min: u32) -> Self {
        self.number_of_disproj_max = max;
        self.number_of_disproj_min = min;
        self
    }

    /// Returns the serialisable model state.
    #[must_use]
    pub fn model_state(&self) -> Outputs {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Outputs::new(),
        }
    }

    /// Restores settings from a model state, defaulting missing keys.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a present key has the wrong type or
    /// an unknown enumerated value.
    pub fn from_model_state(state: &Outputs) -> Result<Self, ConfigurationError> {
        let settings: Self = serde_json::from_value(serde_json::Value::Object(state.clone()))
            .map_err(|err| {
                ConfigurationError::new(format!("Invalid Wannier90 settings: {err}"))
                    .with_key("wannier90")
                    .with_error_info(ErrorInfo::new("CONFIG-INVALID-STATE", err.to_string()))
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates numeric ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` on an out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.number_of_disproj_max == 0 {
            return Err(ConfigurationError::new("number_of_disproj_max must be positive")
                .with_key("wannier90.number_of_disproj_max"));
        }
        if self.number_of_disproj_min == 0 {
            return Err(ConfigurationError::new("number_of_disproj_min must be positive")
                .with_key("wannier90.number_of_disproj_min"));
        }
        if self.fermi_surface_kpoint_distance <= 0.0 {
            return Err(ConfigurationError::new("fermi_surface_kpoint_distance must be positive")
                .with_key("wannier90.fermi_surface_kpoint_distance"));
        }
        if self.frozen_type.uses_energy_window() && self.energy_window < 0.0 {
            return Err(ConfigurationError::new("energy_window must not be negative")
                .with_key("wannier90.energy_window"));
        }
        if self.compute_dhva_frequencies && self.dhva_num_rotation == 0 {
            return Err(ConfigurationError::new("dhva_num_rotation must be positive")
                .with_key("wannier90.dhva_num_rotation"));
        }
        Ok(())
    }

    /// Returns the energy window if the frozen-state method uses it.
    #[must_use]
    pub fn effective_energy_window(&self) -> Option<f64> {
        self.frozen_type.uses_energy_window().then_some(self.energy_window)
    }

    /// Returns the dHvA parameters forwarded to the SKEAF step.
    #[must_use]
    pub fn dhva_parameters(&self) -> Outputs {
        let mut params = Outputs::new();
        params.insert("starting_phi".to_string(), serde_json::json!(self.dhva_starting_phi));
        params.insert("starting_theta".to_string(), serde_json::json!(self.dhva_starting_theta));
        params.insert("ending_phi".to_string(), serde_json::json!(self.dhva_ending_phi));
        params.insert("ending_theta".to_string(), serde_json::json!(self.dhva_ending_theta));
        params.insert("num_rotation".to_string(), serde_json::json!(self.dhva_num_rotation));
        params
    }

    /// Returns the starting and final field orientations.
    #[must_use]
    pub fn dhva_orientations(&self) -> (FieldOrientation, FieldOrientation) {
        (
            FieldOrientation {
                phi: self.dhva_starting_phi,
                theta: self.dhva_starting_theta,
            },
            FieldOrientation {
                phi: self.dhva_ending_phi,
                theta: self.dhva_ending_theta,
            },
        )
    }
}
