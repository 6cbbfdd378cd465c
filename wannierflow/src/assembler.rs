//! Parameter assembly: user configuration to sub-workflow inputs.
//!
//! [`get_builder`] is a pure transform. It checks the code selection first,
//! so a host mismatch is reported before anything can be submitted, then
//! reshapes [`WorkflowParameters`] into per-stage override trees, a flat
//! keyword-argument bag shared by every stage, and the parallelization
//! derived from the pw.x resource request.

use crate::codes::{check_codes, CodeSelection, Parallelization, ISOSURFACE_CODES, REQUIRED_CODES, SKEAF_CODES};
use crate::config::{Protocol, WorkflowParameters};
use crate::core::Outputs;
use crate::errors::WannierflowError;
use crate::structure::Structure;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Keyword arguments consumed by the orchestration itself and never
/// forwarded to the Wannierization.
pub const DHVA_KWARGS: [&str; 2] = ["compute_dhva_frequencies", "dHvA_frequencies_parameters"];

/// Override trees, one per sub-workflow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StageOverrides {
    /// Overrides of the DFT bands workflow (`scf`, `bands`).
    #[serde(default)]
    pub pw_bands: Outputs,
    /// Overrides of the Wannierization (`scf`, `nscf`, `wannier90_parameters`).
    #[serde(default)]
    pub wannier90_bands: Outputs,
    /// Overrides of the SKEAF workflow.
    #[serde(default)]
    pub skeaf: Outputs,
}

/// Everything the orchestration needs at launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInputs {
    /// The atomic structure.
    pub structure: Structure,
    /// Accuracy protocol.
    pub protocol: Protocol,
    /// Selected codes and their resources.
    pub codes: CodeSelection,
    /// Per-sub-workflow overrides.
    #[serde(default)]
    pub overrides: StageOverrides,
    /// Keyword arguments merged into every stage.
    #[serde(default)]
    pub kwargs: Outputs,
    /// Machine and MPI layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelization: Option<Parallelization>,
}

impl WorkflowInputs {
    /// Returns the kwargs minus the given keys.
    #[must_use]
    pub fn kwargs_without(&self, excluded: &[&str]) -> Outputs {
        self.kwargs
            .iter()
            .filter(|(key, _)| !excluded.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Returns the parallelization as an override value, if any.
    #[must_use]
    pub fn parallelization_value(&self) -> Option<Value> {
        self.parallelization
            .as_ref()
            .and_then(|p| serde_json::to_value(p).ok())
    }
}

/// Returns the code roles that must share one host.
///
/// The optional roles follow the gate flags in the merged `kwargs`, which
/// are the values the stage gates read at run time.
#[must_use]
pub fn host_checked_codes(kwargs: &Outputs) -> Vec<&'static str> {
    let enabled = |key: &str| kwargs.get(key).and_then(Value::as_bool).unwrap_or(false);
    let mut keys = REQUIRED_CODES.to_vec();
    if enabled("plot_wannier_functions") {
        keys.extend(ISOSURFACE_CODES);
    }
    if enabled("compute_dhva_frequencies") {
        keys.extend(SKEAF_CODES);
    }
    keys
}

/// Builds the launch inputs of the Wannier90 bands workflow.
///
/// `extra_kwargs` are merged last and win over the derived ones. The host
/// check runs on the merged bag, so an extra gate flag also pulls its codes
/// into the check.
///
/// # Errors
///
/// Returns `ConfigurationError` for invalid settings or a missing code, and
/// `ResourceHostMismatchError` when the needed codes span several hosts.
pub fn get_builder(
    codes: &CodeSelection,
    structure: Structure,
    parameters: &WorkflowParameters,
    extra_kwargs: Outputs,
) -> Result<WorkflowInputs, WannierflowError> {
    let mut kwargs = build_kwargs(parameters);
    kwargs.extend(extra_kwargs);
    check_codes(codes, &host_checked_codes(&kwargs))?;
    parameters.validate()?;

    for warning in parameters.warnings() {
        warn!(electronic_type = %parameters.workchain.electronic_type, "{}", warning);
    }

    let overrides = build_overrides(parameters);

    let parallelization = codes.parallelization();
    debug!(
        protocol = %parameters.workchain.protocol,
        formula = %structure.formula(),
        kwargs = kwargs.len(),
        "Assembled workflow inputs"
    );

    Ok(WorkflowInputs {
        structure,
        protocol: parameters.workchain.protocol,
        codes: codes.clone(),
        overrides,
        kwargs,
        parallelization,
    })
}

fn build_overrides(parameters: &WorkflowParameters) -> StageOverrides {
    let advanced = Value::Object(parameters.advanced.as_map().clone());

    let mut pw_bands = Outputs::new();
    pw_bands.insert("scf".to_string(), advanced.clone());
    pw_bands.insert("bands".to_string(), advanced.clone());

    let mut wannier90_bands = Outputs::new();
    wannier90_bands.insert("scf".to_string(), advanced.clone());
    wannier90_bands.insert("nscf".to_string(), advanced);
    wannier90_bands.insert(
        "wannier90_parameters".to_string(),
        json!({
            "number_of_disproj_max": parameters.wannier90.number_of_disproj_max,
            "number_of_disproj_min": parameters.wannier90.number_of_disproj_min,
        }),
    );

    StageOverrides {
        pw_bands,
        wannier90_bands,
        skeaf: Outputs::new(),
    }
}

fn build_kwargs(parameters: &WorkflowParameters) -> Outputs {
    let settings = &parameters.wannier90;
    let mut kwargs = Outputs::new();
    let mut put = |key: &str, value: Value| {
        kwargs.insert(key.to_string(), value);
    };

    put("exclude_semicore", json!(settings.exclude_semicore));
    put("plot_wannier_functions", json!(settings.plot_wannier_functions));
    put("electronic_type", json!(parameters.workchain.electronic_type));
    put("spin_type", json!(parameters.workchain.spin_type));
    if let Some(moments) = parameters.advanced.initial_magnetic_moments() {
        put("initial_magnetic_moments", moments.clone());
    }
    put("projection_type", json!(settings.projection_type));
    put("frozen_type", json!(settings.frozen_type));
    if let Some(window) = settings.effective_energy_window() {
        put("energy_window", json!(window));
    }
    put("retrieve_hamiltonian", json!(settings.retrieve_hamiltonian));
    put("retrieve_matrices", json!(settings.retrieve_matrices));
    put("scan_pdwf_parameter", json!(settings.scan_pdwf_parameter));
    put("compute_fermi_surface", json!(settings.compute_fermi_surface));
    if settings.compute_fermi_surface {
        put("fermi_surface_kpoint_distance", json!(settings.fermi_surface_kpoint_distance));
    }
    put("compute_dhva_frequencies", json!(settings.compute_dhva_frequencies));
    if settings.compute_dhva_frequencies {
        put("dHvA_frequencies_parameters", Value::Object(settings.dhva_parameters()));
    }
    kwargs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{CodeDescriptor, CodeResources};
    use crate::config::{AdvancedSettings, FrozenType, Wannier90Settings};
    use crate::testing::fixtures;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_host_mismatch_rejected() {
        let codes = fixtures::code_selection("daint").with(
            "wannier90",
            CodeResources::new(CodeDescriptor::known("wannier90", "localhost")),
        );
        let err = get_builder(&codes, fixtures::silicon(), &WorkflowParameters::new(), Outputs::new())
            .unwrap_err();
        assert!(matches!(err, WannierflowError::ResourceHostMismatch(_)));
    }

    #[test]
    fn test_missing_code_rejected() {
        let codes = CodeSelection::new().with("pw", CodeResources::new(CodeDescriptor::known("pw", "daint")));
        let err = get_builder(&codes, fixtures::silicon(), &WorkflowParameters::new(), Outputs::new())
            .unwrap_err();
        match err {
            WannierflowError::Configuration(config) => {
                assert_eq!(config.key.as_deref(), Some("codes.projwfc"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_optional_codes_checked_only_when_enabled() {
        let codes = fixtures::code_selection("daint").with(
            "python",
            CodeResources::new(CodeDescriptor::known("python", "workstation")),
        );
        let params = WorkflowParameters::new();
        assert!(get_builder(&codes, fixtures::silicon(), &params, Outputs::new()).is_ok());

        let params = params.with_wannier90(Wannier90Settings::new().with_plot_wannier_functions(true));
        assert!(get_builder(&codes, fixtures::silicon(), &params, Outputs::new()).is_err());
    }

    #[test]
    fn test_extra_gate_flag_joins_host_check() {
        let codes = fixtures::code_selection("daint").with(
            "python",
            CodeResources::new(CodeDescriptor::known("python", "workstation")),
        );
        let mut extra = Outputs::new();
        extra.insert("plot_wannier_functions".to_string(), json!(true));
        let err = get_builder(&codes, fixtures::silicon(), &WorkflowParameters::new(), extra).unwrap_err();
        assert!(matches!(err, WannierflowError::ResourceHostMismatch(_)));

        let mut extra = Outputs::new();
        extra.insert("compute_dhva_frequencies".to_string(), json!(true));
        let err = get_builder(&fixtures::code_selection("daint"), fixtures::silicon(), &WorkflowParameters::new(), extra)
            .unwrap_err();
        match err {
            WannierflowError::Configuration(config) => {
                assert_eq!(config.key.as_deref(), Some("codes.wan2skeaf"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overrides_and_defaults() {
        let params = WorkflowParameters::new()
            .with_advanced(AdvancedSettings::new().with_pseudos(&fixtures::silicon_pseudos()));
        let inputs = get_builder(&fixtures::code_selection("daint"), fixtures::silicon(), &params, Outputs::new())
            .unwrap();

        assert!(inputs.overrides.pw_bands["scf"]["pw"]["pseudos"].is_object());
        assert_eq!(
            inputs.overrides.wannier90_bands["wannier90_parameters"],
            json!({"number_of_disproj_max": 15, "number_of_disproj_min": 2})
        );
        assert_eq!(inputs.kwargs["exclude_semicore"], json!(true));
        assert_eq!(inputs.kwargs["energy_window"], json!(2.0));
        assert!(!inputs.kwargs.contains_key("dHvA_frequencies_parameters"));
        assert!(!inputs.kwargs.contains_key("initial_magnetic_moments"));
        assert_eq!(
            inputs.parallelization,
            Some(Parallelization {
                num_machines: 1,
                num_mpiprocs_per_machine: 1
            })
        );
    }

    #[test]
    fn test_energy_window_dropped_for_projectability() {
        let params = WorkflowParameters::new()
            .with_wannier90(Wannier90Settings::new().with_frozen_type(FrozenType::Projectability));
        let inputs = get_builder(&fixtures::code_selection("daint"), fixtures::silicon(), &params, Outputs::new())
            .unwrap();
        assert!(!inputs.kwargs.contains_key("energy_window"));
        assert_eq!(inputs.kwargs["frozen_type"], json!("projectability"));
    }

    #[test]
    fn test_dhva_kwargs_and_filtering() {
        let params = WorkflowParameters::new()
            .with_wannier90(Wannier90Settings::new().with_dhva_frequencies(true));
        let inputs = fixtures::code_selection("daint")
            .with("wan2skeaf", CodeResources::new(CodeDescriptor::known("wan2skeaf", "daint")))
            .with("skeaf", CodeResources::new(CodeDescriptor::known("skeaf", "daint")));
        let inputs = get_builder(&inputs, fixtures::silicon(), &params, Outputs::new()).unwrap();

        assert_eq!(inputs.kwargs["dHvA_frequencies_parameters"]["num_rotation"], json!(90));
        let filtered = inputs.kwargs_without(&DHVA_KWARGS);
        assert!(!filtered.contains_key("compute_dhva_frequencies"));
        assert!(!filtered.contains_key("dHvA_frequencies_parameters"));
        assert!(filtered.contains_key("compute_fermi_surface"));
    }

    #[test]
    fn test_extra_kwargs_win() {
        let mut extra = Outputs::new();
        extra.insert("exclude_semicore".to_string(), json!(false));
        let inputs = get_builder(
            &fixtures::code_selection("daint"),
            fixtures::silicon(),
            &WorkflowParameters::new(),
            extra,
        )
        .unwrap();
        assert_eq!(inputs.kwargs["exclude_semicore"], json!(false));
    }
}
