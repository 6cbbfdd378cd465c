//! Canned inputs and process outputs.

use crate::assembler::{get_builder, WorkflowInputs};
use crate::codes::{CodeDescriptor, CodeResources, CodeSelection, ISOSURFACE_CODES, REQUIRED_CODES, SKEAF_CODES};
use crate::config::{AdvancedSettings, Wannier90Settings, WorkflowParameters};
use crate::core::Outputs;
use crate::structure::{PseudoPotential, PseudoTable, Structure};
use serde_json::{json, Value};

/// Lattice constant of silicon in Å.
pub const SILICON_LATTICE: f64 = 5.43;

/// Remote folder of the DFT SCF step.
pub const SCF_REMOTE_PATH: &str = "/scratch/pw_bands/scf";

/// Remote folder of the Wannier90 plot step.
pub const PLOT_REMOTE_PATH: &str = "/scratch/wannier90_bands/plot";

/// Diamond silicon in its primitive fcc cell.
#[must_use]
pub fn silicon() -> Structure {
    let a = SILICON_LATTICE / 2.0;
    Structure::new([[0.0, a, a], [a, 0.0, a], [a, a, 0.0]])
        .with_atom("Si", [0.0, 0.0, 0.0])
        .with_atom("Si", [a / 2.0, a / 2.0, a / 2.0])
}

/// Norm-conserving silicon with four valence electrons.
#[must_use]
pub fn silicon_pseudos() -> PseudoTable {
    pseudos_with_valence(4.0)
}

/// A silicon table with a custom valence.
#[must_use]
pub fn pseudos_with_valence(z_valence: f64) -> PseudoTable {
    let mut table = PseudoTable::new();
    table.insert("Si", PseudoPotential::new("Si", z_valence));
    table
}

/// The four required codes on one host.
#[must_use]
pub fn code_selection(host: &str) -> CodeSelection {
    with_codes(CodeSelection::new(), &REQUIRED_CODES, host)
}

/// Every known code on one host.
#[must_use]
pub fn full_code_selection(host: &str) -> CodeSelection {
    let selection = with_codes(code_selection(host), &ISOSURFACE_CODES, host);
    with_codes(selection, &SKEAF_CODES, host)
}

fn with_codes(selection: CodeSelection, keys: &[&str], host: &str) -> CodeSelection {
    keys.iter().fold(selection, |selection, key| {
        selection.with(*key, CodeResources::new(CodeDescriptor::known(key, host)))
    })
}

/// Default parameters with the silicon pseudopotentials.
#[must_use]
pub fn workflow_parameters() -> WorkflowParameters {
    WorkflowParameters::new().with_advanced(AdvancedSettings::new().with_pseudos(&silicon_pseudos()))
}

/// Parameters with both optional stages switched on.
#[must_use]
pub fn full_workflow_parameters() -> WorkflowParameters {
    workflow_parameters().with_wannier90(
        Wannier90Settings::new()
            .with_plot_wannier_functions(true)
            .with_dhva_frequencies(true),
    )
}

/// Launch inputs for silicon with default settings.
///
/// # Panics
///
/// Panics if the fixture parameters stop validating.
#[must_use]
pub fn workflow_inputs() -> WorkflowInputs {
    get_builder(&code_selection("localhost"), silicon(), &workflow_parameters(), Outputs::new())
        .expect("fixture parameters are valid")
}

/// Launch inputs with isosurfaces and dHvA frequencies enabled.
///
/// # Panics
///
/// Panics if the fixture parameters stop validating.
#[must_use]
pub fn full_workflow_inputs() -> WorkflowInputs {
    get_builder(&full_code_selection("localhost"), silicon(), &full_workflow_parameters(), Outputs::new())
        .expect("fixture parameters are valid")
}

fn object(value: Value) -> Outputs {
    match value {
        Value::Object(map) => map,
        _ => Outputs::new(),
    }
}

fn band_structure(shift: f64) -> Value {
    json!({
        "labels": ["G", "X", "W", "L", "G"],
        "bands": [[-5.8 + shift, -5.1 + shift], [6.2 + shift, 5.9 + shift]],
    })
}

/// Outputs of a finished DFT bands workflow.
#[must_use]
pub fn pw_bands_outputs() -> Outputs {
    object(json!({
        "scf": {
            "remote_folder": {"path": SCF_REMOTE_PATH},
            "structure": silicon().to_value(),
        },
        "bands": {"kpoints": {"mesh": [[0.0, 0.0, 0.0], [0.5, 0.0, 0.5]]}},
        "band_structure": band_structure(0.0),
        "primitive_structure": silicon().to_value(),
    }))
}

fn wannier_functions(spreads: [f64; 2], ratios: bool) -> Value {
    let centres = [[0.0, 0.0, 0.0], [0.678_76, 0.678_76, 0.678_76]];
    let functions: Vec<Value> = spreads
        .iter()
        .zip(centres)
        .map(|(spread, centre)| {
            let mut entry = json!({"wf_spreads": spread, "wf_centres": centre});
            if ratios {
                entry["im_re_ratio"] = json!(0.0012);
            }
            entry
        })
        .collect();
    Value::Array(functions)
}

fn output_parameters() -> Value {
    json!({
        "number_wfs": 2,
        "Omega_D": 0.052,
        "Omega_I": 3.614,
        "Omega_OD": 0.871,
        "wannier_functions_initial": wannier_functions([2.345_67, 2.398_21], false),
        "wannier_functions_output": wannier_functions([1.876_54, 1.880_01], false),
    })
}

/// `.wout` excerpt with two disentanglement and two spread iterations.
pub const WOUT_EXCERPT: &str = "\
 Extraction of optimally-connected subspace
      1       3.65184123      3.61845231       9.226E-03      0.00    <-- DIS
      2       3.61845231      3.61402010       1.226E-03      0.00    <-- DIS
 Initial State
      0     0.123E+01     0.0000000000        4.7460126930  <-- CONV
       O_D=      0.0523512 O_OD=      0.8715873 O_TOT=      4.5376110 <-- SPRD
       O_D=      0.0521033 O_OD=      0.8709999 O_TOT=      4.5371232 <-- SPRD
";

/// Outputs of a finished Wannierization, with or without the plot step.
///
/// `excluded_bands` is the number of semicore bands left out.
#[must_use]
pub fn wannier90_outputs(with_plot: bool, excluded_bands: usize) -> Outputs {
    let exclude: Vec<usize> = (1..=excluded_bands).collect();
    let mut outputs = object(json!({
        "wannier90_optimal": {
            "remote_folder": {"path": "/scratch/wannier90_bands/optimal"},
            "structure": silicon().to_value(),
            "parameters": {"exclude_bands": exclude},
            "output_parameters": output_parameters(),
            "retrieved": {
                "aiida.wout": WOUT_EXCERPT,
                "aiida_tb.dat": "tight-binding model",
                "aiida.bxsf": "BEGIN_BLOCK_BANDGRID_3D",
                "aiida.win": "num_wann = 2",
            },
        },
        "band_structure": band_structure(0.01),
        "bands_distance": 0.0123,
    }));
    if with_plot {
        outputs.insert(
            "wannier90_plot".to_string(),
            json!({
                "remote_folder": {"path": PLOT_REMOTE_PATH},
                "structure": silicon().to_value(),
                "parameters": {"exclude_bands": (1..=excluded_bands).collect::<Vec<_>>()},
                "output_parameters": {
                    "wannier_functions_output": wannier_functions([1.876_54, 1.880_01], true),
                },
            }),
        );
    }
    outputs
}

/// Outputs of the isosurface job for one Wannier function.
#[must_use]
pub fn isosurface_outputs() -> Outputs {
    object(json!({
        "atoms": [{"symbol": "Si", "position": [0.0, 0.0, 0.0]}],
        "parameters": {"aiida_00001": {"isovalue": 0.42}},
        "mesh_data": {
            "aiida_00001_positive_vertices": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            "aiida_00001_positive_faces": [0, 1, 2],
            "aiida_00001_negative_vertices": [0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0],
            "aiida_00001_negative_faces": [0, 2, 1],
        },
    }))
}

/// Outputs of the SKEAF workflow for a θ sweep and a combined rotation.
#[must_use]
pub fn skeaf_outputs() -> Outputs {
    object(json!({
        "frequencies": {
            "band_5": {
                "phi": [0.0, 0.0, 0.0],
                "theta": [0.0, 45.0, 90.0],
                "freq": [1.2, 1.4, 1.9],
            },
            "band_6": {
                "phi": [0.0, 30.0, 30.0],
                "theta": [0.0, 0.0, 60.0],
                "freq": [2.2, 2.3, 2.5],
            },
        },
        "output_parameters": {"num_rotation": 90},
    }))
}
