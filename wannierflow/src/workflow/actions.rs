//! Stage actions of the Wannier90 bands workflow.

use super::ports::{
    under, EXCLUDE_BANDS, ISOSURFACE_PORTS, PW_BANDS_KPOINTS, PW_BAND_STRUCTURE, PW_SCF_REMOTE_FOLDER,
    PW_SCF_STRUCTURE, REMOTE_FOLDER, STRUCTURE, W90_OPTIMAL, W90_PLOT,
};
use super::{skeaf, PW_BANDS, WANNIER90_BANDS};
use crate::assembler::DHVA_KWARGS;
use crate::codes::{REQUIRED_CODES, SKEAF_CODES};
use crate::context::RunContext;
use crate::core::Outputs;
use crate::electrons::derive_num_electrons;
use crate::engine::{ProcessKind, SubmissionRequest};
use crate::errors::{EngineError, WannierflowError};
use crate::pipeline::StageAction;
use crate::structure::{PseudoTable, Structure};
use crate::volumetric::{DEFAULT_PERCENTILE, ISOSURFACE_FUNCTION};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// Start of the `dis_proj_max` scan.
pub const DISPROJ_MAX_RANGE: (f64, f64) = (0.99, 0.85);
/// Start of the `dis_proj_min` scan.
pub const DISPROJ_MIN_RANGE: (f64, f64) = (0.01, 0.15);

/// `count` evenly spaced values from `start` to `stop`, both included.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

fn insert_path(tree: &mut Outputs, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut node = tree;
    for part in parents {
        let child = node
            .entry((*part).to_string())
            .or_insert_with(|| Value::Object(Outputs::new()));
        if !child.is_object() {
            *child = Value::Object(Outputs::new());
        }
        let Value::Object(map) = child else {
            return;
        };
        node = map;
    }
    node.insert((*last).to_string(), value);
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, WannierflowError> {
    Ok(serde_json::to_value(value)?)
}

/// Submits the DFT SCF + bands workflow.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunDftBands;

#[async_trait]
impl StageAction for RunDftBands {
    fn label(&self) -> &str {
        "run_dft_bands"
    }

    async fn prepare(&self, run: &RunContext) -> Result<SubmissionRequest, WannierflowError> {
        let inputs = run.inputs();
        let pw = inputs.codes.require("pw")?;

        let mut tree = Outputs::new();
        tree.insert("code".to_string(), to_value(pw)?);
        tree.insert("structure".to_string(), inputs.structure.to_value());
        tree.insert("protocol".to_string(), json!(inputs.protocol));
        tree.insert("overrides".to_string(), Value::Object(inputs.overrides.pw_bands.clone()));
        tree.insert("kwargs".to_string(), Value::Object(inputs.kwargs.clone()));
        if let Some(parallelization) = inputs.parallelization_value() {
            tree.insert("parallelization".to_string(), parallelization);
        }

        Ok(SubmissionRequest::new(ProcessKind::PwBands, PW_BANDS, tree).on_computer(&pw.computer))
    }
}

/// Submits the Wannierization on top of the DFT SCF charge density.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunWannierization;

#[async_trait]
impl StageAction for RunWannierization {
    fn label(&self) -> &str {
        "run_wannierization"
    }

    async fn prepare(&self, run: &RunContext) -> Result<SubmissionRequest, WannierflowError> {
        let inputs = run.inputs();
        let pw_bands = run.store.require(PW_BANDS)?;

        let parent_folder = pw_bands.require_output(PW_BANDS, PW_SCF_REMOTE_FOLDER)?.clone();
        let reference_bands = pw_bands.require_output(PW_BANDS, PW_BAND_STRUCTURE)?.clone();
        let bands_kpoints = pw_bands.require_output(PW_BANDS, PW_BANDS_KPOINTS)?.clone();
        let structure = pw_bands
            .output(PW_SCF_STRUCTURE)
            .cloned()
            .unwrap_or_else(|| inputs.structure.to_value());

        let mut overrides = inputs.overrides.wannier90_bands.clone();
        let scan = overrides.remove("wannier90_parameters").unwrap_or(Value::Null);
        let count = |key: &str, default: u64| {
            usize::try_from(scan.get(key).and_then(Value::as_u64).unwrap_or(default)).unwrap_or(0)
        };
        let n_max = count("number_of_disproj_max", 15);
        let n_min = count("number_of_disproj_min", 2);

        overrides.remove("scf");
        insert_path(&mut overrides, &["wannier90", "wannier90", "wannier_plot_format"], json!("cube"));
        insert_path(
            &mut overrides,
            &["wannier90", "wannier90", "bands_plot"],
            json!(run.flag("plot_wannier_functions")),
        );
        insert_path(&mut overrides, &["nscf", "pw", "parent_folder"], parent_folder);

        let codes = inputs.codes.subset(&REQUIRED_CODES)?;
        let wannier90 = inputs.codes.require("wannier90")?;

        let mut tree = Outputs::new();
        tree.insert("codes".to_string(), to_value(&codes)?);
        tree.insert("structure".to_string(), structure);
        tree.insert("protocol".to_string(), json!(inputs.protocol));
        tree.insert("reference_bands".to_string(), reference_bands);
        tree.insert("bands_kpoints".to_string(), bands_kpoints);
        tree.insert("overrides".to_string(), Value::Object(overrides));
        tree.insert("kwargs".to_string(), Value::Object(inputs.kwargs_without(&DHVA_KWARGS)));
        tree.insert(
            "optimize_disprojmax_range".to_string(),
            json!(linspace(DISPROJ_MAX_RANGE.0, DISPROJ_MAX_RANGE.1, n_max)),
        );
        tree.insert(
            "optimize_disprojmin_range".to_string(),
            json!(linspace(DISPROJ_MIN_RANGE.0, DISPROJ_MIN_RANGE.1, n_min)),
        );
        if let Some(parallelization) = inputs.parallelization_value() {
            tree.insert("parallelization".to_string(), parallelization);
        }

        debug!(n_max, n_min, "Disjoint-projection scan ranges");
        Ok(SubmissionRequest::new(ProcessKind::Wannier90Optimize, WANNIER90_BANDS, tree)
            .on_computer(&wannier90.computer))
    }
}

/// Submits the isosurface extraction over the Wannier function files.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenerateIsosurface;

#[async_trait]
impl StageAction for GenerateIsosurface {
    fn label(&self) -> &str {
        "generate_isosurface"
    }

    async fn prepare(&self, run: &RunContext) -> Result<SubmissionRequest, WannierflowError> {
        let inputs = run.inputs();
        let wannier = run.store.require(WANNIER90_BANDS)?;
        let parent_folder = wannier
            .require_output(WANNIER90_BANDS, &under(W90_PLOT, REMOTE_FOLDER))?
            .clone();

        let python = inputs.codes.require("python")?;
        // Runs next to the Wannier90 files, not where the python code lives.
        let computer = &inputs.codes.require("wannier90")?.computer;

        let mut tree = Outputs::new();
        tree.insert("function".to_string(), json!(ISOSURFACE_FUNCTION));
        tree.insert("code".to_string(), to_value(python)?);
        tree.insert("parent_folder".to_string(), parent_folder);
        tree.insert("percentile".to_string(), json!(DEFAULT_PERCENTILE));
        tree.insert("output_ports".to_string(), json!(ISOSURFACE_PORTS));

        Ok(SubmissionRequest::new(ProcessKind::PythonJob, super::GENERATE_ISOSURFACE, tree).on_computer(computer))
    }
}

/// Submits the SKEAF de Haas-van Alphen frequency workflow.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunFermiSurfaceFrequencies;

#[async_trait]
impl StageAction for RunFermiSurfaceFrequencies {
    fn label(&self) -> &str {
        "run_fermi_surface_frequencies"
    }

    async fn prepare(&self, run: &RunContext) -> Result<SubmissionRequest, WannierflowError> {
        let inputs = run.inputs();
        let wannier = run.store.require(WANNIER90_BANDS)?;

        let calculation = [W90_PLOT, W90_OPTIMAL]
            .into_iter()
            .find(|namespace| wannier.output(&under(namespace, REMOTE_FOLDER)).is_some())
            .ok_or_else(|| EngineError::missing_output(WANNIER90_BANDS, under(W90_OPTIMAL, REMOTE_FOLDER)))?;
        let bxsf = wannier
            .require_output(WANNIER90_BANDS, &under(calculation, REMOTE_FOLDER))?
            .clone();

        let structure = match wannier.output(&under(calculation, STRUCTURE)) {
            Some(value) => Structure::from_value(value)?,
            None => inputs.structure.clone(),
        };
        let excluded = wannier
            .output(&under(calculation, EXCLUDE_BANDS))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);

        let pseudos = PseudoTable::from_pw_overrides(&inputs.overrides.pw_bands)?;
        let pseudo_electrons = pseudos.number_of_electrons(&structure)?;
        let num_electrons = derive_num_electrons(pseudo_electrons, excluded)?;

        let parameters = skeaf::overlay(
            skeaf::protocol_parameters(inputs.protocol),
            run.kwarg("dHvA_frequencies_parameters"),
        );
        let codes = inputs.codes.subset(&SKEAF_CODES)?;
        let skeaf_code = inputs.codes.require("skeaf")?;

        let mut tree = Outputs::new();
        tree.insert("codes".to_string(), to_value(&codes)?);
        tree.insert("bxsf".to_string(), bxsf);
        tree.insert("num_electrons".to_string(), json!(num_electrons));
        tree.insert("protocol".to_string(), json!(inputs.protocol));
        tree.insert("overrides".to_string(), Value::Object(inputs.overrides.skeaf.clone()));
        tree.insert("skeaf".to_string(), json!({ "parameters": parameters }));

        debug!(calculation, pseudo_electrons, excluded, num_electrons, "Prepared SKEAF inputs");
        Ok(SubmissionRequest::new(ProcessKind::Skeaf, super::SKEAF, tree).on_computer(&skeaf_code.computer))
    }
}
