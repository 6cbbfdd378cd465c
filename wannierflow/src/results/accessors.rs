//! Read-only views over the workflow's output namespace.

use super::dhva::DhvaFrequencies;
use super::download::{download_links, DownloadLink};
use super::wout::{parse_wout, ConvergenceHistory, WOUT_FILE};
use crate::core::{lookup_path, Outputs};
use crate::errors::FileParseError;
use crate::structure::Structure;
use crate::workflow::ports::{under, W90_OPTIMAL, W90_PLOT};
use crate::workflow::{GENERATE_ISOSURFACE, PW_BANDS, SKEAF, WANNIER90_BANDS};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Spread decomposition of the optimal Wannierization (Å²).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadSummary {
    /// Number of Wannier functions.
    pub number_wfs: u64,
    /// Diagonal part of the spread.
    #[serde(rename = "Omega_D")]
    pub omega_d: f64,
    /// Gauge-invariant part of the spread.
    #[serde(rename = "Omega_I")]
    pub omega_i: f64,
    /// Off-diagonal part of the spread.
    #[serde(rename = "Omega_OD")]
    pub omega_od: f64,
}

/// One column of the centers/spreads table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    /// Row field shown in the column.
    pub field: String,
    /// Column title.
    pub header_name: String,
    /// Cells are read-only.
    pub editable: bool,
    /// Width in pixels, if fixed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl TableColumn {
    fn new(field: &str, header_name: &str, width: Option<u32>) -> Self {
        Self {
            field: field.to_string(),
            header_name: header_name.to_string(),
            editable: false,
            width,
        }
    }
}

/// One Wannier function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentersSpreadsRow {
    /// 1-based index.
    pub id: usize,
    /// Spread at the first iteration, rounded to 3 places.
    pub spreads_initial: f64,
    /// Final spread, rounded to 3 places.
    pub spreads_final: f64,
    /// Final centre as `[x, y, z]` with 4 decimals.
    pub centers_final: String,
    /// Initial centre as `[x, y, z]` with 4 decimals.
    pub centers_initial: String,
    /// Imaginary/real ratio, when the plot step ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub im_re_ratio: Option<f64>,
}

/// Per-function centres and spreads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentersSpreadsTable {
    /// Columns in display order.
    pub columns: Vec<TableColumn>,
    /// One row per Wannier function.
    pub data: Vec<CentersSpreadsRow>,
}

/// Reference DFT bands next to the Wannier-interpolated ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandPair {
    /// The `pw_bands` outputs.
    pub reference: Outputs,
    /// The same outputs with the interpolated band structure.
    pub interpolated: Outputs,
}

/// Isosurface outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsosurfaceBundle {
    /// Atoms of the contoured files.
    pub atoms: Value,
    /// Isovalue or error per file.
    pub parameters: Value,
    /// Flattened mesh arrays.
    pub mesh_data: Value,
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10_f64.powi(places);
    (value * scale).round() / scale
}

fn format_centre(centre: Option<&Value>) -> String {
    let parts: Vec<String> = centre
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_f64).map(|x| format!("{x:.4}")).collect())
        .unwrap_or_default();
    format!("[{}]", parts.join(", "))
}

/// Accessors over a finished run's outputs.
#[derive(Debug, Clone, Copy)]
pub struct Wannier90Results<'a> {
    outputs: &'a Outputs,
}

impl<'a> Wannier90Results<'a> {
    /// Wraps an output tree.
    #[must_use]
    pub fn new(outputs: &'a Outputs) -> Self {
        Self { outputs }
    }

    fn get(&self, path: &str) -> Option<&'a Value> {
        lookup_path(self.outputs, path)
    }

    fn optimal(&self, path: &str) -> Option<&'a Value> {
        self.get(&under(WANNIER90_BANDS, &under(W90_OPTIMAL, path)))
    }

    /// Returns true if the isosurface stage exposed outputs.
    #[must_use]
    pub fn has_isosurface(&self) -> bool {
        self.outputs.contains_key(GENERATE_ISOSURFACE)
    }

    /// Returns the primitive structure of the DFT step.
    #[must_use]
    pub fn structure(&self) -> Option<Structure> {
        self.get(&under(PW_BANDS, "primitive_structure"))
            .or_else(|| self.get(&under(PW_BANDS, "scf.structure")))
            .and_then(|value| Structure::from_value(value).ok())
    }

    /// Returns the distance between the DFT and interpolated bands.
    #[must_use]
    pub fn bands_distance(&self) -> Option<f64> {
        self.get(&under(WANNIER90_BANDS, "bands_distance")).and_then(Value::as_f64)
    }

    /// Returns the spread decomposition of the optimal calculation.
    #[must_use]
    pub fn summary(&self) -> Option<SpreadSummary> {
        self.optimal("output_parameters")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Returns the centres/spreads table of the optimal calculation.
    #[must_use]
    pub fn centers_spreads(&self) -> Option<CentersSpreadsTable> {
        let parameters = self.optimal("output_parameters")?;
        let initial = parameters.get("wannier_functions_initial")?.as_array()?;
        let output = parameters.get("wannier_functions_output")?.as_array()?;
        let plot = self
            .get(&under(WANNIER90_BANDS, &under(W90_PLOT, "output_parameters.wannier_functions_output")))
            .and_then(Value::as_array);

        let mut columns = vec![
            TableColumn::new("id", "WF", None),
            TableColumn::new("spreads_initial", "Initial spread (first iteration) (Å2)", Some(130)),
            TableColumn::new("spreads_final", "Final spread (Å2)", Some(130)),
            TableColumn::new("centers_final", "Centers final (Å)", Some(180)),
            TableColumn::new("centers_initial", "Centers initial (Å)", Some(180)),
        ];
        if plot.is_some() {
            columns.push(TableColumn::new("im_re_ratio", "Im_re_ratio", None));
        }

        let spread = |function: &Value| {
            round_to(function.get("wf_spreads").and_then(Value::as_f64).unwrap_or(f64::NAN), 3)
        };
        let data = initial
            .iter()
            .zip(output)
            .enumerate()
            .map(|(index, (first, last))| CentersSpreadsRow {
                id: index + 1,
                spreads_initial: spread(first),
                spreads_final: spread(last),
                centers_final: format_centre(last.get("wf_centres")),
                centers_initial: format_centre(first.get("wf_centres")),
                im_re_ratio: plot
                    .and_then(|functions| functions.get(index))
                    .and_then(|function| function.get("im_re_ratio"))
                    .and_then(Value::as_f64),
            })
            .collect();

        Some(CentersSpreadsTable { columns, data })
    }

    /// Returns the DFT outputs and a copy with the interpolated band structure.
    #[must_use]
    pub fn band_pair(&self) -> Option<BandPair> {
        let reference = self.outputs.get(PW_BANDS)?.as_object()?.clone();
        let bands = self.get(&under(WANNIER90_BANDS, "band_structure"))?;
        let mut interpolated = reference.clone();
        interpolated.insert("band_structure".to_string(), bands.clone());
        Some(BandPair { reference, interpolated })
    }

    /// Returns the isosurface outputs, if that stage ran.
    #[must_use]
    pub fn isosurface(&self) -> Option<IsosurfaceBundle> {
        let branch = self.outputs.get(GENERATE_ISOSURFACE)?;
        Some(IsosurfaceBundle {
            atoms: branch.get("atoms")?.clone(),
            parameters: branch.get("parameters")?.clone(),
            mesh_data: branch.get("mesh_data")?.clone(),
        })
    }

    /// Returns the classified dHvA frequencies, if the SKEAF stage ran.
    #[must_use]
    pub fn dhva_frequencies(&self) -> Option<DhvaFrequencies> {
        self.get(&under(SKEAF, "frequencies")).map(DhvaFrequencies::from_value)
    }

    /// Parses the Ω_I and Ω_tot histories from the retrieved `.wout` file.
    ///
    /// Returns `Ok(None)` if the file was not retrieved.
    ///
    /// # Errors
    ///
    /// Returns `FileParseError` for a malformed spread line.
    pub fn convergence(&self) -> Result<Option<ConvergenceHistory>, FileParseError> {
        // File names contain dots, so the last step is a plain key lookup.
        self.optimal("retrieved")
            .and_then(|retrieved| retrieved.get(WOUT_FILE))
            .and_then(Value::as_str)
            .map(parse_wout)
            .transpose()
    }

    /// Returns the downloadable files of the optimal calculation.
    #[must_use]
    pub fn downloads(&self) -> Vec<DownloadLink> {
        self.optimal("retrieved").map(download_links).unwrap_or_default()
    }
}
