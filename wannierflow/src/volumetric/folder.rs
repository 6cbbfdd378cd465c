//! Contouring every volumetric file of a retrieved folder.

use super::grid::Atom;
use super::isosurface::symmetric_isosurfaces;
use super::parse_file;
use crate::core::Outputs;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Extensions picked up by [`process_folder`].
pub const VOLUMETRIC_EXTENSIONS: [&str; 2] = ["xsf", "cube"];

/// Per-file outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileResult {
    /// The file was contoured at `±isovalue`.
    Isovalue {
        /// The absolute threshold.
        isovalue: f64,
    },
    /// The file could not be processed.
    Error {
        /// What went wrong.
        error: String,
    },
}

/// A flattened mesh array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeshArray {
    /// Vertex coordinates, three per vertex.
    Vertices(Vec<f64>),
    /// Vertex indices, three per face.
    Faces(Vec<usize>),
}

/// Everything extracted from one folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderIsosurfaces {
    /// Atoms of the last file that carried any.
    pub atoms: Option<Vec<Atom>>,
    /// Outcome per file key: the file name without extension, or
    /// `{stem}_{extension}` when two files share a stem.
    pub parameters: BTreeMap<String, FileResult>,
    /// `{key}_{positive|negative}_{vertices|faces}` arrays.
    pub mesh_data: BTreeMap<String, MeshArray>,
}

impl FolderIsosurfaces {
    /// Returns the keys that failed.
    #[must_use]
    pub fn failed_keys(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|(_, result)| matches!(result, FileResult::Error { .. }))
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Converts into the `atoms`/`parameters`/`mesh_data` output tree.
    ///
    /// # Errors
    ///
    /// Fails only if a value cannot be serialized.
    pub fn to_outputs(&self) -> Result<Outputs, serde_json::Error> {
        let mut outputs = Outputs::new();
        outputs.insert("atoms".to_string(), serde_json::to_value(&self.atoms)?);
        outputs.insert("parameters".to_string(), serde_json::to_value(&self.parameters)?);
        outputs.insert("mesh_data".to_string(), serde_json::to_value(&self.mesh_data)?);
        Ok(outputs)
    }
}

/// Contours every `.xsf` and `.cube` file in `folder` at `±|percentile|`.
///
/// Files are visited in name order. A file that fails is recorded under its
/// key with an error message and does not stop the others.
///
/// # Errors
///
/// Fails only if the folder itself cannot be listed.
pub fn process_folder(folder: &Path, percentile: f64) -> anyhow::Result<FolderIsosurfaces> {
    let mut files = std::fs::read_dir(folder)
        .with_context(|| format!("cannot list {}", folder.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| VOLUMETRIC_EXTENSIONS.contains(&ext))
        })
        .collect::<Vec<_>>();
    files.sort();

    let mut stems: BTreeMap<String, usize> = BTreeMap::new();
    for path in &files {
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            *stems.entry(stem.to_string()).or_default() += 1;
        }
    }

    let mut result = FolderIsosurfaces::default();
    for path in files {
        let Some(key) = file_key(&path, &stems) else {
            continue;
        };
        let file_name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();

        match contour_file(&path, percentile) {
            Ok((atoms, pair)) => {
                debug!(file = %file_name, isovalue = pair.isovalue, faces = pair.positive.faces.len(), "Contoured volumetric file");
                if !atoms.is_empty() {
                    result.atoms = Some(atoms);
                }
                result.parameters.insert(key.clone(), FileResult::Isovalue { isovalue: pair.isovalue });
                for (sign, mesh) in [("positive", &pair.positive), ("negative", &pair.negative)] {
                    result
                        .mesh_data
                        .insert(format!("{key}_{sign}_vertices"), MeshArray::Vertices(mesh.flat_vertices()));
                    result
                        .mesh_data
                        .insert(format!("{key}_{sign}_faces"), MeshArray::Faces(mesh.flat_faces()));
                }
            }
            Err(err) => {
                warn!(file = %file_name, error = %format!("{err:#}"), "Skipping volumetric file");
                result.parameters.insert(
                    key,
                    FileResult::Error {
                        error: format!("Failed to process file {file_name}: {err:#}"),
                    },
                );
            }
        }
    }
    Ok(result)
}

/// The file stem, or `{stem}_{extension}` when several files share the stem.
fn file_key(path: &Path, stems: &BTreeMap<String, usize>) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stems.get(stem).copied().unwrap_or_default() > 1 {
        let extension = path.extension()?.to_str()?;
        Some(format!("{stem}_{extension}"))
    } else {
        Some(stem.to_string())
    }
}

fn contour_file(path: &Path, percentile: f64) -> anyhow::Result<(Vec<Atom>, super::IsosurfacePair)> {
    let data = parse_file(path)?;
    let pair = symmetric_isosurfaces(&data.grid, percentile).context("isosurface extraction failed")?;
    Ok((data.atoms, pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_xsf(dir: &TempDir, name: &str, samples: &str) {
        let text = format!(
            "ATOMS\n 8 0.5 0.5 0.5\nBEGIN_BLOCK_DATAGRID_3D\n wf\nBEGIN_DATAGRID_3D_wf\n 2 2 2\n 0 0 0\n\
             1 0 0\n 0 1 0\n 0 0 1\n {samples}\nEND_DATAGRID_3D\nEND_BLOCK_DATAGRID_3D\n"
        );
        std::fs::write(dir.path().join(name), text).unwrap();
    }

    #[test]
    fn test_good_and_bad_files_are_isolated() {
        let dir = TempDir::new().unwrap();
        write_xsf(&dir, "wf_00001.xsf", "-4 -3 -2 -1 1 2 3 4");
        write_xsf(&dir, "wf_00002.xsf", "-4 -3 -2 -1 1 2 3");
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = process_folder(dir.path(), 90.0).unwrap();

        assert_eq!(result.parameters.len(), 2);
        match &result.parameters["wf_00001"] {
            FileResult::Isovalue { isovalue } => assert!((isovalue - 3.3).abs() < 1e-12),
            other => panic!("unexpected result: {other:?}"),
        }
        match &result.parameters["wf_00002"] {
            FileResult::Error { error } => {
                assert!(error.starts_with("Failed to process file wf_00002.xsf"));
                assert!(error.contains("mismatch in density data size"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(result.failed_keys(), vec!["wf_00002"]);

        let keys: Vec<&str> = result.mesh_data.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "wf_00001_negative_faces",
                "wf_00001_negative_vertices",
                "wf_00001_positive_faces",
                "wf_00001_positive_vertices",
            ]
        );
        assert_eq!(result.atoms.as_ref().map(|atoms| atoms[0].symbol.as_str()), Some("O"));
    }

    #[test]
    fn test_shared_stem_keeps_both_results() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("wf_00001.cube"), "not a cube file").unwrap();
        write_xsf(&dir, "wf_00001.xsf", "-4 -3 -2 -1 1 2 3 4");
        write_xsf(&dir, "wf_00002.xsf", "-4 -3 -2 -1 1 2 3 4");

        let result = process_folder(dir.path(), 90.0).unwrap();

        let keys: Vec<&str> = result.parameters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["wf_00001_cube", "wf_00001_xsf", "wf_00002"]);
        assert_eq!(result.failed_keys(), vec!["wf_00001_cube"]);
        assert!(matches!(result.parameters["wf_00001_xsf"], FileResult::Isovalue { .. }));
        assert!(result.mesh_data.contains_key("wf_00001_xsf_positive_faces"));
        assert!(result.mesh_data.contains_key("wf_00002_negative_vertices"));
    }

    #[test]
    fn test_to_outputs_shape() {
        let dir = TempDir::new().unwrap();
        write_xsf(&dir, "wf.xsf", "-4 -3 -2 -1 1 2 3 4");
        let outputs = process_folder(dir.path(), 90.0).unwrap().to_outputs().unwrap();

        assert_eq!(outputs["parameters"]["wf"]["isovalue"].as_f64().map(|v| (v * 10.0).round()), Some(33.0));
        assert!(outputs["mesh_data"]["wf_positive_vertices"].is_array());
        assert_eq!(outputs["atoms"][0]["symbol"], "O");
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = process_folder(&dir.path().join("absent"), 90.0).unwrap_err();
        assert!(err.to_string().starts_with("cannot list"));
    }
}
