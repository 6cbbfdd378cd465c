//! Volumetric data: XSF and cube parsing, percentile thresholds and
//! isosurface meshes.

mod cube;
mod folder;
mod grid;
mod isosurface;
mod runner;
mod xsf;

pub use cube::parse_cube;
pub use folder::{process_folder, FileResult, FolderIsosurfaces, MeshArray, VOLUMETRIC_EXTENSIONS};
pub use grid::{element_symbol, Atom, GridSpan, VolumetricData, VolumetricGrid};
pub use isosurface::{extract_isosurface, find_isovalue, percentile, symmetric_isosurfaces, IsosurfacePair, Mesh};
pub use runner::IsosurfaceRunner;
pub use xsf::parse_xsf;

use crate::errors::{FileParseError, WannierflowError};
use std::path::Path;

/// Percentile used for the `±` isovalue when none is given.
pub const DEFAULT_PERCENTILE: f64 = 90.0;

/// Name of the function run by the isosurface job.
pub const ISOSURFACE_FUNCTION: &str = "process_volumetric_folder";

/// Bohr radius in Å.
pub const BOHR_TO_ANGSTROM: f64 = 0.529_177_210_903;

/// Reads and parses a volumetric file, choosing the format by extension.
///
/// # Errors
///
/// Returns an IO error if the file cannot be read, and `FileParseError` for
/// an unknown extension or malformed content.
pub fn parse_file(path: &Path) -> Result<VolumetricData, WannierflowError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parse: fn(&str) -> Result<VolumetricData, FileParseError> =
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("xsf") => parse_xsf,
            Some("cube") => parse_cube,
            _ => return Err(FileParseError::new("unsupported volumetric format").in_file(name).into()),
        };

    let text = std::fs::read_to_string(path)?;
    parse(&text).map_err(|err| err.in_file(name).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_file_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("density.dat");
        std::fs::write(&path, "").unwrap();
        let err = parse_file(&path).unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse density.dat: unsupported volumetric format");
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wf.xsf");
        std::fs::write(&path, "CRYSTAL\n").unwrap();
        let err = parse_file(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse wf.xsf:"));
    }
}
