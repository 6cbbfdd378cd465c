//! Output paths read from upstream processes.

/// Remote folder of the DFT SCF calculation.
pub const PW_SCF_REMOTE_FOLDER: &str = "scf.remote_folder";
/// Structure the SCF calculation ran on.
pub const PW_SCF_STRUCTURE: &str = "scf.structure";
/// Reference band structure.
pub const PW_BAND_STRUCTURE: &str = "band_structure";
/// k-points of the reference band structure.
pub const PW_BANDS_KPOINTS: &str = "bands.kpoints";

/// Namespace of the Wannier90 calculation with plotting enabled.
pub const W90_PLOT: &str = "wannier90_plot";
/// Namespace of the optimal Wannier90 calculation.
pub const W90_OPTIMAL: &str = "wannier90_optimal";
/// Remote folder under a Wannier90 calculation namespace.
pub const REMOTE_FOLDER: &str = "remote_folder";
/// Input structure under a Wannier90 calculation namespace.
pub const STRUCTURE: &str = "structure";
/// Excluded band indices under a Wannier90 calculation namespace.
pub const EXCLUDE_BANDS: &str = "parameters.exclude_bands";

/// Ports exposed by the isosurface job.
pub const ISOSURFACE_PORTS: [&str; 3] = ["atoms", "parameters", "mesh_data"];

/// Joins a calculation namespace and a relative path.
#[must_use]
pub fn under(namespace: &str, path: &str) -> String {
    format!("{namespace}.{path}")
}
