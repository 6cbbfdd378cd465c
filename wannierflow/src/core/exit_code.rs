//! Declared exit codes of the bands orchestration.

use serde::Serialize;
use std::fmt;

/// A declared, terminal exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExitCode {
    /// Numeric exit status.
    pub status: u32,
    /// Machine-readable label.
    pub label: &'static str,
    /// Human-readable message.
    pub message: &'static str,
}

impl ExitCode {
    /// The DFT bands sub-workflow failed.
    pub const PW_BANDS_FAILED: Self = Self {
        status: 400,
        label: "ERROR_PW_BANDS_WORKCHAIN_FAILED",
        message: "The pw bands workchain failed.",
    };

    /// The Wannierization sub-workflow failed.
    pub const WANNIER90_BANDS_FAILED: Self = Self {
        status: 401,
        label: "ERROR_WANNIER90_BANDS_WORKCHAIN_FAILED",
        message: "The wannier90 bands workchain failed.",
    };

    /// The isosurface job failed.
    pub const GENERATE_ISOSURFACE_FAILED: Self = Self {
        status: 402,
        label: "ERROR_GENERATE_ISOSURFACE_FAILED",
        message: "The isosurface generation job failed.",
    };

    /// The SKEAF sub-workflow failed.
    pub const SKEAF_FAILED: Self = Self {
        status: 403,
        label: "ERROR_SKEAF_WORKCHAIN_FAILED",
        message: "The SKEAF workchain failed.",
    };

    /// All declared exit codes, ordered by status.
    pub const ALL: [Self; 4] = [
        Self::PW_BANDS_FAILED,
        Self::WANNIER90_BANDS_FAILED,
        Self::GENERATE_ISOSURFACE_FAILED,
        Self::SKEAF_FAILED,
    ];

    /// Looks up a declared exit code by label.
    #[must_use]
    pub fn by_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.label == label)
    }

    /// Looks up a declared exit code by status.
    #[must_use]
    pub fn by_status(status: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.status == status)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.label)
    }
}
