//! Integer electron count for the Fermi-surface step.
//!
//! Bands excluded from the Wannierization are doubly occupied and must be
//! subtracted from the pseudopotential valence count.

use crate::errors::NonIntegerElectronCountError;
use tracing::debug;

/// Maximum distance from the nearest integer accepted as integral.
pub const ELECTRON_COUNT_TOLERANCE: f64 = 1e-5;

/// Derives the integer number of electrons left after band exclusion.
///
/// # Errors
///
/// Returns `NonIntegerElectronCountError` when the result is negative or not
/// within [`ELECTRON_COUNT_TOLERANCE`] of an integer.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn derive_num_electrons(
    pseudo_electrons: f64,
    num_excluded_bands: usize,
) -> Result<u32, NonIntegerElectronCountError> {
    let remaining = pseudo_electrons - 2.0 * num_excluded_bands as f64;
    let nearest = remaining.round();

    if !remaining.is_finite()
        || remaining < -ELECTRON_COUNT_TOLERANCE
        || (remaining - nearest).abs() > ELECTRON_COUNT_TOLERANCE
    {
        return Err(NonIntegerElectronCountError::new(
            remaining,
            ELECTRON_COUNT_TOLERANCE,
        ));
    }

    debug!(
        pseudo_electrons,
        num_excluded_bands,
        num_electrons = nearest,
        "Derived electron count"
    );
    Ok(nearest.max(0.0) as u32)
}
