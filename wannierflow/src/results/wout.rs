//! Convergence history from a Wannier90 `.wout` file.
//!
//! Disentanglement iterations end with `<-- DIS` and carry Ω_I in their
//! third column. Spread iterations end with `<-- SPRD` and carry the total
//! spread after `O_TOT=`.

use crate::errors::FileParseError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static DIS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\S+\s+\S+\s+(\S+).*\s{2}<-- DIS").expect("valid DIS pattern"));

static SPRD_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"O_TOT=\s*(\S+)\s*<-- SPRD").expect("valid SPRD pattern"));

/// Name of the main output file in the retrieved folder.
pub const WOUT_FILE: &str = "aiida.wout";

/// Spread values per iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceHistory {
    /// Ω_I per disentanglement iteration (Å²).
    pub omega_i: Vec<f64>,
    /// Ω_tot per spread-minimisation iteration (Å²).
    pub omega_tot: Vec<f64>,
}

fn number(token: &str, line: usize) -> Result<f64, FileParseError> {
    token
        .parse()
        .map_err(|_| FileParseError::new(format!("invalid spread '{token}'")).in_file(WOUT_FILE).at_line(line))
}

/// Parses the Ω_I and Ω_tot histories.
///
/// # Errors
///
/// Returns `FileParseError` if a marked line carries a non-numeric value.
pub fn parse_wout(text: &str) -> Result<ConvergenceHistory, FileParseError> {
    let mut history = ConvergenceHistory::default();
    for (index, line) in text.lines().enumerate() {
        if let Some(captures) = DIS_LINE.captures(line) {
            history.omega_i.push(number(&captures[1], index + 1)?);
        }
        if let Some(captures) = SPRD_LINE.captures(line) {
            history.omega_tot.push(number(&captures[1], index + 1)?);
        }
    }
    Ok(history)
}
