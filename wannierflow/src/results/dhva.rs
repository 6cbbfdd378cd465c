//! Angular dependence of dHvA frequencies.
//!
//! Each band carries `phi`, `theta` and `freq` arrays. A band whose field
//! direction only varies in θ is plotted against θ, one that only varies in
//! φ against φ, and one that varies in both against the index of its
//! `(φ, θ)` pair in sorted order. Bands with a single direction are dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Abscissa of a frequency series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationAxis {
    /// Polar angle in degrees.
    Theta,
    /// Azimuthal angle in degrees.
    Phi,
    /// Index of the field direction.
    RotationStep,
}

impl RotationAxis {
    /// Axis title.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Theta => "\u{3b8}, degrees",
            Self::Phi => "\u{3c6}, degrees",
            Self::RotationStep => "Rotation step",
        }
    }
}

/// Frequencies of one band against its rotation axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencySeries {
    /// Band name.
    pub band: String,
    /// How `x` is measured.
    pub axis: RotationAxis,
    /// Abscissa values.
    pub x: Vec<f64>,
    /// Frequencies in kT.
    pub freq: Vec<f64>,
}

/// All classified bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DhvaFrequencies {
    /// Title of the shared x axis.
    pub x_label: String,
    /// One series per band with a varying field direction.
    pub series: Vec<FrequencySeries>,
}

fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// Chooses the rotation axis of a band, or `None` if the direction is fixed.
#[must_use]
pub fn classify(phi: &[f64], theta: &[f64]) -> Option<RotationAxis> {
    match (distinct_count(phi), distinct_count(theta)) {
        (phis, thetas) if phis <= 1 && thetas > 1 => Some(RotationAxis::Theta),
        (phis, thetas) if thetas <= 1 && phis > 1 => Some(RotationAxis::Phi),
        (phis, thetas) if phis > 1 && thetas > 1 => Some(RotationAxis::RotationStep),
        _ => None,
    }
}

fn lexicographic(a: &(f64, f64), b: &(f64, f64)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1))
}

/// Maps every `(φ, θ)` pair to its index among the sorted distinct pairs.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rotation_steps(phi: &[f64], theta: &[f64]) -> Vec<f64> {
    let pairs: Vec<(f64, f64)> = phi.iter().copied().zip(theta.iter().copied()).collect();
    let mut unique = pairs.clone();
    unique.sort_by(lexicographic);
    unique.dedup_by(|a, b| lexicographic(a, b) == Ordering::Equal);

    pairs
        .iter()
        .map(|pair| unique.binary_search_by(|probe| lexicographic(probe, pair)).unwrap_or(0) as f64)
        .collect()
}

fn array(band: &Value, key: &str) -> Vec<f64> {
    band.get(key)
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

/// Builds one series, or `None` if the band has a fixed direction.
#[must_use]
pub fn frequency_series(band: &str, arrays: &Value) -> Option<FrequencySeries> {
    let (phi, theta, freq) = (array(arrays, "phi"), array(arrays, "theta"), array(arrays, "freq"));
    let axis = classify(&phi, &theta)?;
    let x = match axis {
        RotationAxis::Theta => theta,
        RotationAxis::Phi => phi,
        RotationAxis::RotationStep => rotation_steps(&phi, &theta),
    };
    let len = x.len().min(freq.len());
    Some(FrequencySeries {
        band: band.to_string(),
        axis,
        x: x[..len].to_vec(),
        freq: freq[..len].to_vec(),
    })
}

impl DhvaFrequencies {
    /// Classifies every band of a `{band: {phi, theta, freq}}` object.
    ///
    /// The shared axis title follows the last band swept in a single angle.
    #[must_use]
    pub fn from_value(frequencies: &Value) -> Self {
        let series: Vec<FrequencySeries> = frequencies
            .as_object()
            .into_iter()
            .flatten()
            .filter_map(|(band, arrays)| frequency_series(band, arrays))
            .collect();
        let x_axis = series
            .iter()
            .rev()
            .map(|series| series.axis)
            .find(|axis| *axis != RotationAxis::RotationStep)
            .unwrap_or(RotationAxis::RotationStep);
        Self {
            x_label: x_axis.label().to_string(),
            series,
        }
    }

    /// Returns true if no band varied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_classification() {
        assert_eq!(classify(&[0.0, 0.0], &[0.0, 45.0]), Some(RotationAxis::Theta));
        assert_eq!(classify(&[0.0, 30.0], &[10.0, 10.0]), Some(RotationAxis::Phi));
        assert_eq!(classify(&[0.0, 30.0], &[0.0, 60.0]), Some(RotationAxis::RotationStep));
        assert_eq!(classify(&[5.0, 5.0], &[7.0, 7.0]), None);
        assert_eq!(classify(&[], &[]), None);
    }

    #[test]
    fn test_rotation_steps_index_sorted_pairs() {
        let steps = rotation_steps(&[30.0, 0.0, 30.0, 0.0], &[60.0, 0.0, 0.0, 0.0]);
        assert_eq!(steps, vec![2.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_from_skeaf_outputs() {
        let outputs = fixtures::skeaf_outputs();
        let plot = DhvaFrequencies::from_value(&outputs["frequencies"]);

        assert_eq!(plot.series.len(), 2);
        assert_eq!(plot.series[0].band, "band_5");
        assert_eq!(plot.series[0].axis, RotationAxis::Theta);
        assert_eq!(plot.series[0].x, vec![0.0, 45.0, 90.0]);
        assert_eq!(plot.series[1].axis, RotationAxis::RotationStep);
        assert_eq!(plot.series[1].x, vec![0.0, 1.0, 2.0]);
        assert_eq!(plot.x_label, "\u{3b8}, degrees");
    }

    #[test]
    fn test_fixed_direction_dropped() {
        let plot = DhvaFrequencies::from_value(&json!({
            "band_1": {"phi": [0.0, 0.0], "theta": [0.0, 0.0], "freq": [1.0, 1.0]},
        }));
        assert!(plot.is_empty());
        assert_eq!(plot.x_label, "Rotation step");
    }
}
