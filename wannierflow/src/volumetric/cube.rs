//! Gaussian cube files.
//!
//! Lengths are in Bohr unless the first voxel count is negative, in which
//! case the header is already in Å. A negative atom count announces a
//! `DSET_IDS` line after the atoms. Samples run with the last axis fastest,
//! which is the in-memory layout, and the grid covers `n` voxels per axis.

use super::grid::{sample_count, Atom, GridSpan, VolumetricData, VolumetricGrid};
use super::BOHR_TO_ANGSTROM;
use crate::errors::FileParseError;

struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().enumerate(),
        }
    }

    fn next_line(&mut self, what: &str) -> Result<(usize, &'a str), FileParseError> {
        self.inner
            .next()
            .map(|(index, line)| (index + 1, line))
            .ok_or_else(|| FileParseError::new(format!("unexpected end of file, expected {what}")))
    }

    fn numbers(&mut self, what: &str, count: usize) -> Result<(usize, Vec<f64>), FileParseError> {
        let (number, line) = self.next_line(what)?;
        let values = line
            .split_whitespace()
            .take(count)
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| FileParseError::new(format!("invalid {what}: '{}'", line.trim())).at_line(number))?;
        if values.len() < count {
            return Err(FileParseError::new(format!("expected {count} values for {what}")).at_line(number));
        }
        Ok((number, values))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn as_count(value: f64, number: usize, what: &str) -> Result<i64, FileParseError> {
    if value.fract() != 0.0 {
        return Err(FileParseError::new(format!("{what} must be an integer, found {value}")).at_line(number));
    }
    Ok(value as i64)
}

fn scaled(values: &[f64], factor: f64) -> [f64; 3] {
    [values[0] * factor, values[1] * factor, values[2] * factor]
}

/// Parses the text of a cube file.
///
/// # Errors
///
/// Returns `FileParseError` for a truncated or malformed header, or when the
/// number of samples differs from the declared shape.
pub fn parse_cube(text: &str) -> Result<VolumetricData, FileParseError> {
    let mut lines = Lines::new(text);
    lines.next_line("title line")?;
    lines.next_line("comment line")?;

    let (number, header) = lines.numbers("atom count and origin", 4)?;
    let natoms = as_count(header[0], number, "atom count")?;
    let has_dset_ids = natoms < 0;
    let natoms = natoms.unsigned_abs();

    let mut shape = [0usize; 3];
    let mut voxels = [[0.0; 3]; 3];
    let mut factor = BOHR_TO_ANGSTROM;
    for axis in 0..3 {
        let (number, row) = lines.numbers("voxel count and vector", 4)?;
        let count = as_count(row[0], number, "voxel count")?;
        if axis == 0 && count < 0 {
            factor = 1.0;
        }
        shape[axis] = usize::try_from(count.unsigned_abs())
            .map_err(|_| FileParseError::new("voxel count too large").at_line(number))?;
        voxels[axis] = [row[1], row[2], row[3]];
    }

    let origin = scaled(&header[1..4], factor);

    let mut atoms = Vec::new();
    for _ in 0..natoms {
        let (number, row) = lines.numbers("atom line", 5)?;
        let z = as_count(row[0], number, "atomic number")?;
        let position = scaled(&row[2..5], factor);
        atoms.push(Atom::from_token(&z.to_string(), position));
    }
    if has_dset_ids {
        lines.next_line("DSET_IDS line")?;
    }

    let expected = sample_count(shape)
        .ok_or_else(|| FileParseError::new(format!("voxel counts {shape:?} are too large")))?;
    let mut data = Vec::new();
    for (index, line) in lines.inner {
        for token in line.split_whitespace() {
            let value = token
                .parse::<f64>()
                .map_err(|_| FileParseError::new(format!("invalid density value '{token}'")).at_line(index + 1))?;
            data.push(value);
        }
    }
    if data.len() != expected {
        return Err(FileParseError::size_mismatch(expected, data.len()));
    }

    #[allow(clippy::cast_precision_loss)]
    let span = std::array::from_fn(|axis| {
        let cells = shape[axis] as f64 * factor;
        [voxels[axis][0] * cells, voxels[axis][1] * cells, voxels[axis][2] * cells]
    });

    let grid = VolumetricGrid::new(shape, origin, span, GridSpan::Exclusive, data)
        .ok_or_else(|| FileParseError::size_mismatch(expected, 0))?;
    Ok(VolumetricData { atoms, grid })
}
