//! XCrySDen XSF files with a 3D data grid.
//!
//! Only the first `BEGIN_DATAGRID_3D` block is read. Its samples are listed
//! with the first axis fastest and are reordered into [`VolumetricGrid`]'s
//! layout. General grids include both end points, so the spanning vectors
//! are divided into `n - 1` intervals.

use super::grid::{sample_count, Atom, GridSpan, VolumetricData, VolumetricGrid};
use crate::errors::FileParseError;

/// A non-empty, non-comment line with its 1-based number.
type Line<'a> = (usize, &'a str);

fn content_lines(text: &str) -> Vec<Line<'_>> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

fn parse_numbers<T: std::str::FromStr>(line: Line<'_>, count: usize, what: &str) -> Result<Vec<T>, FileParseError> {
    let (number, text) = line;
    let values: Vec<T> = text
        .split_whitespace()
        .take(count)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| FileParseError::new(format!("invalid {what}: '{text}'")).at_line(number))?;
    if values.len() < count {
        return Err(FileParseError::new(format!("expected {count} values for {what}, found {}", values.len())).at_line(number));
    }
    Ok(values)
}

fn vector(line: Line<'_>, what: &str) -> Result<[f64; 3], FileParseError> {
    let values = parse_numbers::<f64>(line, 3, what)?;
    Ok([values[0], values[1], values[2]])
}

fn parse_atoms(lines: &[Line<'_>]) -> Result<Vec<Atom>, FileParseError> {
    if let Some(start) = lines.iter().position(|(_, line)| line.starts_with("PRIMCOORD")) {
        let header = lines
            .get(start + 1)
            .copied()
            .ok_or_else(|| FileParseError::new("PRIMCOORD without atom count"))?;
        let count = parse_numbers::<usize>(header, 1, "atom count")?[0];
        return (0..count)
            .map(|offset| {
                let line = lines
                    .get(start + 2 + offset)
                    .copied()
                    .ok_or_else(|| FileParseError::new(format!("expected {count} atoms in PRIMCOORD")))?;
                atom_line(line)
            })
            .collect();
    }

    if let Some(start) = lines.iter().position(|(_, line)| *line == "ATOMS") {
        return lines[start + 1..]
            .iter()
            .take_while(|(_, line)| looks_like_atom(line))
            .map(|line| atom_line(*line))
            .collect();
    }

    Ok(Vec::new())
}

fn looks_like_atom(line: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens.len() >= 4 && tokens[1..4].iter().all(|token| token.parse::<f64>().is_ok())
}

fn atom_line(line: Line<'_>) -> Result<Atom, FileParseError> {
    let (number, text) = line;
    let mut tokens = text.split_whitespace();
    let species = tokens
        .next()
        .ok_or_else(|| FileParseError::new("empty atom line").at_line(number))?;
    let rest: Vec<&str> = tokens.collect();
    let position = vector((number, &rest.join(" ")), "atom position")?;
    Ok(Atom::from_token(species, position))
}

/// Parses the text of an XSF file.
///
/// # Errors
///
/// Returns `FileParseError` when the grid marker is missing, a header line
/// is malformed, or the number of samples differs from the declared shape.
pub fn parse_xsf(text: &str) -> Result<VolumetricData, FileParseError> {
    let lines = content_lines(text);

    let marker = lines
        .iter()
        .position(|(_, line)| line.starts_with("BEGIN_DATAGRID_3D") || line.starts_with("DATAGRID_3D"))
        .ok_or_else(|| FileParseError::new("missing BEGIN_DATAGRID_3D marker"))?;

    let header = |offset: usize| {
        lines
            .get(marker + offset)
            .copied()
            .ok_or_else(|| FileParseError::new("truncated BEGIN_DATAGRID_3D header"))
    };

    let dims_line = header(1)?;
    let dims = parse_numbers::<usize>(dims_line, 3, "grid dimensions")?;
    let shape = [dims[0], dims[1], dims[2]];
    let origin = vector(header(2)?, "grid origin")?;
    let span = [
        vector(header(3)?, "first spanning vector")?,
        vector(header(4)?, "second spanning vector")?,
        vector(header(5)?, "third spanning vector")?,
    ];

    let expected = sample_count(shape)
        .ok_or_else(|| FileParseError::new(format!("grid dimensions {shape:?} are too large")).at_line(dims_line.0))?;

    let mut samples = Vec::new();
    for &(number, line) in lines.iter().skip(marker + 6) {
        if line.starts_with("END_DATAGRID_3D") {
            break;
        }
        for token in line.split_whitespace() {
            let value = token
                .parse::<f64>()
                .map_err(|_| FileParseError::new(format!("invalid density value '{token}'")).at_line(number))?;
            samples.push(value);
        }
    }

    if samples.len() != expected {
        return Err(FileParseError::size_mismatch(expected, samples.len()));
    }

    // First axis fastest in the file, last axis fastest in memory.
    let mut data = vec![0.0; expected];
    for (position, value) in samples.into_iter().enumerate() {
        let i = position % shape[0];
        let j = (position / shape[0]) % shape[1];
        let k = position / (shape[0] * shape[1]);
        data[(i * shape[1] + j) * shape[2] + k] = value;
    }

    let grid = VolumetricGrid::new(shape, origin, span, GridSpan::Inclusive, data)
        .ok_or_else(|| FileParseError::size_mismatch(expected, 0))?;

    Ok(VolumetricData {
        atoms: parse_atoms(&lines)?,
        grid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn xsf(samples: &str) -> String {
        format!(
            "CRYSTAL\nPRIMVEC\n 2.0 0.0 0.0\n 0.0 2.0 0.0\n 0.0 0.0 2.0\nPRIMCOORD\n 2 1\n 14 0.0 0.0 0.0\n Si 1.0 1.0 1.0\n\
             BEGIN_BLOCK_DATAGRID_3D\n wannier\n BEGIN_DATAGRID_3D_UNKNOWN\n 2 2 2\n 0.0 0.0 0.0\n\
             2.0 0.0 0.0\n 0.0 2.0 0.0\n 0.0 0.0 2.0\n {samples}\n END_DATAGRID_3D\nEND_BLOCK_DATAGRID_3D\n"
        )
    }

    #[test]
    fn test_eight_samples_parse() {
        let data = parse_xsf(&xsf("1 2 3 4\n 5 6 7 8")).unwrap();
        assert_eq!(data.grid.shape(), [2, 2, 2]);
        assert_eq!(data.atoms.len(), 2);
        assert_eq!(data.atoms[0].symbol, "Si");
        assert_eq!(data.atoms[1].position, [1.0, 1.0, 1.0]);
        // file order: x fastest
        assert_eq!(data.grid.value(1, 0, 0), 2.0);
        assert_eq!(data.grid.value(0, 1, 0), 3.0);
        assert_eq!(data.grid.value(0, 0, 1), 5.0);
        assert_eq!(data.grid.value(1, 1, 1), 8.0);
    }

    #[test]
    fn test_seven_samples_fail() {
        let err = parse_xsf(&xsf("1 2 3 4\n 5 6 7")).unwrap_err();
        assert!(err.message.contains("mismatch in density data size"));
        assert_eq!(err, FileParseError::size_mismatch(8, 7));
    }

    #[test]
    fn test_missing_marker() {
        let err = parse_xsf("CRYSTAL\nPRIMVEC\n1 0 0\n").unwrap_err();
        assert!(err.message.contains("BEGIN_DATAGRID_3D"));
    }

    #[test]
    fn test_bad_sample_reports_line() {
        let err = parse_xsf(&xsf("1 2 3 4\n 5 6 x 8")).unwrap_err();
        assert!(err.message.contains("'x'"));
        assert!(err.line.is_some());
    }

    #[test]
    fn test_general_grid_spans_inclusive() {
        let data = parse_xsf(&xsf("1 2 3 4 5 6 7 8")).unwrap();
        assert_eq!(data.grid.to_cartesian([1.0, 1.0, 1.0]), [2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        let text = xsf("1 2 3 4 5 6 7 8").replace(" 2 2 2\n", " 4294967296 4294967296 4294967296\n");
        let err = parse_xsf(&text).unwrap_err();
        assert!(err.message.contains("too large") || err.message.contains("invalid grid dimensions"));

        let text = xsf("1 2 3 4 5 6 7 8").replace(" 2 2 2\n", " 100000 100000 100000\n");
        let err = parse_xsf(&text).unwrap_err();
        assert!(err.message.contains("mismatch in density data size"));
    }
}
