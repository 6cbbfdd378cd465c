//! Percentile thresholds and isosurface extraction.
//!
//! Surfaces are extracted with marching tetrahedra: every cell is split into
//! six tetrahedra around its main diagonal, which needs no ambiguity tables
//! and yields a watertight mesh. Vertices on shared edges are deduplicated
//! and every triangle is wound so its normal points from the region above
//! the level to the region below it.

use super::grid::VolumetricGrid;
use crate::errors::IsosurfaceError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Corner offsets of a cell.
const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// Six tetrahedra sharing the 0-6 diagonal.
const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 5, 1, 6],
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
];

/// A triangle mesh in Cartesian coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<[f64; 3]>,
    /// Vertex indices of each triangle.
    pub faces: Vec<[usize; 3]>,
}

impl Mesh {
    /// Returns true if the mesh has no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Returns the vertex coordinates as one flat array.
    #[must_use]
    pub fn flat_vertices(&self) -> Vec<f64> {
        self.vertices.iter().flatten().copied().collect()
    }

    /// Returns the face indices as one flat array.
    #[must_use]
    pub fn flat_faces(&self) -> Vec<usize> {
        self.faces.iter().flatten().copied().collect()
    }
}

/// Positive and negative isosurfaces at `±isovalue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsosurfacePair {
    /// The absolute threshold.
    pub isovalue: f64,
    /// Surface at `+isovalue`.
    pub positive: Mesh,
    /// Surface at `-isovalue`.
    pub negative: Mesh,
}

/// Computes a percentile with linear interpolation between closest ranks.
///
/// # Errors
///
/// Returns `InvalidPercentile` for empty input or a percentile outside
/// `[0, 100]`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentile(values: &[f64], percentile: f64) -> Result<f64, IsosurfaceError> {
    if values.is_empty() || !(0.0..=100.0).contains(&percentile) {
        return Err(IsosurfaceError::InvalidPercentile {
            percentile,
            len: values.len(),
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = percentile / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Returns the absolute value of the given percentile of the grid samples.
///
/// # Errors
///
/// See [`percentile`].
pub fn find_isovalue(grid: &VolumetricGrid, at: f64) -> Result<f64, IsosurfaceError> {
    percentile(grid.data(), at).map(f64::abs)
}

/// Extracts the surface where the field crosses `level`.
///
/// With `step_size > 1` only every `step_size`-th sample along each axis is
/// used.
///
/// # Errors
///
/// Returns `LevelOutOfRange` if `level` is outside the data range,
/// `GridTooSmall` if fewer than two samples remain along an axis, and
/// `InvalidStepSize` for a zero step.
pub fn extract_isosurface(grid: &VolumetricGrid, level: f64, step_size: usize) -> Result<Mesh, IsosurfaceError> {
    if step_size == 0 {
        return Err(IsosurfaceError::InvalidStepSize);
    }
    let (min, max) = grid.range();
    if !(min..=max).contains(&level) {
        return Err(IsosurfaceError::LevelOutOfRange { level, min, max });
    }

    let shape = grid.shape();
    let samples: [Vec<usize>; 3] = std::array::from_fn(|axis| (0..shape[axis]).step_by(step_size).collect());
    if samples.iter().any(|axis| axis.len() < 2) {
        return Err(IsosurfaceError::GridTooSmall { shape });
    }

    let mut builder = MeshBuilder::new(grid, level);
    for cell_i in samples[0].windows(2) {
        for cell_j in samples[1].windows(2) {
            for cell_k in samples[2].windows(2) {
                let corners = CORNERS.map(|[di, dj, dk]| [cell_i[di], cell_j[dj], cell_k[dk]]);
                for tetrahedron in TETRAHEDRA {
                    builder.polygonise(tetrahedron.map(|corner| corners[corner]));
                }
            }
        }
    }
    Ok(builder.finish())
}

/// Extracts the surfaces at `±find_isovalue(grid, at)`.
///
/// # Errors
///
/// Fails if the percentile is invalid or either level cannot be contoured.
pub fn symmetric_isosurfaces(grid: &VolumetricGrid, at: f64) -> Result<IsosurfacePair, IsosurfaceError> {
    let isovalue = find_isovalue(grid, at)?;
    Ok(IsosurfacePair {
        isovalue,
        positive: extract_isosurface(grid, isovalue, 1)?,
        negative: extract_isosurface(grid, -isovalue, 1)?,
    })
}

type Point = [usize; 3];

struct MeshBuilder<'a> {
    grid: &'a VolumetricGrid,
    level: f64,
    edges: HashMap<(usize, usize), usize>,
    // Index-space positions, mapped to Cartesian in `finish`.
    vertices: Vec<[f64; 3]>,
    faces: Vec<[usize; 3]>,
}

impl<'a> MeshBuilder<'a> {
    fn new(grid: &'a VolumetricGrid, level: f64) -> Self {
        Self {
            grid,
            level,
            edges: HashMap::new(),
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    fn value(&self, point: Point) -> f64 {
        self.grid.value(point[0], point[1], point[2])
    }

    fn polygonise(&mut self, tetrahedron: [Point; 4]) {
        let (inside, outside): (Vec<Point>, Vec<Point>) =
            tetrahedron.iter().partition(|&&point| self.value(point) > self.level);

        match (inside.as_slice(), outside.as_slice()) {
            ([a], [b, c, d]) | ([b, c, d], [a]) => {
                let ab = self.edge_vertex(*a, *b);
                let ac = self.edge_vertex(*a, *c);
                let ad = self.edge_vertex(*a, *d);
                self.push_face([ab, ac, ad], &inside, &outside);
            }
            ([a, b], [c, d]) => {
                let ac = self.edge_vertex(*a, *c);
                let ad = self.edge_vertex(*a, *d);
                let bd = self.edge_vertex(*b, *d);
                let bc = self.edge_vertex(*b, *c);
                self.push_face([ac, ad, bd], &inside, &outside);
                self.push_face([ac, bd, bc], &inside, &outside);
            }
            _ => {}
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn edge_vertex(&mut self, from: Point, to: Point) -> usize {
        let (a, b) = (self.grid.index(from[0], from[1], from[2]), self.grid.index(to[0], to[1], to[2]));
        let key = (a.min(b), a.max(b));
        if let Some(&index) = self.edges.get(&key) {
            return index;
        }

        let (v0, v1) = (self.value(from), self.value(to));
        let t = if (v1 - v0).abs() > f64::EPSILON {
            ((self.level - v0) / (v1 - v0)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        let position = std::array::from_fn(|axis| {
            let (p0, p1) = (from[axis] as f64, to[axis] as f64);
            p0 + t * (p1 - p0)
        });

        let index = self.vertices.len();
        self.vertices.push(position);
        self.edges.insert(key, index);
        index
    }

    fn push_face(&mut self, face: [usize; 3], inside: &[Point], outside: &[Point]) {
        let [a, b, c] = face.map(|index| self.vertices[index]);
        let normal = cross(sub(b, a), sub(c, a));
        let direction = sub(centroid(outside), centroid(inside));
        if dot(normal, direction) < 0.0 {
            self.faces.push([face[0], face[2], face[1]]);
        } else {
            self.faces.push(face);
        }
    }

    fn finish(self) -> Mesh {
        let grid = self.grid;
        Mesh {
            vertices: self.vertices.into_iter().map(|point| grid.to_cartesian(point)).collect(),
            faces: self.faces,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn centroid(points: &[Point]) -> [f64; 3] {
    let count = points.len() as f64;
    std::array::from_fn(|axis| points.iter().map(|point| point[axis] as f64).sum::<f64>() / count)
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
