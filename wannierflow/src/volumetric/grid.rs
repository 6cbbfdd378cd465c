//! Volumetric grids and the atoms that come with them.

use serde::{Deserialize, Serialize};

/// Chemical symbols indexed by atomic number minus one.
const ELEMENT_SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K",
    "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb",
    "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn", "Sb", "Te", "I", "Xe", "Cs",
    "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta",
    "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa",
    "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt",
    "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Returns the chemical symbol of an atomic number.
#[must_use]
pub fn element_symbol(atomic_number: usize) -> Option<&'static str> {
    atomic_number
        .checked_sub(1)
        .and_then(|index| ELEMENT_SYMBOLS.get(index))
        .copied()
}

/// An atom in Cartesian coordinates (Å).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// Chemical symbol.
    pub symbol: String,
    /// Cartesian position.
    pub position: [f64; 3],
}

impl Atom {
    /// Creates an atom from a symbol or an atomic number token.
    #[must_use]
    pub fn from_token(token: &str, position: [f64; 3]) -> Self {
        let symbol = token
            .parse::<usize>()
            .ok()
            .and_then(element_symbol)
            .map_or_else(|| token.to_string(), str::to_string);
        Self { symbol, position }
    }
}

/// How grid indices map onto the spanning vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSpan {
    /// The last point sits on the far face (general grids, n - 1 intervals).
    Inclusive,
    /// The last point sits one voxel short of the far face (n intervals).
    Exclusive,
}

/// A scalar field sampled on a regular grid.
///
/// Samples are stored with the last axis fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumetricGrid {
    shape: [usize; 3],
    origin: [f64; 3],
    span: [[f64; 3]; 3],
    kind: GridSpan,
    data: Vec<f64>,
}

impl VolumetricGrid {
    /// Creates a grid; `data.len()` must equal the product of `shape`.
    #[must_use]
    pub fn new(shape: [usize; 3], origin: [f64; 3], span: [[f64; 3]; 3], kind: GridSpan, data: Vec<f64>) -> Option<Self> {
        (sample_count(shape) == Some(data.len())).then_some(Self {
            shape,
            origin,
            span,
            kind,
            data,
        })
    }

    /// Returns the number of points along each axis.
    #[must_use]
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Returns the Cartesian origin.
    #[must_use]
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// Returns the spanning vectors.
    #[must_use]
    pub fn span(&self) -> [[f64; 3]; 3] {
        self.span
    }

    /// Returns the samples.
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Returns the linear index of a grid point.
    #[must_use]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.shape[1] + j) * self.shape[2] + k
    }

    /// Returns the sample at a grid point.
    #[must_use]
    pub fn value(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[self.index(i, j, k)]
    }

    /// Returns the smallest and largest sample.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Maps fractional grid coordinates (in index units) to Cartesian.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_cartesian(&self, point: [f64; 3]) -> [f64; 3] {
        let mut out = self.origin;
        for axis in 0..3 {
            let divisions = match self.kind {
                GridSpan::Inclusive => self.shape[axis].saturating_sub(1).max(1),
                GridSpan::Exclusive => self.shape[axis].max(1),
            } as f64;
            let fraction = point[axis] / divisions;
            for (component, value) in out.iter_mut().enumerate() {
                *value += fraction * self.span[axis][component];
            }
        }
        out
    }
}

/// Number of samples a grid of `shape` holds, or `None` on overflow.
#[must_use]
pub fn sample_count(shape: [usize; 3]) -> Option<usize> {
    shape.iter().try_fold(1usize, |total, &n| total.checked_mul(n))
}

/// A parsed volumetric file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumetricData {
    /// Atoms, possibly empty.
    pub atoms: Vec<Atom>,
    /// The scalar field.
    pub grid: VolumetricGrid,
}
