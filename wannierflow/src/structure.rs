//! Atomic structure records and pseudopotential tables.

use crate::core::Outputs;
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One atomic site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Kind name (e.g., "Fe1"); pseudopotentials are keyed by it.
    pub kind_name: String,
    /// Chemical symbol.
    pub symbol: String,
    /// Cartesian position in Å.
    pub position: [f64; 3],
}

/// Periodic atomic structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    /// Lattice vectors as rows, in Å.
    pub cell: [[f64; 3]; 3],
    /// Periodic boundary conditions.
    #[serde(default = "default_pbc")]
    pub pbc: [bool; 3],
    /// Atomic sites.
    #[serde(default)]
    pub sites: Vec<Site>,
}

fn default_pbc() -> [bool; 3] {
    [true, true, true]
}

impl Structure {
    /// Creates an empty structure with the given cell.
    #[must_use]
    pub fn new(cell: [[f64; 3]; 3]) -> Self {
        Self {
            cell,
            pbc: default_pbc(),
            sites: Vec::new(),
        }
    }

    /// Appends a site whose kind name equals its symbol.
    #[must_use]
    pub fn with_atom(self, symbol: impl Into<String>, position: [f64; 3]) -> Self {
        let symbol = symbol.into();
        self.with_site(symbol.clone(), symbol, position)
    }

    /// Appends a site with an explicit kind name.
    #[must_use]
    pub fn with_site(
        mut self,
        kind_name: impl Into<String>,
        symbol: impl Into<String>,
        position: [f64; 3],
    ) -> Self {
        self.sites.push(Site {
            kind_name: kind_name.into(),
            symbol: symbol.into(),
            position,
        });
        self
    }

    /// Returns the distinct kind names in order of first appearance.
    #[must_use]
    pub fn kind_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for site in &self.sites {
            if !names.contains(&site.kind_name.as_str()) {
                names.push(&site.kind_name);
            }
        }
        names
    }

    /// Returns the chemical formula in Hill-like order of appearance.
    #[must_use]
    pub fn formula(&self) -> String {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for site in &self.sites {
            match counts.iter_mut().find(|(symbol, _)| *symbol == site.symbol) {
                Some((_, count)) => *count += 1,
                None => counts.push((&site.symbol, 1)),
            }
        }
        counts
            .into_iter()
            .map(|(symbol, count)| {
                if count == 1 {
                    symbol.to_string()
                } else {
                    format!("{symbol}{count}")
                }
            })
            .collect()
    }

    /// Returns the cell volume in Å³.
    #[must_use]
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.cell;
        let cross = [
            b[1] * c[2] - b[2] * c[1],
            b[2] * c[0] - b[0] * c[2],
            b[0] * c[1] - b[1] * c[0],
        ];
        (a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]).abs()
    }

    /// Serialises the structure into an output tree value.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Reads a structure from an output tree value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the value is not a structure record.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ConfigurationError> {
        serde_json::from_value(value.clone())
            .map_err(|err| ConfigurationError::new(format!("Invalid structure record: {err}")))
    }
}

/// A pseudopotential as far as the orchestration cares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudoPotential {
    /// Element the pseudopotential describes.
    pub element: String,
    /// Number of valence electrons.
    pub z_valence: f64,
    /// Optional file name or family identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl PseudoPotential {
    /// Creates a new pseudopotential descriptor.
    #[must_use]
    pub fn new(element: impl Into<String>, z_valence: f64) -> Self {
        Self {
            element: element.into(),
            z_valence,
            filename: None,
        }
    }
}

/// Pseudopotentials keyed by kind name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct PseudoTable(BTreeMap<String, PseudoPotential>);

impl PseudoTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pseudopotential for a kind.
    pub fn insert(&mut self, kind_name: impl Into<String>, pseudo: PseudoPotential) {
        self.0.insert(kind_name.into(), pseudo);
    }

    /// Gets the pseudopotential for a kind.
    #[must_use]
    pub fn get(&self, kind_name: &str) -> Option<&PseudoPotential> {
        self.0.get(kind_name)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialises the table.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Reads a table from an override tree value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if an entry lacks `element`/`z_valence`.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ConfigurationError> {
        serde_json::from_value(value.clone()).map_err(|err| {
            ConfigurationError::new(format!("Invalid pseudopotential table: {err}"))
                .with_key("advanced.pw.pseudos")
        })
    }

    /// Reads the table under `scf.pw.pseudos` of a pw bands override tree.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the table is missing or malformed.
    pub fn from_pw_overrides(overrides: &Outputs) -> Result<Self, ConfigurationError> {
        let value = overrides
            .get("scf")
            .and_then(|scf| scf.get("pw"))
            .and_then(|pw| pw.get("pseudos"))
            .ok_or_else(|| {
                ConfigurationError::new("No pseudopotentials found under pw_bands.scf.pw.pseudos")
                    .with_key("advanced.pw.pseudos")
            })?;
        Self::from_value(value)
    }

    /// Sums the valence electrons over all sites of a structure.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a kind has no pseudopotential.
    pub fn number_of_electrons(&self, structure: &Structure) -> Result<f64, ConfigurationError> {
        structure.sites.iter().try_fold(0.0, |total, site| {
            self.get(&site.kind_name)
                .map(|pseudo| total + pseudo.z_valence)
                .ok_or_else(|| {
                    ConfigurationError::new(format!(
                        "No pseudopotential for kind '{}'",
                        site.kind_name
                    ))
                    .with_key("advanced.pw.pseudos")
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silicon() -> Structure {
        Structure::new([[0.0, 2.715, 2.715], [2.715, 0.0, 2.715], [2.715, 2.715, 0.0]])
            .with_atom("Si", [0.0, 0.0, 0.0])
            .with_atom("Si", [1.3575, 1.3575, 1.3575])
    }

    #[test]
    fn test_kind_names_and_formula() {
        let structure = silicon().with_site("O1", "O", [0.5, 0.5, 0.5]);
        assert_eq!(structure.kind_names(), vec!["Si", "O1"]);
        assert_eq!(structure.formula(), "Si2O");
    }

    #[test]
    fn test_volume() {
        let structure = silicon();
        assert!((structure.volume() - 40.02).abs() < 0.01);
    }

    #[test]
    fn test_number_of_electrons() {
        let mut table = PseudoTable::new();
        table.insert("Si", PseudoPotential::new("Si", 4.0));
        assert!((table.number_of_electrons(&silicon()).unwrap() - 8.0).abs() < 1e-12);

        let empty = PseudoTable::new();
        assert!(empty.number_of_electrons(&silicon()).is_err());
    }

    #[test]
    fn test_from_pw_overrides() {
        let overrides: Outputs = serde_json::from_value(serde_json::json!({
            "scf": {"pw": {"pseudos": {"Si": {"element": "Si", "z_valence": 4.0}}}}
        }))
        .unwrap();
        let table = PseudoTable::from_pw_overrides(&overrides).unwrap();
        assert_eq!(table.len(), 1);

        assert!(PseudoTable::from_pw_overrides(&Outputs::new()).is_err());
    }

    #[test]
    fn test_structure_value_round_trip() {
        let structure = silicon();
        let restored = Structure::from_value(&structure.to_value()).unwrap();
        assert_eq!(restored, structure);
    }
}
