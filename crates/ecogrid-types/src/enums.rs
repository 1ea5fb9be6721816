//! Enumeration types for the Ecogrid simulation.

use serde::{Deserialize, Serialize};

/// The kind of entity occupying a grid cell.
///
/// Serialized with the single-character codes the grid snapshot format
/// uses: `" "` for empty, `"P"` for plant, `"H"` for herbivore and `"C"`
/// for carnivore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Nothing lives here.
    #[serde(rename = " ")]
    Empty,
    /// A stationary plant that ages and spreads.
    #[serde(rename = "P")]
    Plant,
    /// A plant-eating animal.
    #[serde(rename = "H")]
    Herbivore,
    /// A herbivore-eating animal.
    #[serde(rename = "C")]
    Carnivore,
}

impl CellKind {
    /// The single-character wire code for this kind.
    pub const fn code(self) -> char {
        match self {
            Self::Empty => ' ',
            Self::Plant => 'P',
            Self::Herbivore => 'H',
            Self::Carnivore => 'C',
        }
    }

    /// Whether this kind carries an energy reserve.
    pub const fn is_animal(self) -> bool {
        matches!(self, Self::Herbivore | Self::Carnivore)
    }
}

impl std::fmt::Display for CellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Plant => "plant",
            Self::Herbivore => "herbivore",
            Self::Carnivore => "carnivore",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_to_wire_codes() {
        assert_eq!(serde_json::to_string(&CellKind::Empty).unwrap(), "\" \"");
        assert_eq!(serde_json::to_string(&CellKind::Plant).unwrap(), "\"P\"");
        assert_eq!(serde_json::to_string(&CellKind::Herbivore).unwrap(), "\"H\"");
        assert_eq!(serde_json::to_string(&CellKind::Carnivore).unwrap(), "\"C\"");
    }

    #[test]
    fn code_matches_serde_rename() {
        for kind in [
            CellKind::Empty,
            CellKind::Plant,
            CellKind::Herbivore,
            CellKind::Carnivore,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.code()));
        }
    }

    #[test]
    fn only_animals_carry_energy() {
        assert!(!CellKind::Empty.is_animal());
        assert!(!CellKind::Plant.is_animal());
        assert!(CellKind::Herbivore.is_animal());
        assert!(CellKind::Carnivore.is_animal());
    }
}
