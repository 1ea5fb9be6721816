//! Core data structs for the Ecogrid simulation.
//!
//! Covers grid coordinates ([`Position`]), the tagged cell variant
//! ([`Cell`]) and the serializable snapshot types handed to API clients
//! ([`CellRecord`], [`GridSnapshot`], [`PopulationCounts`]).

use serde::{Deserialize, Serialize};

use crate::enums::CellKind;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A `(row, col)` coordinate on the grid.
///
/// The derived ordering compares `row` first and `col` second, which is
/// exactly row-major scan order. Lock acquisition and claim precedence both
/// rely on this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Zero-based row index.
    pub row: usize,
    /// Zero-based column index.
    pub col: usize,
}

impl Position {
    /// Create a position from a row and column.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Row-major linear index of this position on a grid of side `size`.
    ///
    /// Returns `None` if the position lies outside the grid.
    pub const fn index(self, size: usize) -> Option<usize> {
        if self.row >= size || self.col >= size {
            return None;
        }
        match self.row.checked_mul(size) {
            Some(base) => base.checked_add(self.col),
            None => None,
        }
    }

    /// Inverse of [`Position::index`].
    pub const fn from_index(index: usize, size: usize) -> Option<Self> {
        match (index.checked_div(size), index.checked_rem(size)) {
            (Some(row), Some(col)) if row < size => Some(Self { row, col }),
            _ => None,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// Mutable vitals of an animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Animal {
    /// Ticks lived.
    pub age: u32,
    /// Remaining energy. The animal dies when this reaches zero.
    pub energy: u32,
}

/// The contents of one grid cell.
///
/// Cells are never allocated or freed individually: an entity is "born"
/// or "dies" by the cell transitioning between variants. `Empty` carries
/// no age or energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    /// Nothing lives here.
    #[default]
    Empty,
    /// A plant of the given age.
    Plant {
        /// Ticks lived.
        age: u32,
    },
    /// A herbivore.
    Herbivore(Animal),
    /// A carnivore.
    Carnivore(Animal),
}

impl Cell {
    /// A plant of the given age.
    pub const fn plant(age: u32) -> Self {
        Self::Plant { age }
    }

    /// A herbivore with the given age and energy.
    pub const fn herbivore(age: u32, energy: u32) -> Self {
        Self::Herbivore(Animal { age, energy })
    }

    /// A carnivore with the given age and energy.
    pub const fn carnivore(age: u32, energy: u32) -> Self {
        Self::Carnivore(Animal { age, energy })
    }

    /// The kind tag of this cell.
    pub const fn kind(&self) -> CellKind {
        match self {
            Self::Empty => CellKind::Empty,
            Self::Plant { .. } => CellKind::Plant,
            Self::Herbivore(_) => CellKind::Herbivore,
            Self::Carnivore(_) => CellKind::Carnivore,
        }
    }

    /// Whether the cell is empty.
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Age of the occupant, `0` for empty cells.
    pub const fn age(&self) -> u32 {
        match self {
            Self::Empty => 0,
            Self::Plant { age } => *age,
            Self::Herbivore(a) | Self::Carnivore(a) => a.age,
        }
    }

    /// Energy of the occupant, `0` for plants and empty cells.
    pub const fn energy(&self) -> u32 {
        match self {
            Self::Empty | Self::Plant { .. } => 0,
            Self::Herbivore(a) | Self::Carnivore(a) => a.energy,
        }
    }

    /// The animal vitals, if this cell holds an animal.
    pub const fn animal(&self) -> Option<Animal> {
        match self {
            Self::Herbivore(a) | Self::Carnivore(a) => Some(*a),
            Self::Empty | Self::Plant { .. } => None,
        }
    }

    /// The same species with new vitals.
    ///
    /// Non-animal cells are returned unchanged.
    #[must_use]
    pub const fn with_animal(self, animal: Animal) -> Self {
        match self {
            Self::Herbivore(_) => Self::Herbivore(animal),
            Self::Carnivore(_) => Self::Carnivore(animal),
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Wire representation of a single cell.
///
/// Serializes as `{"type": "H", "energy": 100, "age": 3}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    /// Kind tag, serialized under the `type` key.
    #[serde(rename = "type")]
    pub kind: CellKind,
    /// Energy (0 for plants and empty cells).
    pub energy: u32,
    /// Age (0 for empty cells).
    pub age: u32,
}

impl From<Cell> for CellRecord {
    fn from(cell: Cell) -> Self {
        Self {
            kind: cell.kind(),
            energy: cell.energy(),
            age: cell.age(),
        }
    }
}

/// A row-major copy of the whole grid.
///
/// Serializes as a plain 2-D JSON array of [`CellRecord`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridSnapshot {
    rows: Vec<Vec<CellRecord>>,
}

impl GridSnapshot {
    /// Build a snapshot from rows of records.
    pub const fn from_rows(rows: Vec<Vec<CellRecord>>) -> Self {
        Self { rows }
    }

    /// The rows of the snapshot.
    pub fn rows(&self) -> &[Vec<CellRecord>] {
        &self.rows
    }

    /// Number of rows.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// The record at a position, if it exists.
    pub fn get(&self, pos: Position) -> Option<&CellRecord> {
        self.rows.get(pos.row).and_then(|row| row.get(pos.col))
    }

    /// Count cells by kind.
    pub fn population(&self) -> PopulationCounts {
        let mut counts = PopulationCounts::default();
        for record in self.rows.iter().flatten() {
            counts.record(record.kind);
        }
        counts
    }
}

/// Number of cells of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PopulationCounts {
    /// Empty cells.
    pub empty: u32,
    /// Plant cells.
    pub plants: u32,
    /// Herbivore cells.
    pub herbivores: u32,
    /// Carnivore cells.
    pub carnivores: u32,
}

impl PopulationCounts {
    /// Count one more cell of the given kind.
    pub const fn record(&mut self, kind: CellKind) {
        let slot = match kind {
            CellKind::Empty => &mut self.empty,
            CellKind::Plant => &mut self.plants,
            CellKind::Herbivore => &mut self.herbivores,
            CellKind::Carnivore => &mut self.carnivores,
        };
        *slot = slot.saturating_add(1);
    }

    /// Total number of non-empty cells.
    pub const fn occupied(&self) -> u32 {
        self.plants
            .saturating_add(self.herbivores)
            .saturating_add(self.carnivores)
    }
}

/// Requested initial population for a new run.
///
/// Missing fields default to zero, so `{"plants": 10}` is a valid request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationRequest {
    /// Number of plants to place.
    pub plants: u32,
    /// Number of herbivores to place.
    pub herbivores: u32,
    /// Number of carnivores to place.
    pub carnivores: u32,
}

impl PopulationRequest {
    /// Total number of entities requested, widened so it cannot overflow.
    pub fn total(&self) -> u64 {
        u64::from(self.plants)
            .saturating_add(u64::from(self.herbivores))
            .saturating_add(u64::from(self.carnivores))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn position_order_is_row_major() {
        let mut positions = vec![
            Position::new(1, 0),
            Position::new(0, 2),
            Position::new(0, 1),
            Position::new(2, 0),
        ];
        positions.sort();
        assert_eq!(
            positions,
            vec![
                Position::new(0, 1),
                Position::new(0, 2),
                Position::new(1, 0),
                Position::new(2, 0),
            ]
        );
    }

    #[test]
    fn index_rejects_out_of_grid() {
        assert_eq!(Position::new(2, 3).index(15), Some(33));
        assert_eq!(Position::new(15, 0).index(15), None);
        assert_eq!(Position::new(0, 15).index(15), None);
        assert_eq!(Position::from_index(33, 15), Some(Position::new(2, 3)));
        assert_eq!(Position::from_index(225, 15), None);
    }

    #[test]
    fn empty_cell_reports_zero_vitals() {
        let cell = Cell::Empty;
        assert_eq!(cell.age(), 0);
        assert_eq!(cell.energy(), 0);
        assert!(cell.animal().is_none());
    }

    #[test]
    fn with_animal_keeps_species() {
        let carnivore = Cell::carnivore(3, 50);
        let updated = carnivore.with_animal(Animal { age: 4, energy: 45 });
        assert_eq!(updated, Cell::carnivore(4, 45));
        assert_eq!(Cell::plant(2).with_animal(Animal { age: 9, energy: 9 }), Cell::plant(2));
    }

    #[test]
    fn cell_record_serializes_with_type_key() {
        let record = CellRecord::from(Cell::herbivore(7, 85));
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json, serde_json::json!({"type": "H", "energy": 85, "age": 7}));
    }

    #[test]
    fn snapshot_serializes_as_nested_array() {
        let snapshot = GridSnapshot::from_rows(vec![
            vec![CellRecord::from(Cell::Empty), CellRecord::from(Cell::plant(1))],
            vec![
                CellRecord::from(Cell::carnivore(0, 100)),
                CellRecord::from(Cell::Empty),
            ],
        ]);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json[0][1]["type"], "P");
        assert_eq!(json[1][0]["energy"], 100);

        let counts = snapshot.population();
        assert_eq!(counts.empty, 2);
        assert_eq!(counts.plants, 1);
        assert_eq!(counts.carnivores, 1);
        assert_eq!(counts.occupied(), 2);
    }

    #[test]
    fn population_request_defaults_missing_fields() {
        let req: PopulationRequest = serde_json::from_str(r#"{"plants": 10}"#).unwrap();
        assert_eq!(req.plants, 10);
        assert_eq!(req.herbivores, 0);
        assert_eq!(req.total(), 10);

        let huge = PopulationRequest {
            plants: u32::MAX,
            herbivores: u32::MAX,
            carnivores: u32::MAX,
        };
        assert_eq!(huge.total(), 3 * u64::from(u32::MAX));
    }
}
