//! The simulation grid and its per-cell locks.
//!
//! [`GridState`] owns a fixed `size x size` array of cells. Each cell sits
//! behind its own [`Mutex`], so the array of cells doubles as the array of
//! lock handles: they are created once with the grid and dropped with it.
//!
//! Multi-cell updates go through a [`LockSet`], which always acquires its
//! positions in row-major order. Because every caller uses the same total
//! order, two lock sets can never wait on each other in a cycle.

use std::sync::{Mutex, MutexGuard, PoisonError};

use ecogrid_types::{Cell, GridSnapshot, PopulationCounts, Position};

/// Side length of the simulation grid.
pub const GRID_SIZE: usize = 15;

/// Errors raised by grid access.
///
/// Both variants indicate a bug in the caller: every position handed to
/// the grid comes from bounds-filtered enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// A position outside `[0, size)` was requested.
    #[error("position {pos} is outside the {size}x{size} grid")]
    OutOfBounds {
        /// The offending position.
        pos: Position,
        /// Side length of the grid.
        size: usize,
    },

    /// A lock set was asked for a cell it does not hold.
    #[error("position {pos} is not held by this lock set")]
    NotHeld {
        /// The offending position.
        pos: Position,
    },
}

/// The `size x size` array of cells.
#[derive(Debug)]
pub struct GridState {
    size: usize,
    cells: Box<[Mutex<Cell>]>,
}

impl GridState {
    /// Create a grid of empty cells.
    pub fn new(size: usize) -> Self {
        let capacity = size.saturating_mul(size);
        let cells = (0..capacity).map(|_| Mutex::new(Cell::Empty)).collect();
        Self { size, cells }
    }

    /// Side length.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells.
    pub const fn capacity(&self) -> usize {
        self.size.saturating_mul(self.size)
    }

    /// Whether `pos` lies on the grid.
    pub const fn contains(&self, pos: Position) -> bool {
        pos.row < self.size && pos.col < self.size
    }

    /// Row-major linear index of `pos`.
    pub fn index_of(&self, pos: Position) -> Result<usize, GridError> {
        pos.index(self.size).ok_or(GridError::OutOfBounds {
            pos,
            size: self.size,
        })
    }

    /// Every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.capacity()).filter_map(|i| Position::from_index(i, self.size))
    }

    fn slot(&self, pos: Position) -> Result<&Mutex<Cell>, GridError> {
        let index = self.index_of(pos)?;
        self.cells.get(index).ok_or(GridError::OutOfBounds {
            pos,
            size: self.size,
        })
    }

    fn lock(&self, pos: Position) -> Result<MutexGuard<'_, Cell>, GridError> {
        // A panicking worker cannot leave a cell half-written: cells are
        // `Copy` and assigned whole, so a poisoned lock still holds a valid
        // value.
        Ok(self
            .slot(pos)?
            .lock()
            .unwrap_or_else(PoisonError::into_inner))
    }

    /// Read one cell.
    pub fn get(&self, pos: Position) -> Result<Cell, GridError> {
        Ok(*self.lock(pos)?)
    }

    /// Overwrite one cell.
    pub fn set(&self, pos: Position, cell: Cell) -> Result<(), GridError> {
        *self.lock(pos)? = cell;
        Ok(())
    }

    /// Reset every cell to empty.
    pub fn clear(&mut self) {
        for slot in self.cells.iter_mut() {
            *slot.get_mut().unwrap_or_else(PoisonError::into_inner) = Cell::Empty;
        }
    }

    /// The in-grid positions orthogonally adjacent to `pos`.
    ///
    /// Order is up, down, left, right. Edge cells yield three neighbors and
    /// corner cells two; the grid never wraps.
    pub fn neighbors4(&self, pos: Position) -> Result<Vec<Position>, GridError> {
        if !self.contains(pos) {
            return Err(GridError::OutOfBounds {
                pos,
                size: self.size,
            });
        }
        let candidates = [
            pos.row.checked_sub(1).map(|row| Position::new(row, pos.col)),
            pos.row.checked_add(1).map(|row| Position::new(row, pos.col)),
            pos.col.checked_sub(1).map(|col| Position::new(pos.row, col)),
            pos.col.checked_add(1).map(|col| Position::new(pos.row, col)),
        ];
        Ok(candidates
            .into_iter()
            .flatten()
            .filter(|p| self.contains(*p))
            .collect())
    }

    /// The neighborhood lock set of `pos`: the cell plus its in-grid
    /// neighbors, sorted row-major.
    pub fn neighborhood(&self, pos: Position) -> Result<Vec<Position>, GridError> {
        let mut positions = self.neighbors4(pos)?;
        positions.push(pos);
        positions.sort_unstable();
        Ok(positions)
    }

    /// Acquire exclusive access to `pos` and all of its neighbors.
    ///
    /// Locks are taken in row-major order and released when the returned
    /// [`LockSet`] is dropped.
    pub fn lock_neighborhood(&self, pos: Position) -> Result<LockSet<'_>, GridError> {
        let positions = self.neighborhood(pos)?;
        LockSet::acquire(self, pos, &positions)
    }

    /// Copy the grid into a serializable snapshot.
    pub fn snapshot(&self) -> Result<GridSnapshot, GridError> {
        let mut rows = Vec::with_capacity(self.size);
        for row in 0..self.size {
            let mut records = Vec::with_capacity(self.size);
            for col in 0..self.size {
                records.push(self.get(Position::new(row, col))?.into());
            }
            rows.push(records);
        }
        Ok(GridSnapshot::from_rows(rows))
    }

    /// Count cells by kind.
    pub fn population(&self) -> Result<PopulationCounts, GridError> {
        let mut counts = PopulationCounts::default();
        for pos in self.positions() {
            counts.record(self.get(pos)?.kind());
        }
        Ok(counts)
    }
}

/// Exclusive access to a group of cells, held for the lifetime of the set.
#[derive(Debug)]
pub struct LockSet<'g> {
    center: Position,
    guards: Vec<(Position, MutexGuard<'g, Cell>)>,
}

impl<'g> LockSet<'g> {
    /// Lock every position in `positions`, which must be sorted and
    /// deduplicated.
    fn acquire(
        grid: &'g GridState,
        center: Position,
        positions: &[Position],
    ) -> Result<Self, GridError> {
        debug_assert!(positions.windows(2).all(|w| matches!(w, [a, b] if a < b)));
        let mut guards = Vec::with_capacity(positions.len());
        for &pos in positions {
            guards.push((pos, grid.lock(pos)?));
        }
        Ok(Self { center, guards })
    }

    /// The cell this set was acquired for.
    pub const fn center(&self) -> Position {
        self.center
    }

    /// Held positions in acquisition order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.guards.iter().map(|(pos, _)| *pos)
    }

    /// Held neighbors of the center with their current contents.
    pub fn neighbors(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        self.guards
            .iter()
            .filter(|(pos, _)| *pos != self.center)
            .map(|(pos, guard)| (*pos, **guard))
    }

    /// Read a held cell.
    pub fn get(&self, pos: Position) -> Result<Cell, GridError> {
        self.guards
            .iter()
            .find(|(p, _)| *p == pos)
            .map(|(_, guard)| **guard)
            .ok_or(GridError::NotHeld { pos })
    }

    /// Overwrite a held cell.
    pub fn set(&mut self, pos: Position, cell: Cell) -> Result<(), GridError> {
        let (_, guard) = self
            .guards
            .iter_mut()
            .find(|(p, _)| *p == pos)
            .ok_or(GridError::NotHeld { pos })?;
        **guard = cell;
        Ok(())
    }
}
