//! Shared type definitions for the Ecogrid simulation.
//!
//! This crate is the single source of truth for the data model used across
//! the Ecogrid workspace: the grid coordinates, the cell variants, the
//! per-tick intents produced by the rule engine, and the wire-level grid
//! snapshot returned to API clients.
//!
//! # Modules
//!
//! - [`enums`] -- Cell kind tags and their single-character wire codes
//! - [`structs`] -- Positions, cells, grid snapshots, population counts
//! - [`actions`] -- The [`Intent`] a cell produces during rule evaluation

pub mod actions;
pub mod enums;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use actions::Intent;
pub use enums::CellKind;
pub use structs::{
    Animal, Cell, CellRecord, GridSnapshot, PopulationCounts, PopulationRequest, Position,
};
