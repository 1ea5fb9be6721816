//! Grid, rules, and tick orchestration for the Ecogrid simulation.
//!
//! This crate owns the per-tick update cycle that drives a 15x15 ecosystem
//! of plants, herbivores and carnivores: row-major scan, parallel cell
//! updates under neighborhood locks, and deferred births after a barrier.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `ecogrid-config.yaml` into
//!   strongly-typed structs.
//! - [`grid`] -- [`GridState`] with per-cell locks and row-major
//!   [`LockSet`] acquisition.
//! - [`random`] -- [`RandomnessSource`] trait and the seeded per-cell
//!   streams.
//! - [`rules`] -- Pure rule evaluation producing one intent per cell.
//! - [`claims`] -- The per-tick [`ClaimSet`] of committed destinations.
//! - [`coordinator`] -- Parallel dispatch of cell updates on a worker pool.
//! - [`tick`] -- The tick cycle itself.
//! - [`simulation`] -- The Idle/Running [`Simulation`] handle.
//!
//! [`GridState`]: grid::GridState
//! [`LockSet`]: grid::LockSet
//! [`RandomnessSource`]: random::RandomnessSource
//! [`ClaimSet`]: claims::ClaimSet
//! [`Simulation`]: simulation::Simulation

pub mod claims;
pub mod config;
pub mod coordinator;
pub mod grid;
pub mod random;
pub mod rules;
pub mod simulation;
pub mod tick;
