//! HTTP API server for the Ecogrid simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Control endpoints** (`POST /start-simulation`,
//!   `GET /next-iteration`) that start a run and advance it one tick at a
//!   time, each returning the full grid as JSON
//! - **Status endpoints** (`GET /api/status`, `GET /api/grid`) for
//!   read-only inspection
//! - **`WebSocket` endpoint** (`/ws/ticks`) for real-time tick summary
//!   streaming via [`tokio::sync::broadcast`]
//! - **Minimal HTML page** (`GET /`) showing the current tick, state and
//!   population
//!
//! # Architecture
//!
//! The [`Simulation`] lives behind an async mutex in [`AppState`]. Ticks
//! are CPU-bound and run on the core crate's worker pool, so handlers move
//! the locked simulation onto a blocking task while a tick runs.
//!
//! [`Simulation`]: ecogrid_core::simulation::Simulation

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, TickBroadcast};
