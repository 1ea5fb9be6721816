//! Shared application state for the API server.
//!
//! [`AppState`] holds the simulation behind an async mutex and the
//! broadcast channel that carries tick summaries to `WebSocket` clients.

use std::sync::Arc;

use ecogrid_core::simulation::Simulation;
use ecogrid_core::tick::TickSummary;
use ecogrid_types::PopulationCounts;
use tokio::sync::{Mutex, broadcast};

/// Capacity of the broadcast channel for tick summaries.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// JSON-serializable tick summary pushed over the `WebSocket`.
///
/// A projection of the core [`TickSummary`] without the per-cell intent
/// list.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TickBroadcast {
    /// The tick number.
    pub tick: u64,
    /// Cell counts after the tick.
    pub population: PopulationCounts,
    /// Offspring placed this tick.
    pub births: u32,
    /// Cells that died this tick.
    pub deaths: u32,
    /// Animals that moved this tick.
    pub moves: u32,
    /// Animals that ate this tick.
    pub meals: u32,
    /// Wall time spent on the tick, in microseconds.
    pub elapsed_micros: u64,
}

impl From<&TickSummary> for TickBroadcast {
    fn from(summary: &TickSummary) -> Self {
        Self {
            tick: summary.tick,
            population: summary.population,
            births: summary.births,
            deaths: summary.deaths,
            moves: summary.moves,
            meals: summary.meals,
            elapsed_micros: summary.elapsed_micros,
        }
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Broadcast sender for tick summary messages.
    pub tx: broadcast::Sender<TickBroadcast>,
    /// The simulation. Requests are serialized on this lock, so ticks
    /// never interleave.
    pub simulation: Arc<Mutex<Simulation>>,
}

impl AppState {
    /// Wrap a simulation for sharing between handlers.
    pub fn new(simulation: Simulation) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            simulation: Arc::new(Mutex::new(simulation)),
        }
    }

    /// Subscribe to the tick broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TickBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a tick summary to all connected clients.
    ///
    /// Returns the number of receivers that received the message, which is
    /// 0 when no clients are connected.
    pub fn broadcast(&self, summary: &TickBroadcast) -> usize {
        // send fails only when there are zero receivers.
        self.tx.send(summary.clone()).unwrap_or(0)
    }
}
