//! The simulation handle exposed to the engine and the HTTP surface.
//!
//! A [`Simulation`] owns the grid, the tick orchestrator and the placement
//! stream, and moves between two states:
//!
//! - **Idle** -- no run has been started. Advancing is an error.
//! - **Running** -- the grid has been populated and ticks may be advanced.
//!
//! There is no terminal state. Calling [`Simulation::initialize`] again
//! clears the grid and starts a fresh run from tick zero.

use chrono::{DateTime, Utc};
use ecogrid_types::{Cell, GridSnapshot, PopulationCounts, PopulationRequest, Position};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::coordinator::{ConcurrencyCoordinator, CoordinatorError};
use crate::grid::{GRID_SIZE, GridError, GridState};
use crate::random::{RandomnessSource, SeededRandomness};
use crate::tick::{TickError, TickOrchestrator, TickSummary};

/// Errors returned by simulation operations.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The requested population does not fit on the grid.
    #[error("Too many entities: requested {requested}, grid holds {capacity}")]
    Validation {
        /// Total entities requested.
        requested: u64,
        /// Number of cells on the grid.
        capacity: usize,
    },

    /// A tick was requested before any run was started.
    #[error("simulation has not been started")]
    NotRunning,

    /// A grid access failed.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },

    /// A tick failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },

    /// The worker pool could not be built.
    #[error("coordinator error: {source}")]
    Coordinator {
        /// The underlying coordinator error.
        #[from]
        source: CoordinatorError,
    },
}

/// Lifecycle state of a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No run has been started.
    Idle,
    /// A run is in progress.
    Running,
}

/// Result of advancing one tick.
#[derive(Debug, Clone)]
pub struct AdvanceResult {
    /// What happened during the tick.
    pub summary: TickSummary,
    /// The grid after the tick.
    pub grid: GridSnapshot,
}

/// JSON-serializable status of the simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationStatus {
    /// Lifecycle state.
    pub state: RunState,
    /// Number of ticks completed in the current run.
    pub tick: u64,
    /// Current cell counts.
    pub population: PopulationCounts,
    /// Number of cell workers.
    pub workers: usize,
    /// ISO 8601 timestamp of when the current run started, if any.
    pub started_at: Option<String>,
    /// Summary of the most recent tick, if any.
    pub last_tick: Option<TickSummary>,
}

/// A single ecosystem simulation.
#[derive(Debug)]
pub struct Simulation {
    grid: GridState,
    orchestrator: TickOrchestrator,
    placement: SeededRandomness,
    state: RunState,
    tick: u64,
    started_at: Option<DateTime<Utc>>,
    last_tick: Option<TickSummary>,
}

impl Simulation {
    /// Build an idle simulation from configuration.
    pub fn new(config: &SimulationConfig) -> Result<Self, SimulationError> {
        let coordinator = ConcurrencyCoordinator::new(config.world.workers)?;
        let orchestrator =
            TickOrchestrator::new(coordinator, config.rules.clone(), config.world.seed);
        info!(
            name = %config.world.name,
            seed = config.world.seed,
            workers = orchestrator.workers(),
            size = GRID_SIZE,
            "Simulation created"
        );
        Ok(Self {
            grid: GridState::new(GRID_SIZE),
            orchestrator,
            placement: SeededRandomness::new(config.world.seed),
            state: RunState::Idle,
            tick: 0,
            started_at: None,
            last_tick: None,
        })
    }

    /// Lifecycle state.
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Ticks completed in the current run.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Start (or restart) a run with a random placement.
    ///
    /// Fails with [`SimulationError::Validation`] when the requested total
    /// exceeds the number of cells; the current run is left untouched in
    /// that case. Otherwise plants, then herbivores, then carnivores are
    /// placed on distinct uniformly chosen empty cells.
    pub fn initialize(
        &mut self,
        request: PopulationRequest,
    ) -> Result<GridSnapshot, SimulationError> {
        let capacity = self.grid.capacity();
        let requested = request.total();
        if requested > u64::try_from(capacity).unwrap_or(u64::MAX) {
            return Err(SimulationError::Validation {
                requested,
                capacity,
            });
        }

        self.reset();
        let newborn = self.orchestrator.rules().newborn_energy;
        let batches = [
            (request.plants, Cell::plant(0)),
            (request.herbivores, Cell::herbivore(0, newborn)),
            (request.carnivores, Cell::carnivore(0, newborn)),
        ];
        for (count, cell) in batches {
            for _ in 0..count {
                self.place(cell)?;
            }
        }

        info!(
            plants = request.plants,
            herbivores = request.herbivores,
            carnivores = request.carnivores,
            "Simulation initialized"
        );
        Ok(self.grid.snapshot()?)
    }

    /// Start (or restart) a run from explicit cell contents.
    ///
    /// Positions not listed are empty. Later entries overwrite earlier
    /// ones at the same position.
    pub fn seed_grid(&mut self, cells: &[(Position, Cell)]) -> Result<GridSnapshot, SimulationError> {
        for &(pos, _) in cells {
            self.grid.index_of(pos)?;
        }
        self.reset();
        for &(pos, cell) in cells {
            self.grid.set(pos, cell)?;
        }
        info!(cells = cells.len(), "Simulation seeded from explicit layout");
        Ok(self.grid.snapshot()?)
    }

    /// Advance the running simulation by one tick.
    pub fn advance(&mut self) -> Result<AdvanceResult, SimulationError> {
        if self.state != RunState::Running {
            return Err(SimulationError::NotRunning);
        }
        let tick = self.tick.saturating_add(1);
        let summary = self.orchestrator.run_tick(&self.grid, tick)?;
        self.tick = tick;
        self.last_tick = Some(summary.clone());
        Ok(AdvanceResult {
            summary,
            grid: self.grid.snapshot()?,
        })
    }

    /// Current grid contents.
    pub fn snapshot(&self) -> Result<GridSnapshot, SimulationError> {
        Ok(self.grid.snapshot()?)
    }

    /// Current status for reporting.
    pub fn status(&self) -> Result<SimulationStatus, SimulationError> {
        Ok(SimulationStatus {
            state: self.state,
            tick: self.tick,
            population: self.grid.population()?,
            workers: self.orchestrator.workers(),
            started_at: self.started_at.map(|t| t.to_rfc3339()),
            last_tick: self.last_tick.clone(),
        })
    }

    fn reset(&mut self) {
        self.grid.clear();
        self.tick = 0;
        self.last_tick = None;
        self.state = RunState::Running;
        self.started_at = Some(Utc::now());
    }

    /// Put `cell` on a uniformly chosen empty position.
    ///
    /// Only called while the grid has room, so a free cell always exists.
    fn place(&mut self, cell: Cell) -> Result<(), SimulationError> {
        let capacity = self.grid.capacity();
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            let Some(index) = self.placement.pick_index(capacity) else {
                return Ok(());
            };
            let Some(pos) = Position::from_index(index, self.grid.size()) else {
                continue;
            };
            if self.grid.get(pos)?.is_empty() {
                self.grid.set(pos, cell)?;
                debug!(%pos, kind = %cell.kind(), attempts, "Placed entity");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn simulation() -> Simulation {
        let mut config = SimulationConfig::default();
        config.world.workers = 2;
        Simulation::new(&config).unwrap()
    }

    const fn request(plants: u32, herbivores: u32, carnivores: u32) -> PopulationRequest {
        PopulationRequest {
            plants,
            herbivores,
            carnivores,
        }
    }

    #[test]
    fn starts_idle() {
        let sim = simulation();
        assert_eq!(sim.state(), RunState::Idle);
        assert!(matches!(
            simulation().advance(),
            Err(SimulationError::NotRunning)
        ));
        assert_eq!(sim.status().unwrap().started_at, None);
    }

    #[test]
    fn initialize_places_exact_counts() {
        let mut sim = simulation();
        let grid = sim.initialize(request(20, 10, 5)).unwrap();
        let counts = grid.population();
        assert_eq!(counts.plants, 20);
        assert_eq!(counts.herbivores, 10);
        assert_eq!(counts.carnivores, 5);
        assert_eq!(counts.empty, 190);
        assert_eq!(sim.state(), RunState::Running);

        for record in grid.rows().iter().flatten() {
            assert_eq!(record.age, 0);
            let expected = if record.kind.is_animal() { 100 } else { 0 };
            assert_eq!(record.energy, expected);
        }
    }

    #[test]
    fn full_grid_is_accepted() {
        let mut sim = simulation();
        let grid = sim.initialize(request(100, 100, 25)).unwrap();
        assert_eq!(grid.population().empty, 0);
    }

    #[test]
    fn overfull_grid_is_rejected_without_mutation() {
        let mut sim = simulation();
        sim.initialize(request(3, 0, 0)).unwrap();
        sim.advance().unwrap();
        let before = sim.snapshot().unwrap();

        let err = sim.initialize(request(100, 100, 26)).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Validation {
                requested: 226,
                capacity: 225
            }
        ));
        assert!(err.to_string().starts_with("Too many entities"));
        assert_eq!(sim.snapshot().unwrap(), before);
        assert_eq!(sim.tick(), 1);
    }

    #[test]
    fn counts_that_overflow_u32_are_rejected() {
        let mut sim = simulation();
        let result = sim.initialize(request(u32::MAX, u32::MAX, 1));
        assert!(matches!(result, Err(SimulationError::Validation { .. })));
        assert_eq!(sim.state(), RunState::Idle);
    }

    #[test]
    fn advance_counts_ticks_and_reset_restarts() {
        let mut sim = simulation();
        sim.initialize(request(10, 5, 2)).unwrap();
        let first = sim.advance().unwrap();
        assert_eq!(first.summary.tick, 1);
        let second = sim.advance().unwrap();
        assert_eq!(second.summary.tick, 2);
        assert_eq!(second.grid.population(), second.summary.population);

        sim.initialize(request(1, 0, 0)).unwrap();
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.status().unwrap().last_tick, None);
    }

    #[test]
    fn seeded_plant_dies_at_max_age() {
        let mut sim = simulation();
        sim.seed_grid(&[(Position::new(0, 0), Cell::plant(10))])
            .unwrap();
        let result = sim.advance().unwrap();
        assert_eq!(
            result.grid.get(Position::new(0, 0)).map(|r| r.kind),
            Some(ecogrid_types::CellKind::Empty)
        );
    }

    #[test]
    fn seed_grid_rejects_off_grid_positions() {
        let mut sim = simulation();
        let result = sim.seed_grid(&[(Position::new(15, 0), Cell::plant(0))]);
        assert!(matches!(result, Err(SimulationError::Grid { .. })));
        assert_eq!(sim.state(), RunState::Idle);
    }

    #[test]
    fn status_serializes_lowercase_state() {
        let mut sim = simulation();
        sim.initialize(request(1, 1, 1)).unwrap();
        let json = serde_json::to_value(sim.status().unwrap()).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["population"]["plants"], 1);
        assert!(json["started_at"].is_string());
    }
}
