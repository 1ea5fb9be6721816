//! Tick cycle: one synchronous step over the whole grid.
//!
//! Each tick runs through these phases:
//!
//! 1. **Scan** -- collect every non-empty cell in row-major order. These
//!    are the sources for this tick.
//!
//! 2. **Update** -- the [`ConcurrencyCoordinator`] runs one task per source
//!    under its neighborhood lock set. A task skips cells that were claimed
//!    as a destination earlier in the tick or that have become empty,
//!    evaluates the rule chain, claims the chosen target in the
//!    [`ClaimSet`], and applies moves and meals in place. Births are
//!    recorded but not yet written.
//!
//! 3. **Barrier** -- the coordinator returns only once every task is done.
//!
//! 4. **Births** -- deferred offspring are written into their (still empty,
//!    already claimed) target cells.
//!
//! The claim set lives for exactly one tick. Every cell draws from its own
//! random stream keyed by `(seed, tick, cell)`, and overlapping updates are
//! admitted in row-major order, so a tick is deterministic for a given
//! seed and starting grid regardless of the worker count.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use ecogrid_types::{Cell, Intent, PopulationCounts, Position};
use serde::Serialize;
use tracing::{debug, info};

use crate::claims::ClaimSet;
use crate::config::RuleConfig;
use crate::coordinator::ConcurrencyCoordinator;
use crate::grid::{GridError, GridState, LockSet};
use crate::random::SeededRandomness;
use crate::rules::{self, Neighborhood};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A grid access failed.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// The tick number that was executed (first tick is 1).
    pub tick: u64,
    /// Cell counts after the tick.
    pub population: PopulationCounts,
    /// Offspring placed at the end of the tick.
    pub births: u32,
    /// Cells that died this tick.
    pub deaths: u32,
    /// Animals that stepped into an empty neighbor.
    pub moves: u32,
    /// Animals that ate a neighbor.
    pub meals: u32,
    /// Wall time spent on the tick, in microseconds.
    pub elapsed_micros: u64,
    /// Every accepted intent, keyed by source and sorted row-major.
    #[serde(skip)]
    pub intents: Vec<(Position, Intent)>,
}

/// Drives ticks over a grid.
#[derive(Debug)]
pub struct TickOrchestrator {
    coordinator: ConcurrencyCoordinator,
    rules: RuleConfig,
    seed: u64,
}

/// Per-tick scratch shared by all cell tasks.
struct TickContext<'a> {
    tick: u64,
    size: usize,
    rules: &'a RuleConfig,
    seed: u64,
    claims: ClaimSet,
    births: Mutex<Vec<(Position, Cell)>>,
    intents: Mutex<Vec<(Position, Intent)>>,
}

impl TickOrchestrator {
    /// Create an orchestrator from a coordinator, rule set, and run seed.
    pub const fn new(coordinator: ConcurrencyCoordinator, rules: RuleConfig, seed: u64) -> Self {
        Self {
            coordinator,
            rules,
            seed,
        }
    }

    /// The rule set applied each tick.
    pub const fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    /// Number of worker threads.
    pub const fn workers(&self) -> usize {
        self.coordinator.workers()
    }

    /// Execute tick number `tick` against `grid`.
    pub fn run_tick(&self, grid: &GridState, tick: u64) -> Result<TickSummary, TickError> {
        let started = Instant::now();

        // --- Phase 1: Scan ---
        let mut sources = Vec::new();
        for pos in grid.positions() {
            if !grid.get(pos)?.is_empty() {
                sources.push(pos);
            }
        }
        debug!(tick, sources = sources.len(), "Scan phase complete");

        // --- Phase 2 + 3: Update under lock sets, then barrier ---
        let ctx = TickContext {
            tick,
            size: grid.size(),
            rules: &self.rules,
            seed: self.seed,
            claims: ClaimSet::new(grid.size()),
            births: Mutex::new(Vec::new()),
            intents: Mutex::new(Vec::new()),
        };
        self.coordinator
            .run(grid, &sources, |locks| update_cell(&ctx, locks))?;
        debug!(tick, claimed = ctx.claims.count(), "Update phase complete");

        // --- Phase 4: Births ---
        let mut births = ctx
            .births
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        births.sort_unstable_by_key(|(pos, _)| *pos);
        for &(pos, cell) in &births {
            grid.set(pos, cell)?;
        }
        debug!(tick, births = births.len(), "Birth phase complete");

        let mut intents = ctx
            .intents
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        intents.sort_unstable_by_key(|(pos, _)| *pos);

        let mut summary = TickSummary {
            tick,
            population: grid.population()?,
            births: count(births.len()),
            deaths: 0,
            moves: 0,
            meals: 0,
            elapsed_micros: 0,
            intents,
        };
        for (_, intent) in &summary.intents {
            match intent {
                Intent::Die => summary.deaths = summary.deaths.saturating_add(1),
                Intent::Move { .. } => summary.moves = summary.moves.saturating_add(1),
                Intent::Eat { .. } => summary.meals = summary.meals.saturating_add(1),
                Intent::Age | Intent::Reproduce { .. } => {}
            }
        }
        summary.elapsed_micros = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

        info!(
            tick,
            plants = summary.population.plants,
            herbivores = summary.population.herbivores,
            carnivores = summary.population.carnivores,
            births = summary.births,
            deaths = summary.deaths,
            moves = summary.moves,
            meals = summary.meals,
            elapsed_micros = summary.elapsed_micros,
            "Tick complete"
        );

        Ok(summary)
    }
}

/// Evaluate and apply one source cell while holding its lock set.
fn update_cell(ctx: &TickContext<'_>, locks: &mut LockSet<'_>) -> Result<(), GridError> {
    let pos = locks.center();
    if ctx.claims.is_claimed(pos) {
        return Ok(());
    }
    let cell = locks.get(pos)?;
    if cell.is_empty() {
        return Ok(());
    }

    let hood =
        Neighborhood::classify(locks.neighbors().filter(|(p, _)| !ctx.claims.is_claimed(*p)));
    let index = pos.index(ctx.size).ok_or(GridError::OutOfBounds {
        pos,
        size: ctx.size,
    })?;
    let mut rng = SeededRandomness::for_cell(ctx.seed, ctx.tick, index);
    let intent = rules::evaluate(&cell, &hood, ctx.rules, &mut rng);

    // A neighbor is only ever claimed by a task whose lock set covers it,
    // and those tasks are serialized with this one. Every unclaimed
    // candidate in `hood` is therefore still free.
    let claimed = intent
        .target()
        .is_none_or(|target| ctx.claims.try_claim(target));
    debug_assert!(claimed, "target chosen by {pos} was already claimed");
    let intent = if claimed { intent } else { Intent::Age };

    let transition = rules::resolve(cell, intent, ctx.rules);
    locks.set(pos, transition.source)?;
    if let Some((target, occupant)) = transition.target {
        locks.set(target, occupant)?;
    }
    if let Some(birth) = transition.birth {
        ctx.births
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(birth);
    }
    ctx.intents
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((pos, intent));
    Ok(())
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
