//! Parallel scheduling of per-cell updates.
//!
//! The [`ConcurrencyCoordinator`] runs one task per source cell on a fixed
//! `rayon` pool. A task only runs while it holds the neighborhood lock set
//! of its cell (the cell plus its in-grid neighbors), so tasks whose
//! neighborhoods overlap are serialized and all others run in parallel.
//!
//! # Admission order
//!
//! Overlapping tasks are not merely serialized, they are serialized in
//! row-major order. Every cell keeps a static admission queue: the
//! ascending list of tickets whose lock set contains it. A task may take
//! its locks only when it is at the head of the queue of every cell in its
//! lock set. The result of a tick is therefore exactly the result of the
//! sequential row-major scan, whatever the worker count.
//!
//! # Progress
//!
//! Workers take tickets from a shared counter in ascending order. The
//! smallest unfinished ticket has already been taken by some worker, and
//! every ticket ahead of it in any queue is finished, so it is always
//! admitted. Locks inside an admitted task are taken in row-major order
//! (see [`LockSet`]), so there is no cycle to wait on either.
//!
//! [`LockSet`]: crate::grid::LockSet

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

use ecogrid_types::Position;
use tracing::debug;

use crate::grid::{GridError, GridState, LockSet};

/// Errors that can occur when building the worker pool.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The thread pool could not be created.
    #[error("failed to build worker pool: {source}")]
    Pool {
        /// The underlying rayon error.
        #[from]
        source: rayon::ThreadPoolBuildError,
    },
}

/// Runs cell update tasks in parallel under neighborhood lock sets.
#[derive(Debug)]
pub struct ConcurrencyCoordinator {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl ConcurrencyCoordinator {
    /// Create a coordinator with `workers` threads (at least one).
    pub fn new(workers: usize) -> Result<Self, CoordinatorError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ecogrid-cell-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    /// Number of worker threads.
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` once for every source, holding the source's neighborhood
    /// lock set for the duration of the call.
    ///
    /// `sources` are processed in row-major order regardless of how they
    /// are passed in. Returns once every task has finished, which is the
    /// tick barrier. If any task fails the remaining tasks still run and
    /// the first error (by ticket) is returned.
    pub fn run<F>(&self, grid: &GridState, sources: &[Position], task: F) -> Result<(), GridError>
    where
        F: Fn(&mut LockSet<'_>) -> Result<(), GridError> + Sync,
    {
        let schedule = Schedule::build(grid, sources)?;
        let next_ticket = AtomicUsize::new(0);
        let failures: Mutex<Vec<(usize, GridError)>> = Mutex::new(Vec::new());

        debug!(
            sources = schedule.len(),
            workers = self.workers,
            "dispatching cell updates"
        );

        self.pool.scope(|scope| {
            for _ in 0..self.workers {
                scope.spawn(|_| {
                    loop {
                        let ticket = next_ticket.fetch_add(1, Ordering::AcqRel);
                        let Some(source) = schedule.source(ticket) else {
                            break;
                        };
                        let _turn = schedule.enter(ticket);
                        let result = grid
                            .lock_neighborhood(source)
                            .and_then(|mut locks| task(&mut locks));
                        if let Err(e) = result {
                            failures
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .push((ticket, e));
                        }
                    }
                });
            }
        });

        let mut failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
        failures.sort_by_key(|(ticket, _)| *ticket);
        match failures.into_iter().next() {
            Some((_, e)) => Err(e),
            None => Ok(()),
        }
    }
}

/// Static admission queues for one dispatch.
#[derive(Debug)]
struct Schedule {
    /// Sources in ticket order (row-major).
    sources: Vec<Position>,
    /// Cell indices in each ticket's lock set.
    lock_sets: Vec<Vec<usize>>,
    /// Per cell: ascending tickets whose lock set contains the cell.
    queues: Vec<Vec<usize>>,
    /// Per cell: how many queue entries have finished.
    turns: Vec<AtomicUsize>,
    gate: Mutex<()>,
    turn_changed: Condvar,
}

impl Schedule {
    fn build(grid: &GridState, sources: &[Position]) -> Result<Self, GridError> {
        let mut sources = sources.to_vec();
        sources.sort_unstable();
        sources.dedup();

        let mut queues = vec![Vec::new(); grid.capacity()];
        let mut lock_sets = Vec::with_capacity(sources.len());
        for (ticket, &source) in sources.iter().enumerate() {
            let mut cells = Vec::with_capacity(5);
            for pos in grid.neighborhood(source)? {
                let index = grid.index_of(pos)?;
                if let Some(queue) = queues.get_mut(index) {
                    queue.push(ticket);
                }
                cells.push(index);
            }
            lock_sets.push(cells);
        }

        let turns = (0..grid.capacity()).map(|_| AtomicUsize::new(0)).collect();
        Ok(Self {
            sources,
            lock_sets,
            queues,
            turns,
            gate: Mutex::new(()),
            turn_changed: Condvar::new(),
        })
    }

    fn len(&self) -> usize {
        self.sources.len()
    }

    fn source(&self, ticket: usize) -> Option<Position> {
        self.sources.get(ticket).copied()
    }

    fn cells(&self, ticket: usize) -> &[usize] {
        self.lock_sets
            .get(ticket)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `ticket` heads the queue of every cell in its lock set.
    fn admitted(&self, ticket: usize) -> bool {
        self.cells(ticket).iter().all(|&cell| {
            let turn = self
                .turns
                .get(cell)
                .map_or(usize::MAX, |t| t.load(Ordering::Acquire));
            self.queues
                .get(cell)
                .and_then(|queue| queue.get(turn))
                .is_some_and(|&head| head == ticket)
        })
    }

    /// Block until `ticket` is admitted. The returned guard passes the turn
    /// on when dropped, including during unwinding.
    fn enter(&self, ticket: usize) -> Turn<'_> {
        if !self.admitted(ticket) {
            let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
            while !self.admitted(ticket) {
                gate = self
                    .turn_changed
                    .wait(gate)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        Turn {
            schedule: self,
            ticket,
        }
    }

    fn release(&self, ticket: usize) {
        for &cell in self.cells(ticket) {
            if let Some(turn) = self.turns.get(cell) {
                turn.fetch_add(1, Ordering::AcqRel);
            }
        }
        // Taking the gate orders this notification after any waiter's
        // admission check, so no wakeup is lost.
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.turn_changed.notify_all();
    }
}

/// An admitted ticket. Dropping it releases the ticket's queue slots.
struct Turn<'s> {
    schedule: &'s Schedule,
    ticket: usize,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        self.schedule.release(self.ticket);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ecogrid_types::Cell;

    use super::*;
    use crate::grid::GRID_SIZE;

    fn all_positions(grid: &GridState) -> Vec<Position> {
        grid.positions().collect()
    }

    const fn overlaps(a: Position, b: Position) -> bool {
        a.row.abs_diff(b.row) + a.col.abs_diff(b.col) <= 2
    }

    #[test]
    fn every_source_runs_once() {
        let grid = GridState::new(GRID_SIZE);
        let coordinator = ConcurrencyCoordinator::new(4).unwrap();
        let runs = Mutex::new(Vec::new());
        coordinator
            .run(&grid, &all_positions(&grid), |locks| {
                runs.lock().unwrap().push(locks.center());
                Ok(())
            })
            .unwrap();
        let mut runs = runs.into_inner().unwrap();
        runs.sort();
        assert_eq!(runs, all_positions(&grid));
    }

    #[test]
    fn overlapping_tasks_run_in_row_major_order() {
        let grid = GridState::new(GRID_SIZE);
        let coordinator = ConcurrencyCoordinator::new(8).unwrap();
        let order = Mutex::new(Vec::new());
        // Shuffled input: admission order must not depend on it.
        let mut sources = all_positions(&grid);
        sources.reverse();
        coordinator
            .run(&grid, &sources, |locks| {
                order.lock().unwrap().push(locks.center());
                Ok(())
            })
            .unwrap();

        let order = order.into_inner().unwrap();
        for (i, a) in order.iter().enumerate() {
            for b in order.iter().skip(i + 1) {
                if overlaps(*a, *b) {
                    assert!(a < b, "{a} ran before overlapping {b} out of order");
                }
            }
        }
    }

    #[test]
    fn sequential_and_parallel_runs_agree() {
        // Each task reads its neighbors and writes a value derived from
        // them; row-major admission makes the result independent of the
        // worker count.
        let run = |workers| {
            let grid = GridState::new(GRID_SIZE);
            let coordinator = ConcurrencyCoordinator::new(workers).unwrap();
            coordinator
                .run(&grid, &all_positions(&grid), |locks| {
                    let sum: u32 = locks.neighbors().map(|(_, c)| c.age()).sum();
                    let center = locks.center();
                    locks.set(center, Cell::plant(sum.saturating_add(1)))
                })
                .unwrap();
            grid.snapshot().unwrap()
        };
        let sequential = run(1);
        assert_eq!(run(3), sequential);
        assert_eq!(run(8), sequential);
    }

    #[test]
    fn task_errors_surface_without_hanging() {
        let grid = GridState::new(5);
        let coordinator = ConcurrencyCoordinator::new(3).unwrap();
        let result = coordinator.run(&grid, &all_positions(&grid), |locks| {
            let far = Position::new(4, 4);
            if locks.center() == Position::new(0, 0) {
                locks.get(far).map(|_| ())
            } else {
                Ok(())
            }
        });
        assert_eq!(
            result,
            Err(GridError::NotHeld {
                pos: Position::new(4, 4)
            })
        );
    }

    #[test]
    fn off_grid_source_is_rejected_up_front() {
        let grid = GridState::new(5);
        let coordinator = ConcurrencyCoordinator::new(2).unwrap();
        let result = coordinator.run(&grid, &[Position::new(5, 0)], |_| Ok(()));
        assert!(matches!(result, Err(GridError::OutOfBounds { .. })));
    }

    #[test]
    fn zero_workers_is_clamped() {
        let coordinator = ConcurrencyCoordinator::new(0).unwrap();
        assert_eq!(coordinator.workers(), 1);
    }
}
