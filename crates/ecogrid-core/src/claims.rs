//! Per-tick destination claims.
//!
//! A [`ClaimSet`] records which cells have already been committed as the
//! destination of an accepted intent during the current tick. It holds one
//! atomic flag per cell, so admission is a single compare-and-set and
//! workers never contend on a shared lock to claim a target.
//!
//! A claimed cell is off limits for the rest of the tick: it is not offered
//! as a neighbor candidate, and it is not evaluated as a source.

use std::sync::atomic::{AtomicBool, Ordering};

use ecogrid_types::Position;

/// Destinations committed during one tick.
#[derive(Debug)]
pub struct ClaimSet {
    size: usize,
    flags: Box<[AtomicBool]>,
}

impl ClaimSet {
    /// An empty claim set for a grid of side `size`.
    pub fn new(size: usize) -> Self {
        let capacity = size.saturating_mul(size);
        let flags = (0..capacity).map(|_| AtomicBool::new(false)).collect();
        Self { size, flags }
    }

    fn flag(&self, pos: Position) -> Option<&AtomicBool> {
        pos.index(self.size).and_then(|i| self.flags.get(i))
    }

    /// Claim `pos` as a destination.
    ///
    /// Returns `true` if this call made the claim, `false` if the position
    /// was already claimed or lies off the grid.
    pub fn try_claim(&self, pos: Position) -> bool {
        self.flag(pos).is_some_and(|flag| {
            flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })
    }

    /// Whether `pos` has been claimed this tick.
    pub fn is_claimed(&self, pos: Position) -> bool {
        self.flag(pos).is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Number of claimed positions.
    pub fn count(&self) -> usize {
        self.flags
            .iter()
            .filter(|flag| flag.load(Ordering::Acquire))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn first_claim_wins() {
        let claims = ClaimSet::new(15);
        let pos = Position::new(3, 4);
        assert!(!claims.is_claimed(pos));
        assert!(claims.try_claim(pos));
        assert!(!claims.try_claim(pos));
        assert!(claims.is_claimed(pos));
        assert_eq!(claims.count(), 1);
    }

    #[test]
    fn off_grid_positions_are_never_claimed() {
        let claims = ClaimSet::new(15);
        assert!(!claims.try_claim(Position::new(15, 15)));
        assert!(!claims.is_claimed(Position::new(15, 15)));
        assert_eq!(claims.count(), 0);
    }

    #[test]
    fn concurrent_claims_admit_exactly_one() {
        let claims = ClaimSet::new(15);
        let winners = AtomicUsize::new(0);
        let target = Position::new(7, 7);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    if claims.try_claim(target) {
                        winners.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });
        assert_eq!(winners.load(Ordering::Relaxed), 1);
    }
}
