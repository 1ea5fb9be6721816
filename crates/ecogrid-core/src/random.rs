//! Randomness for rule evaluation and initial placement.
//!
//! The rule engine only sees the [`RandomnessSource`] trait, so tests can
//! script exact draws. Production code uses [`SeededRandomness`], a
//! `ChaCha8` stream whose output is identical on every platform.
//!
//! Cell updates run in parallel, so a single shared generator would make
//! results depend on thread timing. Instead every cell update gets its own
//! stream derived from `(run seed, tick, cell index)`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A supply of probability draws and uniform picks.
pub trait RandomnessSource {
    /// Draw once and return `true` with the given probability.
    fn chance(&mut self, probability: f64) -> bool;

    /// Pick a uniform index in `0..len`, or `None` when `len` is zero.
    fn pick_index(&mut self, len: usize) -> Option<usize>;
}

/// Pick one element of `candidates` uniformly at random.
pub fn pick<T: Copy, R: RandomnessSource + ?Sized>(rng: &mut R, candidates: &[T]) -> Option<T> {
    rng.pick_index(candidates.len())
        .and_then(|i| candidates.get(i))
        .copied()
}

/// A seeded, portable random stream.
#[derive(Debug, Clone)]
pub struct SeededRandomness {
    rng: ChaCha8Rng,
}

impl SeededRandomness {
    /// A stream seeded directly from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The stream used to evaluate one cell in one tick.
    pub fn for_cell(seed: u64, tick: u64, cell_index: usize) -> Self {
        let index = u64::try_from(cell_index).unwrap_or(u64::MAX);
        Self::new(mix(mix(mix(seed) ^ tick) ^ index))
    }
}

impl RandomnessSource for SeededRandomness {
    fn chance(&mut self, probability: f64) -> bool {
        self.rng.random::<f64>() < probability
    }

    fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.rng.random_range(0..len))
        }
    }
}

/// `SplitMix64` finalizer, used to spread seed components across all bits.
const fn mix(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
