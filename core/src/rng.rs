//! Deterministic random number generation.
//!
//! RULE: Nothing in model training or evaluation may call any platform
//! RNG. All randomness flows through ScopeRng instances derived from the
//! single master seed in ModelConfig.
//!
//! Each consumer gets its own stream, seeded deterministically from
//! (master_seed XOR stream_index). This means:
//!   - Adding a new stream never changes existing streams.
//!   - The train/test split is identical whatever the ensemble size.

use rand::{
    seq::{index, SliceRandom},
    Rng, SeedableRng,
};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single consumer.
pub struct ScopeRng {
    pub name: &'static str,
    seed:  u64,
    inner: Pcg64Mcg,
}

impl ScopeRng {
    /// Create a stream from the master seed and a stable stream index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            seed: derived_seed,
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn for_stream(master_seed: u64, stream: RngStream) -> Self {
        Self::new(master_seed, stream as u64).with_name(stream.name())
    }

    /// A child stream for the `index`-th member of an ensemble. Each tree
    /// draws from its own child so tree k is the same however many follow.
    pub fn child(&self, index: u64) -> Self {
        Self::new(self.seed, index.wrapping_add(1)).with_name(self.name)
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Roll an index in [0, n). `n` must be > 0.
    pub fn next_index(&mut self, n: usize) -> usize {
        debug_assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n.max(1))
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }

    /// `k` distinct indices from [0, n), in draw order.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        index::sample(&mut self.inner, n, k.min(n)).into_vec()
    }
}

/// Stable stream assignments.
/// NEVER reorder or remove entries, only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngStream {
    Split = 0,
    Bootstrap = 1,
    Features = 2,
}

impl RngStream {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::Bootstrap => "bootstrap",
            Self::Features => "features",
        }
    }
}
