//! Deterministic random number generation.
//!
//! RULE: No task may call a platform RNG.
//! All randomness flows through TaskRng streams derived from the
//! session seed recorded in the session manifest.
//!
//! Each concern (deck order, risk checks, timers, ...) gets its own
//! stream, seeded from (seed XOR stream_index). So:
//!   - Drawing more cards never shifts the adverse-event timers.
//!   - A session is reproducible from its seed alone.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single concern.
pub struct TaskRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl TaskRng {
    /// Create a stream RNG from the session seed and a stable
    /// stream index. The index must never change once assigned.
    pub fn new(seed: u64, stream_index: u64) -> Self {
        let derived_seed = seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a usize in [0, n).
    pub fn below(&mut self, n: usize) -> usize {
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform float in [min, max]. Returns `min` when the range is empty.
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        min + self.next_f64() * (max - min)
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }

    /// Pick `k` items: without replacement when the pool is large enough,
    /// with replacement otherwise.
    pub fn sample<T: Clone>(&mut self, pool: &[T], k: usize) -> Vec<T> {
        if pool.is_empty() {
            return Vec::new();
        }
        if pool.len() > k {
            pool.choose_multiple(&mut self.inner, k).cloned().collect()
        } else {
            (0..k).map(|_| pool[self.below(pool.len())].clone()).collect()
        }
    }
}

/// All stream RNGs for a single session, indexed by stable slot.
pub struct RngBank {
    seed: u64,
}

impl RngBank {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn for_stream(&self, slot: StreamSlot) -> TaskRng {
        TaskRng::new(self.seed, slot as u64).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries. Only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    TrialOrder = 0,
    StimulusLayout = 1,
    CardFaces = 2,
    RiskCheck = 3,
    Display = 4,
    Timing = 5,
    Adverse = 6,
    Shield = 7,
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TrialOrder => "trial_order",
            Self::StimulusLayout => "stimulus_layout",
            Self::CardFaces => "card_faces",
            Self::RiskCheck => "risk_check",
            Self::Display => "display",
            Self::Timing => "timing",
            Self::Adverse => "adverse",
            Self::Shield => "shield",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_reproducible() {
        let bank_a = RngBank::new(12345);
        let bank_b = RngBank::new(12345);

        let mut a = bank_a.for_stream(StreamSlot::RiskCheck);
        let mut b = bank_b.for_stream(StreamSlot::RiskCheck);

        for _ in 0..100 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn streams_are_independent() {
        let bank = RngBank::new(12345);
        let mut risk = bank.for_stream(StreamSlot::RiskCheck);
        let mut order = bank.for_stream(StreamSlot::TrialOrder);

        let r: Vec<u64> = (0..8).map(|_| risk.next_f64().to_bits()).collect();
        let o: Vec<u64> = (0..8).map(|_| order.next_f64().to_bits()).collect();
        assert_ne!(r, o, "Different slots should not share a stream");
    }

    #[test]
    fn chance_of_one_always_fires() {
        let mut rng = RngBank::new(7).for_stream(StreamSlot::RiskCheck);
        assert!((0..1000).all(|_| rng.chance(1.0)));
        assert!((0..1000).all(|_| !rng.chance(0.0)));
    }

    #[test]
    fn sample_without_replacement_is_distinct() {
        let mut rng = RngBank::new(99).for_stream(StreamSlot::CardFaces);
        let pool: Vec<u32> = (0..52).collect();

        let mut picked = rng.sample(&pool, 17);
        assert_eq!(picked.len(), 17);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 17, "Faces should not repeat when the pool is large enough");

        // Pool smaller than the deck: falls back to sampling with replacement.
        assert_eq!(rng.sample(&pool, 65).len(), 65);
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = RngBank::new(3).for_stream(StreamSlot::Timing);
        for _ in 0..1000 {
            let v = rng.uniform(6.0, 60.0);
            assert!((6.0..=60.0).contains(&v), "{v} outside [6, 60]");
        }
        assert_eq!(rng.uniform(4.0, 4.0), 4.0);
    }
}
