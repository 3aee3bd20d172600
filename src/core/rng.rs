//! Seeded random number generation
//!
//! Every random draw in a simulation flows through a [`SeededRng`] built from
//! the race seed, so a `(spec, seed)` pair always replays identically.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Reproducible generator for uniform and Gaussian draws
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u64,
    inner: ChaCha8Rng,
    spare_normal: Option<f64>,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: ChaCha8Rng::seed_from_u64(seed),
            spare_normal: None,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform draw in [lo, hi)
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * self.next_f64()
    }

    /// Uniform draw in [-magnitude, magnitude)
    pub fn symmetric(&mut self, magnitude: f64) -> f64 {
        self.uniform(-magnitude, magnitude)
    }

    /// Bernoulli trial
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Standard normal draw (Box-Muller, pairs cached)
    pub fn gaussian(&mut self) -> f64 {
        if let Some(spare) = self.spare_normal.take() {
            return spare;
        }

        // u1 must be strictly positive for ln()
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;

        self.spare_normal = Some(radius * theta.sin());
        radius * theta.cos()
    }

    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.gaussian()
    }
}

/// Derive a stable seed from a string such as a race id (FNV-1a 64)
pub fn seed_from_str(value: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    value.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(PRIME)
    })
}
