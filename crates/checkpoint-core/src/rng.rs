//! Random sources for spawning, scan-time sampling and alerting.
//!
//! The engine is generic over [`RandomSource`] so tests can inject scripted
//! sequences. [`SimRng`] is the default: SplitMix64, 8 bytes of state,
//! deterministic across platforms.

use crate::fixed::Fixed64;

/// Supplies every random decision the simulation makes.
///
/// Only [`next_u64`](RandomSource::next_u64) is required; the rest derive
/// from it so that scripted sources stay trivial to write.
pub trait RandomSource {
    /// Next raw 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Uniform float in `[0, 1)` built from the top 53 bits.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform integer in `[0, bound)`. Returns 0 when `bound` is 0.
    fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.next_u64() % bound
    }

    /// Returns `true` with the given probability.
    ///
    /// - probability <= 0 always returns false
    /// - probability >= 1 always returns true
    fn chance(&mut self, probability: Fixed64) -> bool {
        if probability <= Fixed64::ZERO {
            return false;
        }
        if probability >= Fixed64::ONE {
            return true;
        }
        // For p in (0,1) the raw Q32.32 bits are the fraction scaled to
        // [0, 2^32); compare against a uniform u32.
        let upper = (self.next_u64() >> 32) as u32;
        (upper as u64) < probability.to_bits() as u64
    }

    /// Normally distributed sample (Box-Muller). A zero `std_dev` returns `mean`
    /// without consuming randomness.
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        if std_dev <= 0.0 {
            return mean;
        }
        // Shift u1 into (0, 1] so ln() stays finite.
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        z0 * std_dev + mean
    }
}

/// SplitMix64 pseudo-random number generator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Get the internal state (for hashing).
    pub fn state(&self) -> u64 {
        self.state
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(0x5EC0_1234_C4EC_4B01)
    }
}

impl RandomSource for SimRng {
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}
