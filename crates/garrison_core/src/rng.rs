//! Seeded randomness for dispatch jitter and AI rolls.
//!
//! The match owns a single [`SimRng`]; it is serialized with the rest of
//! the match state so a restored snapshot continues the same stream.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Match-wide pseudo-random generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform fraction in `[0, 1)`.
    pub fn unit(&mut self) -> Fixed {
        // The low 32 bits of an I32F32 are exactly the fractional part.
        Fixed::from_bits(i64::from(self.inner.gen::<u32>()))
    }

    /// Uniform value in `[-1, 1)`.
    pub fn signed_unit(&mut self) -> Fixed {
        self.unit() * Fixed::from_num(2) - Fixed::ONE
    }

    /// Uniform value in `[min, max)`; returns `min` for an empty range.
    pub fn range(&mut self, min: Fixed, max: Fixed) -> Fixed {
        if max <= min {
            return min;
        }
        min + (max - min) * self.unit()
    }

    /// True with probability `p` (clamped to `[0, 1]`).
    pub fn chance(&mut self, p: Fixed) -> bool {
        self.unit() < p
    }
}
