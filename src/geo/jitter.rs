//! Small random offsets applied to the search center so that waypoints vary
//! from run to run.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound (exclusive) of the offset magnitude, in degrees
pub const MAX_JITTER_DEGREES: f64 = 0.01;

/// Draw one offset: magnitude uniform over `[0, 0.01)`, sign uniform.
pub fn jitter_offset<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let magnitude = rng.random::<f64>() * MAX_JITTER_DEGREES;
    if rng.random_bool(0.5) {
        magnitude
    } else {
        -magnitude
    }
}

/// Source of jitter offsets. Each call is independent.
pub trait Jitter: Send + Sync {
    fn offset(&self) -> f64;
}

/// Thread-local entropy; the production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn offset(&self) -> f64 {
        jitter_offset(&mut rand::rng())
    }
}

/// Reproducible offsets from a fixed seed.
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Jitter for SeededJitter {
    fn offset(&self) -> f64 {
        jitter_offset(&mut *self.rng.lock())
    }
}

/// Always returns the same offset.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn offset(&self) -> f64 {
        self.0
    }
}
