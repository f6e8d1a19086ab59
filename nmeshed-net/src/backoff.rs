// Capped exponential backoff with jitter:
// delay = min(base * 2^attempt, max) * (1 + jitter), jitter in [-spread, spread].

use rand::Rng;

pub const DEFAULT_SPREAD: f64 = 0.1;

/// Injected source of a uniform [0,1) sample, so backoff delay is
/// deterministic under test without needing a real RNG.
pub trait JitterSource {
    fn unit_sample(&self) -> f64;
}

pub struct RandJitter;

impl JitterSource for RandJitter {
    fn unit_sample(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn unit_sample(&self) -> f64 {
        self.0
    }
}

pub fn compute_backoff_ms(attempt: u32, base_ms: u64, max_ms: u64, jitter: &dyn JitterSource) -> u64 {
    let raw = (base_ms as f64) * 2f64.powi(attempt as i32);
    let capped = raw.min(max_ms as f64);
    let spread_factor = 1.0 + DEFAULT_SPREAD * (2.0 * jitter.unit_sample() - 1.0);
    (capped * spread_factor).max(0.0) as u64
}
