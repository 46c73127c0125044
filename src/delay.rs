use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of randomized delays used to pace a sender and to emulate processing jitter.
///
/// Sampling never sleeps; callers schedule against the returned duration (or call [`pause`] to
/// block outright).
pub struct DelayModel {
    rng: StdRng,
}

impl DelayModel {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Approximately exponential delay with the given mean, in milliseconds.
    ///
    /// Uniform draws are multiplied together until the product falls to e^-mean (the Poisson
    /// arrival construction); the final draw is then inverse-transformed.
    pub fn sample_exponential(&mut self, mean_ms: f64) -> Duration {
        if !(mean_ms > 0.0) {
            return Duration::ZERO;
        }

        let limit = (-mean_ms).exp();
        let mut product = 1.0;
        let mut draw;

        loop {
            draw = self.rng.gen::<f64>();
            product *= draw;

            if product <= limit {
                break;
            }
        }

        let delay_ms = -(1.0 - draw).ln() * mean_ms;

        // Saturates for means too large to represent
        Duration::try_from_secs_f64(delay_ms / 1000.0).unwrap_or(Duration::MAX)
    }

    /// Whole-millisecond delay drawn uniformly from `[0, max_ms]`.
    pub fn sample_uniform(&mut self, max_ms: u32) -> Duration {
        let delay_ms = self.rng.gen_range(0..=max_ms);

        Duration::from_millis(delay_ms as u64)
    }
}

impl Default for DelayModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocks the calling thread for `delay`.
pub fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_mean_is_plausible() {
        let mut model = DelayModel::seeded(7);

        let mean_ms = 10.0;
        let count = 10_000;

        let total_ms: f64 = (0..count)
            .map(|_| model.sample_exponential(mean_ms).as_secs_f64() * 1000.0)
            .sum();

        let avg_ms = total_ms / count as f64;

        assert!(avg_ms > mean_ms * 0.05, "average too small: {avg_ms}");
        assert!(avg_ms < mean_ms * 2.0, "average too large: {avg_ms}");
    }

    #[test]
    fn non_positive_mean_is_immediate() {
        let mut model = DelayModel::seeded(1);

        assert_eq!(model.sample_exponential(0.0), Duration::ZERO);
        assert_eq!(model.sample_exponential(-3.0), Duration::ZERO);
        assert_eq!(model.sample_exponential(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn huge_mean_saturates() {
        let mut model = DelayModel::seeded(1);

        assert_eq!(model.sample_exponential(f64::INFINITY), Duration::MAX);
        assert!(model.sample_exponential(1e30) > Duration::from_secs(3600));
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut model = DelayModel::seeded(3);

        let mut seen_max = false;

        for _ in 0..1000 {
            let delay = model.sample_uniform(5);
            assert!(delay <= Duration::from_millis(5));
            seen_max |= delay == Duration::from_millis(5);
        }

        assert!(seen_max);
        assert_eq!(model.sample_uniform(0), Duration::ZERO);
    }

    #[test]
    fn seeded_models_agree() {
        let mut a = DelayModel::seeded(42);
        let mut b = DelayModel::seeded(42);

        for _ in 0..100 {
            assert_eq!(a.sample_exponential(4.0), b.sample_exponential(4.0));
            assert_eq!(a.sample_uniform(15), b.sample_uniform(15));
        }
    }
}
