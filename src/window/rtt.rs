// Exponentially weighted round-trip estimate, in milliseconds:
//
//   avg <- (1 - ALPHA) * avg + ALPHA * rtt
//   dev <- (1 - BETA)  * dev + BETA  * |rtt - avg|     (avg already updated)
//   rto  = avg + 4 * dev
//
// Note that ALPHA and BETA weight the *new* sample.

const ALPHA: f64 = 0.875;
const BETA: f64 = 0.75;
const DEVIATION_FACTOR: f64 = 4.0;

#[derive(Clone, Debug, Default)]
pub struct RttEstimator {
    avg_rtt_ms: f64,
    avg_deviation_ms: f64,
    sample_count: u64,
}

impl RttEstimator {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn sample(&mut self, rtt_ms: f64) {
        if self.sample_count == 0 {
            self.avg_rtt_ms = rtt_ms;
            self.avg_deviation_ms = rtt_ms;
        } else {
            self.avg_rtt_ms = (1.0 - ALPHA) * self.avg_rtt_ms + ALPHA * rtt_ms;
            self.avg_deviation_ms =
                (1.0 - BETA) * self.avg_deviation_ms + BETA * (rtt_ms - self.avg_rtt_ms).abs();
        }

        self.sample_count += 1;
    }

    /// Retransmission timeout in milliseconds, or `None` before the first sample.
    pub fn timeout(&self) -> Option<f64> {
        if self.sample_count == 0 {
            return None;
        }

        Some(self.avg_rtt_ms + DEVIATION_FACTOR * self.avg_deviation_ms)
    }

    pub fn avg_rtt(&self) -> Option<f64> {
        (self.sample_count > 0).then_some(self.avg_rtt_ms)
    }

    pub fn avg_deviation(&self) -> Option<f64> {
        (self.sample_count > 0).then_some(self.avg_deviation_ms)
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }
}
