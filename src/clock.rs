use std::time;

const MICROS_PER_SEC: u64 = 1_000_000;

/// Wall-clock time with microsecond resolution, as carried in a packet's origin timestamp.
///
/// Timestamps are stamped by a sender and echoed unchanged by the receiver, so only the
/// sender's own clock is ever compared against them when computing round-trip times.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Timestamp {
    pub sec: u32,
    pub usec: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        let since_epoch = time::SystemTime::now()
            .duration_since(time::UNIX_EPOCH)
            .unwrap_or_default();

        Self {
            sec: since_epoch.as_secs() as u32,
            usec: since_epoch.subsec_micros(),
        }
    }

    pub fn from_micros(micros: u64) -> Self {
        Self {
            sec: (micros / MICROS_PER_SEC) as u32,
            usec: (micros % MICROS_PER_SEC) as u32,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::from_micros(millis.saturating_mul(1000))
    }

    pub fn as_micros(&self) -> u64 {
        self.sec as u64 * MICROS_PER_SEC + self.usec as u64
    }

    /// Signed number of milliseconds from `earlier` to `self`.
    pub fn millis_since(&self, earlier: Timestamp) -> f64 {
        (self.as_micros() as f64 - earlier.as_micros() as f64) / 1000.0
    }

    pub fn add_millis(&self, millis: f64) -> Self {
        let micros = (millis.max(0.0) * 1000.0) as u64;
        Self::from_micros(self.as_micros().saturating_add(micros))
    }

    /// Time remaining until `deadline`, or zero if it has already passed.
    pub fn until(&self, deadline: Timestamp) -> time::Duration {
        let micros = deadline.as_micros().saturating_sub(self.as_micros());
        time::Duration::from_micros(micros)
    }
}
