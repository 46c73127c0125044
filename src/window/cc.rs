// Additive increase / multiplicative decrease of the sender window, in whole units:
//
//   forward progress:  size <- min(size + 1, max)
//   loss / reorder:    size <- max(size / 2, min)
//
// With AIMD disabled the window stays at its configured size.

use super::{WINDOW_SIZE_MAX, WINDOW_SIZE_MIN};

#[derive(Clone, Debug)]
pub struct Aimd {
    enabled: bool,
    size: u32,
    size_min: u32,
    size_max: u32,
}

impl Aimd {
    pub fn new(enabled: bool, initial_size: u32) -> Self {
        Self::with_bounds(enabled, initial_size, WINDOW_SIZE_MIN, WINDOW_SIZE_MAX)
    }

    pub fn with_bounds(enabled: bool, initial_size: u32, size_min: u32, size_max: u32) -> Self {
        debug_assert!(size_min >= 1 && size_min <= size_max);

        Self {
            enabled,
            size: initial_size.clamp(size_min, size_max),
            size_min,
            size_max,
        }
    }

    pub fn handle_ack(&mut self) {
        if self.enabled {
            self.size = self.size.saturating_add(1).min(self.size_max);
        }
    }

    pub fn handle_drop(&mut self) {
        if self.enabled {
            self.size = (self.size / 2).max(self.size_min);
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}
