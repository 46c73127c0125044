mod cc;
mod recv;
mod rtt;
mod send;

pub use cc::Aimd;
pub use recv::{Arrival, ReceiveWindow};
pub use rtt::RttEstimator;
pub use send::{AckOutcome, Config as SendWindowConfig, SendWindow};

pub const WINDOW_SIZE_MIN: u32 = 1;
pub const WINDOW_SIZE_MAX: u32 = 128;

/// A range of sequence numbers `[base_id, base_id + size)`, compared with wrapping arithmetic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Window {
    pub base_id: u32,
    pub size: u32,
}

impl Window {
    pub fn new(base_id: u32, size: u32) -> Self {
        Self { base_id, size }
    }

    pub fn contains(&self, id: u32) -> bool {
        let delta = id.wrapping_sub(self.base_id);
        delta < self.size
    }

    /// One past the last sequence number in the window.
    pub fn end_id(&self) -> u32 {
        self.base_id.wrapping_add(self.size)
    }
}
