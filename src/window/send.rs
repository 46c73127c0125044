//            base    next    base+size
//            v       v       v
// -----------########________--------> sequence numbers
//
// #: in transit (unacknowledged)
// _: sendable
//
// Go-Back-N: the receiver reports only the next sequence number it expects. An acknowledgment
// equal to `next` covers everything sent so far; anything else is a loss/reorder signal. When the
// signal arrives after the progress timer has expired, or names a sequence number outside the
// window, the sender rewinds to the receiver's position and resends from there.
//
// Two clocks are kept. The progress timer starts when the window goes from empty to non-empty and
// restarts on every forward acknowledgment and every rewind. The transmission clock records the
// last departure; a full window that outlives it by one timeout steps `next` back by one.

use crate::clock::Timestamp;
use crate::error::{Error, Result};
use crate::packet::Packet;

use super::{Aimd, RttEstimator, Window, WINDOW_SIZE_MAX, WINDOW_SIZE_MIN};

const HALF_SPACE: u32 = 1 << 31;

#[derive(Clone, Debug)]
pub struct Config {
    pub sender_id: u32,
    pub receiver_id: u32,
    /// Window size at session start.
    pub window_size: u32,
    pub window_size_min: u32,
    pub window_size_max: u32,
    /// Adjust the window with additive increase / multiplicative decrease.
    pub aimd: bool,
    /// Retransmission timeout used until the first round-trip sample exists.
    pub initial_timeout_ms: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sender_id: 1,
            receiver_id: 1,
            window_size: 32,
            window_size_min: WINDOW_SIZE_MIN,
            window_size_max: WINDOW_SIZE_MAX,
            aimd: false,
            initial_timeout_ms: 1000.0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(Error::Config("window size must be nonzero"));
        }
        if self.window_size_min == 0 {
            return Err(Error::Config("minimum window size must be nonzero"));
        }
        if self.window_size_min > self.window_size_max {
            return Err(Error::Config("minimum window size exceeds maximum"));
        }
        if self.window_size < self.window_size_min || self.window_size > self.window_size_max {
            return Err(Error::Config("window size outside its bounds"));
        }
        if !(self.initial_timeout_ms > 0.0) {
            return Err(Error::Config("initial timeout must be positive"));
        }
        if self.sender_id == 0 || self.receiver_id == 0 {
            return Err(Error::Config("role ids start at 1"));
        }
        Ok(())
    }
}

/// How an acknowledgment moved the window.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AckOutcome {
    /// Everything sent so far is acknowledged; the window slid forward and may have grown.
    Advanced,
    /// The receiver is still expecting an older unit; the window may have shrunk.
    Stale,
    /// Timer expiry or an out-of-window acknowledgment: `base` and `next` were reset to the
    /// acknowledged position and the timer restarted.
    GoBack,
}

pub struct SendWindow {
    sender_id: u32,
    receiver_id: u32,

    base_id: u32,
    next_id: u32,
    // One past the highest sequence number ever sent
    sent_end_id: u32,

    cc: Aimd,
    rtt: RttEstimator,
    initial_timeout_ms: f64,

    // Progress timer
    timer_start: Option<Timestamp>,
    // Time of the last transmission
    last_tx: Option<Timestamp>,

    retransmit_count: u64,
}

impl SendWindow {
    pub fn new(config: &Config) -> Self {
        Self {
            sender_id: config.sender_id,
            receiver_id: config.receiver_id,

            base_id: 0,
            next_id: 0,
            sent_end_id: 0,

            cc: Aimd::with_bounds(
                config.aimd,
                config.window_size,
                config.window_size_min,
                config.window_size_max,
            ),
            rtt: RttEstimator::new(),
            initial_timeout_ms: config.initial_timeout_ms,

            timer_start: None,
            last_tx: None,

            retransmit_count: 0,
        }
    }

    pub fn base_id(&self) -> u32 {
        self.base_id
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn size(&self) -> u32 {
        self.cc.size()
    }

    pub fn in_flight(&self) -> u32 {
        self.next_id.wrapping_sub(self.base_id)
    }

    pub fn rtt(&self) -> &RttEstimator {
        &self.rtt
    }

    pub fn retransmit_count(&self) -> u64 {
        self.retransmit_count
    }

    /// Current retransmission timeout in milliseconds.
    pub fn timeout_ms(&self) -> f64 {
        self.rtt.timeout().unwrap_or(self.initial_timeout_ms)
    }

    pub fn can_send(&self) -> bool {
        self.in_flight() < self.size()
    }

    fn window(&self) -> Window {
        Window::new(self.base_id, self.size())
    }

    fn elapsed_ms(start: Option<Timestamp>, now: Timestamp) -> f64 {
        match start {
            Some(start) => now.millis_since(start),
            None => 0.0,
        }
    }

    /// Emits the unit with sequence number `next` if the window has room.
    pub fn try_send(&mut self, now: Timestamp) -> Option<Packet> {
        if !self.can_send() {
            return None;
        }

        let seq = self.next_id;

        if seq.wrapping_sub(self.sent_end_id) >= HALF_SPACE {
            self.retransmit_count += 1;
        } else {
            self.sent_end_id = seq.wrapping_add(1);
        }

        if self.in_flight() == 0 {
            self.timer_start = Some(now);
        }

        self.next_id = seq.wrapping_add(1);
        self.last_tx = Some(now);

        Some(Packet::new(seq, now, self.sender_id, self.receiver_id))
    }

    /// Time at which [`SendWindow::poll_timeout`] will fire if no acknowledgment arrives, if the
    /// window is currently blocked.
    pub fn deadline(&self) -> Option<Timestamp> {
        if self.can_send() || self.in_flight() == 0 {
            return None;
        }

        self.last_tx
            .map(|last_tx| last_tx.add_millis(self.timeout_ms()))
    }

    /// Checks the retransmission timer while the window is full. On expiry, steps `next` back by
    /// one so that the following [`SendWindow::try_send`] resends that unit. Returns true if the
    /// timer fired.
    pub fn poll_timeout(&mut self, now: Timestamp) -> bool {
        if self.can_send() || self.in_flight() == 0 {
            return false;
        }

        if Self::elapsed_ms(self.last_tx, now) < self.timeout_ms() {
            return false;
        }

        self.next_id = self.next_id.wrapping_sub(1);

        true
    }

    /// Feeds one acknowledgment: samples the round trip, then steers the window.
    pub fn on_ack(&mut self, ack: &Packet, now: Timestamp) -> AckOutcome {
        self.sample_rtt(ack, now);
        self.steer(ack.seq, now)
    }

    /// Feeds a batch of acknowledgments drained from the socket. Every acknowledgment contributes
    /// a round-trip sample; the window is steered by the most recent one only.
    pub fn on_acks(&mut self, acks: &[Packet], now: Timestamp) -> Option<AckOutcome> {
        for ack in acks.iter() {
            self.sample_rtt(ack, now);
        }

        acks.last().map(|ack| self.steer(ack.seq, now))
    }

    fn sample_rtt(&mut self, ack: &Packet, now: Timestamp) {
        let rtt_ms = now.millis_since(ack.timestamp).max(0.0);
        self.rtt.sample(rtt_ms);
    }

    fn steer(&mut self, next_expected: u32, now: Timestamp) -> AckOutcome {
        if next_expected == self.next_id {
            self.base_id = next_expected;
            self.timer_start = Some(now);
            self.cc.handle_ack();

            return AckOutcome::Advanced;
        }

        self.cc.handle_drop();

        let timed_out = Self::elapsed_ms(self.timer_start, now) >= self.timeout_ms();
        let outside_window = !self.window().contains(next_expected);

        if timed_out || outside_window {
            // Never slide backwards over units the receiver has already consumed
            if next_expected.wrapping_sub(self.base_id) < HALF_SPACE {
                self.base_id = next_expected;
            }
            self.next_id = self.base_id;
            self.timer_start = Some(now);

            return AckOutcome::GoBack;
        }

        // A shrunken window may now end before `next`; pull it back so the unsent tail is
        // (re)sent once the window reopens.
        if self.in_flight() > self.size() {
            self.next_id = self.window().end_id();
        }

        AckOutcome::Stale
    }
}
