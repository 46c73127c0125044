//         expected     expected+size
//            v            v
// ###########_#_##_______---------> sequence numbers
//
// #: received
// _: acceptable, not yet received
//
// Arrivals inside the window are marked in a ring of bits anchored at `expected`. Whenever the bit
// for `expected` is set, it is cleared and `expected` slides forward, so the reported position
// always names the first gap.

const HALF_SPACE: u32 = 1 << 31;

/// Result of marking one arrival.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arrival {
    /// Newly marked inside the window.
    Accepted,
    /// Below `expected`, or already marked.
    Duplicate,
    /// At or beyond `expected + size`; not recorded.
    BeyondWindow,
}

pub struct ReceiveWindow {
    expected: u32,
    size: u32,

    // Bit `(head + d) % size` marks sequence number `expected + d`
    bits: Box<[u64]>,
    head: u32,

    accepted_count: u64,
    duplicate_count: u64,
    beyond_window_count: u64,
}

impl ReceiveWindow {
    pub fn new(size: u32) -> Self {
        let size = size.max(1);
        let words = (size as usize + 63) / 64;

        Self {
            expected: 0,
            size,

            bits: vec![0; words].into_boxed_slice(),
            head: 0,

            accepted_count: 0,
            duplicate_count: 0,
            beyond_window_count: 0,
        }
    }

    /// Next in-order sequence number not yet received.
    pub fn expected(&self) -> u32 {
        self.expected
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted_count
    }

    pub fn duplicate_count(&self) -> u64 {
        self.duplicate_count
    }

    pub fn beyond_window_count(&self) -> u64 {
        self.beyond_window_count
    }

    fn slot(&self, delta: u32) -> (usize, u64) {
        let index = ((self.head as u64 + delta as u64) % self.size as u64) as usize;
        (index / 64, 1 << (index % 64))
    }

    fn is_marked(&self, delta: u32) -> bool {
        let (word, mask) = self.slot(delta);
        self.bits[word] & mask != 0
    }

    fn set_mark(&mut self, delta: u32, marked: bool) {
        let (word, mask) = self.slot(delta);
        if marked {
            self.bits[word] |= mask;
        } else {
            self.bits[word] &= !mask;
        }
    }

    /// Marks `seq` as received and advances `expected` past any contiguous run.
    pub fn mark(&mut self, seq: u32) -> Arrival {
        let delta = seq.wrapping_sub(self.expected);

        if delta >= self.size {
            if delta < HALF_SPACE {
                self.beyond_window_count += 1;
                return Arrival::BeyondWindow;
            } else {
                self.duplicate_count += 1;
                return Arrival::Duplicate;
            }
        }

        if self.is_marked(delta) {
            self.duplicate_count += 1;
            return Arrival::Duplicate;
        }

        self.set_mark(delta, true);
        self.accepted_count += 1;

        while self.is_marked(0) {
            self.set_mark(0, false);
            self.expected = self.expected.wrapping_add(1);
            self.head = (self.head + 1) % self.size;
        }

        Arrival::Accepted
    }

    /// Marks `seq` and returns the cumulative acknowledgment to report: the new `expected`.
    pub fn on_arrival(&mut self, seq: u32) -> u32 {
        self.mark(seq);
        self.expected
    }
}
