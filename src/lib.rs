/*

Go-Back-N over UDP, through a bottleneck.

Three roles cooperate. Senders push sequenced 128-byte units at the router. The router holds them
in bounded drop-tail queues, one per destination (or one shared), and forwards one unit per service
interval, always from the lowest-numbered non-empty queue. Receivers track arrivals in a small
bitmap and answer every unit with a cumulative acknowledgment, sent directly back to the sender.

# Wire record

  offset  size  field
       0     4  seq             (next expected, in an acknowledgment)
       4     4  timestamp_sec
       8     4  timestamp_usec
      12     4  sender_id
      16     4  receiver_id
      20   108  payload

All integers are big-endian. Anything that is not exactly 128 bytes is discarded.

# Sender window

The sender may have `size` units in flight, `[base, base + size)`. An acknowledgment equal to
`next` covers everything sent, so `base` jumps to it and, under AIMD:

  size <- min(size + 1, 128)

Any other acknowledgment means the receiver is still waiting on something older:

  size <- max(size / 2, 1)

If that acknowledgment also arrives after the retransmission timeout has passed, or names a
sequence number outside the window, the sender goes back to it and resends from there.

If the window stays full past the timeout with no acknowledgment at all, `next` steps back by one
and that unit is sent again.

# Round-trip estimate

Every acknowledgment echoes the timestamp of the unit that triggered it, giving one sample:

  avg <- 0.125 * avg + 0.875 * rtt
  dev <- 0.25  * dev + 0.75  * |rtt - avg|
  rto  = avg + 4 * dev

Until the first sample, a configured initial timeout is used.

# Receiver window

  v expected
  _ # _ # # _ _ _   (window of 8)

An arrival at `expected + d`, `d < size`, sets bit `d`. While the bit at `expected` is set it is
cleared and `expected` advances. Arrivals below `expected` change nothing; arrivals at or beyond
`expected + size` are acknowledged but not recorded.

# Router

  enqueue:  full ? drop : push
  tick:     for q in queues: if !q.empty { record len; forward q.pop; break }

Average occupancy is the mean of the pre-dequeue lengths over every tick that forwarded a unit.

*/

pub mod addr;
mod clock;
mod delay;
mod error;
mod packet;
pub mod receiver;
pub mod router;
pub mod sender;
mod socket;
pub mod window;

pub use clock::Timestamp;
pub use delay::{pause, DelayModel};
pub use error::{Error, Result};
pub use packet::{Packet, PAYLOAD_SIZE, RECORD_SIZE};

pub type Receiver = receiver::Receiver;
pub type Router = router::Router;
pub type Sender = sender::Sender;
