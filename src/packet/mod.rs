pub mod serial;

use crate::clock::Timestamp;
use crate::error::{Error, Result};

use serial::{BlockSerial, Reader, Serial, Writer};

pub const PAYLOAD_SIZE: usize = 108;
pub const RECORD_SIZE: usize = 4 * 5 + PAYLOAD_SIZE;

/// The only record exchanged between roles.
///
/// Data units and acknowledgments share this shape. An acknowledgment is recognized by where it
/// arrives (a sender's listening address) and carries the receiver's next expected sequence number
/// in `seq`, together with the timestamp of the unit that triggered it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Packet {
    pub seq: u32,
    pub timestamp: Timestamp,
    pub sender_id: u32,
    pub receiver_id: u32,
    pub payload: [u8; PAYLOAD_SIZE],
}

impl Packet {
    pub fn new(seq: u32, timestamp: Timestamp, sender_id: u32, receiver_id: u32) -> Self {
        Self {
            seq,
            timestamp,
            sender_id,
            receiver_id,
            payload: [0; PAYLOAD_SIZE],
        }
    }

    /// Builds the cumulative acknowledgment for this unit: same ids and origin timestamp, with
    /// `next_expected` in place of the sequence number.
    pub fn ack(&self, next_expected: u32) -> Self {
        Self {
            seq: next_expected,
            ..self.clone()
        }
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buffer = [0; RECORD_SIZE];
        let written = <Self as Serial>::write(&mut buffer, self);
        debug_assert_eq!(written, Some(RECORD_SIZE));
        buffer
    }

    /// Decodes a datagram. Anything other than exactly one record is rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(Error::RecordLength { found: bytes.len() });
        }

        <Self as Serial>::read(bytes)
            .map(|(packet, _)| packet)
            .ok_or(Error::RecordLength { found: bytes.len() })
    }
}

impl BlockSerial for Packet {
    const SIZE: usize = RECORD_SIZE;

    fn read(rd: &mut Reader) -> Self {
        let seq = rd.read_u32();
        let sec = rd.read_u32();
        let usec = rd.read_u32();
        let sender_id = rd.read_u32();
        let receiver_id = rd.read_u32();

        let mut payload = [0; PAYLOAD_SIZE];
        rd.read_into(&mut payload);

        Self {
            seq,
            timestamp: Timestamp { sec, usec },
            sender_id,
            receiver_id,
            payload,
        }
    }

    fn write(wr: &mut Writer, obj: &Self) {
        wr.write_u32(obj.seq);
        wr.write_u32(obj.timestamp.sec);
        wr.write_u32(obj.timestamp.usec);
        wr.write_u32(obj.sender_id);
        wr.write_u32(obj.receiver_id);
        wr.write_slice(&obj.payload);
    }
}
