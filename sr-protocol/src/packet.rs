//! Packet value type
//!
//! Data packets and acknowledgments share one shape. The channel model may
//! flip `corrupted`; the engines never look at the payload of a corrupted
//! packet.

use crate::sequence::SeqNumber;
use bytes::Bytes;

/// Payload carried by every acknowledgment
pub const ACK_PAYLOAD: &[u8] = b"ACK";

/// A packet on the unreliable channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Sequence number (data) or acknowledged sequence number (ACK)
    pub seq_num: SeqNumber,
    /// Application payload, shared on retransmission
    pub payload: Bytes,
    /// Nominal length in bits (not used for correctness)
    pub length: usize,
    /// Set by the channel when the packet was damaged in transit
    pub corrupted: bool,
}

impl Packet {
    /// Create a data packet
    pub fn data(seq_num: SeqNumber, payload: Bytes, length: usize) -> Self {
        Packet {
            seq_num,
            payload,
            length,
            corrupted: false,
        }
    }

    /// Create an acknowledgment for `seq_num`
    pub fn ack(seq_num: SeqNumber, length: usize) -> Self {
        Packet {
            seq_num,
            payload: Bytes::from_static(ACK_PAYLOAD),
            length,
            corrupted: false,
        }
    }

    /// Copy of this packet with the corruption flag set
    pub fn corrupt(mut self) -> Self {
        self.corrupted = true;
        self
    }
}
