//! Engine counters
//!
//! Counters never influence protocol decisions; they exist so callers and
//! tests can observe drops, duplicates and retransmissions.

/// Sender-side statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Packets handed to the channel, retransmissions included
    pub packets_sent: u64,
    /// Timeout-driven retransmissions
    pub retransmissions: u64,
    /// Intact ACKs for a buffered packet
    pub acks_received: u64,
    /// ACKs dropped because they arrived corrupted
    pub corrupted_acks: u64,
    /// ACKs for sequence numbers not currently buffered
    pub stale_acks: u64,
    /// `submit` calls refused because the window was full
    pub rejected_submissions: u64,
}

/// Receiver-side statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// ACKs handed to the channel
    pub acks_sent: u64,
    /// Payloads delivered to the application
    pub delivered: u64,
    /// Packets stored while an earlier number was still missing
    pub buffered_out_of_order: u64,
    /// Packets dropped because they arrived corrupted
    pub corrupted_packets: u64,
    /// Intact packets outside the receive window (already delivered)
    pub duplicate_packets: u64,
}
