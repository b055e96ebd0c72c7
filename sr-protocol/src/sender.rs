//! Selective Repeat send-side state machine
//!
//! [`SenderEngine`] keeps up to `N` packets in flight. Each one is
//! acknowledged and retransmitted individually; the window only slides over
//! a contiguous prefix of acknowledged packets.
//!
//! # Sequence-number layout
//!
//! ```text
//!   base                 next_seq          base+N
//!     │                     │                 │
//!  ───┼─────────────────────┼─────────────────┼───▶ seq space (mod K)
//!     │ <── in flight ────▶ │ <── usable ───▶ │
//! ```
//!
//! Every number in `[base, next_seq)` has a [`PacketRecord`]. A record is
//! dropped only when `base` moves past it.

use crate::config::{ConfigError, ProtocolConfig};
use crate::interface::{Channel, TimerHandle, TimerScheduler};
use crate::packet::Packet;
use crate::sequence::{SeqNumber, SequenceSpace};
use crate::stats::SenderStats;
use crate::time::SimTime;
use crate::timer::TimerTable;
use bytes::Bytes;
use std::collections::VecDeque;

/// A packet awaiting acknowledgment
#[derive(Debug, Clone)]
pub struct PacketRecord {
    /// Packet exactly as first sent; retransmissions reuse it
    pub packet: Packet,
    /// Time of the most recent transmission
    pub sent_at: SimTime,
    /// Number of transmissions so far
    pub tx_count: u32,
    /// Whether an intact ACK has arrived
    pub acked: bool,
}

/// Result of [`SenderEngine::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Payload sent under this sequence number
    Accepted(SeqNumber),
    /// Window full; retry after an ACK frees a slot
    Rejected,
}

impl SubmitOutcome {
    /// True for [`SubmitOutcome::Accepted`]
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }
}

/// Result of [`SenderEngine::on_ack`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Corrupted ACK dropped
    Corrupted,
    /// ACK accepted; the window base moved forward by `advanced`
    Accepted { advanced: u32 },
    /// ACK for a number that is not outstanding; ignored
    Stale,
}

/// Selective Repeat sender
pub struct SenderEngine<C, S> {
    config: ProtocolConfig,
    space: SequenceSpace,
    /// Oldest unacknowledged sequence number (left window edge)
    base: SeqNumber,
    /// Sequence number for the next new packet
    next_seq: SeqNumber,
    /// Records for `[base, next_seq)`, front is `base`
    records: VecDeque<PacketRecord>,
    timers: TimerTable<S>,
    channel: C,
    stats: SenderStats,
}

impl<C: Channel, S: TimerScheduler> SenderEngine<C, S> {
    /// Create a sender after validating `config`
    pub fn new(config: ProtocolConfig, channel: C, scheduler: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let initial = config.initial_seq();
        Ok(SenderEngine {
            config,
            space: config.space(),
            base: initial,
            next_seq: initial,
            records: VecDeque::with_capacity(config.window_size as usize),
            timers: TimerTable::new(scheduler, config.timeout_ticks),
            channel,
            stats: SenderStats::default(),
        })
    }

    /// Offer a payload from the application
    ///
    /// Rejection is backpressure, not an error: the caller keeps the payload
    /// and tries again later.
    pub fn submit(&mut self, payload: impl Into<Bytes>) -> SubmitOutcome {
        let seq = self.next_seq;
        let now = self.timers.now();

        if !self.space.in_window(seq, self.base, self.config.window_size) {
            self.stats.rejected_submissions += 1;
            tracing::debug!(%now, seq = %seq, base = %self.base, "window full; data refused");
            return SubmitOutcome::Rejected;
        }

        let packet = Packet::data(seq, payload.into(), self.config.data_packet_length);
        self.records.push_back(PacketRecord {
            packet: packet.clone(),
            sent_at: now,
            tx_count: 1,
            acked: false,
        });

        tracing::debug!(%now, seq = %seq, "sending new packet");
        self.channel.send(packet);
        self.stats.packets_sent += 1;
        self.timers.start(seq);
        self.next_seq = self.space.next(seq);

        SubmitOutcome::Accepted(seq)
    }

    /// Process an ACK from the channel
    pub fn on_ack(&mut self, ack: &Packet) -> AckOutcome {
        let now = self.timers.now();
        let seq = ack.seq_num;

        if ack.corrupted {
            self.stats.corrupted_acks += 1;
            tracing::debug!(%now, seq = %seq, "corrupted ACK dropped");
            return AckOutcome::Corrupted;
        }

        let Some(idx) = self.index_of(seq) else {
            self.stats.stale_acks += 1;
            tracing::info!(%now, seq = %seq, base = %self.base, "ACK outside the current window; ignored");
            return AckOutcome::Stale;
        };

        if self.records[idx].acked {
            self.stats.stale_acks += 1;
            tracing::info!(%now, seq = %seq, "duplicate ACK; ignored");
            return AckOutcome::Stale;
        }

        self.records[idx].acked = true;
        self.stats.acks_received += 1;
        tracing::debug!(%now, seq = %seq, "got ACK");
        self.timers.stop(seq);

        let mut advanced = 0;
        while self.records.front().is_some_and(|r| r.acked) {
            self.records.pop_front();
            self.base = self.space.next(self.base);
            advanced += 1;
        }
        if advanced > 0 {
            tracing::debug!(%now, base = %self.base, next_seq = %self.next_seq, "window slid");
        }

        AckOutcome::Accepted { advanced }
    }

    /// Host callback for an expired timer
    ///
    /// Returns true when the packet was retransmitted. Stale callbacks are
    /// ignored.
    pub fn on_timer_expired(&mut self, seq: SeqNumber, handle: TimerHandle) -> bool {
        if !self.timers.fire(seq, handle) {
            return false;
        }
        self.on_timeout(seq)
    }

    /// Timeout handling for `seq`
    ///
    /// Retransmits the stored packet if it is still outstanding, then
    /// replaces the fired timer with a fresh one. Hosts should enter through
    /// [`SenderEngine::on_timer_expired`] so the timer transitions are kept.
    pub fn on_timeout(&mut self, seq: SeqNumber) -> bool {
        let now = self.timers.now();
        let outstanding = self.index_of(seq).filter(|&idx| !self.records[idx].acked);

        let Some(idx) = outstanding else {
            self.timers.finish(seq);
            tracing::debug!(%now, seq = %seq, "timeout for a packet no longer outstanding");
            return false;
        };

        let record = &mut self.records[idx];
        record.sent_at = now;
        record.tx_count += 1;
        let packet = record.packet.clone();

        tracing::debug!(%now, seq = %seq, tx_count = record.tx_count, "timeout; retransmitting");
        self.channel.send(packet);
        self.stats.packets_sent += 1;
        self.stats.retransmissions += 1;

        self.timers.finish(seq);
        self.timers.start(seq);
        true
    }

    /// Position of `seq` in the record buffer, if it is in flight
    fn index_of(&self, seq: SeqNumber) -> Option<usize> {
        let offset = self.space.offset(self.base, seq) as usize;
        (offset < self.records.len()).then_some(offset)
    }

    /// Left window edge
    pub fn base(&self) -> SeqNumber {
        self.base
    }

    /// Sequence number the next accepted payload will get
    pub fn next_seq(&self) -> SeqNumber {
        self.next_seq
    }

    /// Packets in `[base, next_seq)`, acknowledged or not
    pub fn in_flight(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is awaiting acknowledgment
    pub fn is_idle(&self) -> bool {
        self.records.is_empty()
    }

    /// True when `submit` would be accepted
    pub fn can_submit(&self) -> bool {
        self.space
            .in_window(self.next_seq, self.base, self.config.window_size)
    }

    /// Whether `seq` is in flight and acknowledged
    pub fn is_acked(&self, seq: SeqNumber) -> bool {
        self.index_of(seq).is_some_and(|idx| self.records[idx].acked)
    }

    /// Record for an in-flight `seq`
    pub fn record(&self, seq: SeqNumber) -> Option<&PacketRecord> {
        self.index_of(seq).map(|idx| &self.records[idx])
    }

    /// Sequence numbers of the current window
    pub fn window(&self) -> Vec<SeqNumber> {
        self.space.window(self.base, self.config.window_size).collect()
    }

    /// Counters
    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    /// Configuration in use
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Timer table
    pub fn timers(&self) -> &TimerTable<S> {
        &self.timers
    }

    /// Timer table, mutably (tests reach the scheduler through this)
    pub fn timers_mut(&mut self) -> &mut TimerTable<S> {
        &mut self.timers
    }

    /// Channel towards the receiver
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Channel towards the receiver, mutably
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}
