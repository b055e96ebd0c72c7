//! Selective Repeat receive-side state machine
//!
//! [`ReceiverEngine`] acknowledges every intact packet individually, buffers
//! anything that lands inside the receive window, and hands the contiguous
//! run starting at `base` to the application as soon as it is complete.
//!
//! The buffer is a ring of `N_recv` slots whose front is always `base`, so a
//! stored key can never fall outside the window.
//!
//! The engine has no clock. Hosts that want timestamps on its log lines
//! enter a span carrying the time before calling in; the simulator opens one
//! per dispatched event.

use crate::config::{ConfigError, ProtocolConfig};
use crate::interface::{Application, Channel};
use crate::packet::Packet;
use crate::sequence::{SeqNumber, SequenceSpace};
use crate::stats::ReceiverStats;
use std::collections::VecDeque;

/// Result of [`ReceiverEngine::on_packet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Corrupted packet dropped without an ACK
    Corrupted,
    /// Packet stored; `delivered` payloads went to the application
    Accepted { delivered: usize },
    /// Packet outside the window (already delivered); ACKed, not stored
    Duplicate,
}

/// Selective Repeat receiver
pub struct ReceiverEngine<C, A> {
    config: ProtocolConfig,
    space: SequenceSpace,
    /// Next sequence number to deliver
    base: SeqNumber,
    /// Slot `i` holds `base + i`
    slots: VecDeque<Option<Packet>>,
    channel: C,
    app: A,
    stats: ReceiverStats,
}

impl<C: Channel, A: Application> ReceiverEngine<C, A> {
    /// Create a receiver after validating `config`
    pub fn new(config: ProtocolConfig, channel: C, app: A) -> Result<Self, ConfigError> {
        config.validate()?;
        let window = config.receive_window as usize;
        Ok(ReceiverEngine {
            config,
            space: config.space(),
            base: config.initial_seq(),
            slots: std::iter::repeat_with(|| None).take(window).collect(),
            channel,
            app,
            stats: ReceiverStats::default(),
        })
    }

    /// Process a packet from the channel
    pub fn on_packet(&mut self, packet: Packet) -> ReceiveOutcome {
        let seq = packet.seq_num;

        if packet.corrupted {
            self.stats.corrupted_packets += 1;
            tracing::debug!(seq = %seq, "corrupted packet dropped");
            return ReceiveOutcome::Corrupted;
        }

        self.channel
            .send(Packet::ack(seq, self.config.ack_packet_length));
        self.stats.acks_sent += 1;
        tracing::debug!(seq = %seq, "sent ACK");

        if !self
            .space
            .in_window(seq, self.base, self.config.receive_window)
        {
            self.stats.duplicate_packets += 1;
            tracing::debug!(seq = %seq, base = %self.base, "packet outside receive window");
            return ReceiveOutcome::Duplicate;
        }

        let offset = self.space.offset(self.base, seq) as usize;
        let slot = &mut self.slots[offset];
        if slot.is_none() && offset > 0 {
            self.stats.buffered_out_of_order += 1;
            tracing::debug!(seq = %seq, base = %self.base, "buffered out of order");
        }
        *slot = Some(packet);

        let delivered = self.deliver_in_order();
        ReceiveOutcome::Accepted { delivered }
    }

    /// Deliver the contiguous run at `base` and slide the window over it
    fn deliver_in_order(&mut self) -> usize {
        let mut delivered = 0;
        while self.slots.front().is_some_and(Option::is_some) {
            let Some(Some(packet)) = self.slots.pop_front() else {
                break;
            };
            self.slots.push_back(None);

            tracing::debug!(seq = %packet.seq_num, "delivering payload");
            self.app.deliver(packet.payload);
            self.base = self.space.next(self.base);
            self.stats.delivered += 1;
            delivered += 1;
        }
        delivered
    }

    /// Next sequence number to deliver
    pub fn base(&self) -> SeqNumber {
        self.base
    }

    /// Sequence numbers currently held in the buffer, in window order
    pub fn buffered(&self) -> Vec<SeqNumber> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| self.space.add(self.base, i as u32))
            .collect()
    }

    /// Whether `seq` is waiting in the buffer
    pub fn is_buffered(&self, seq: SeqNumber) -> bool {
        let offset = self.space.offset(self.base, seq) as usize;
        self.slots.get(offset).is_some_and(Option::is_some)
    }

    /// Sequence numbers of the current receive window
    pub fn window(&self) -> Vec<SeqNumber> {
        self.space
            .window(self.base, self.config.receive_window)
            .collect()
    }

    /// Counters
    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Configuration in use
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Channel towards the sender
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Channel towards the sender, mutably
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Receiving application
    pub fn app(&self) -> &A {
        &self.app
    }

    /// Receiving application, mutably
    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }
}
