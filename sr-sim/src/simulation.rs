//! Simulation driver
//!
//! Wires a [`SenderEngine`] and a [`ReceiverEngine`] to two lossy channel
//! directions, an application source and sink, and one shared event queue,
//! then runs events in time order until the transfer completes or the time
//! limit is hit.

use crate::app::{MessageSink, MessageSource};
use crate::channel::{ChannelModel, ChannelStats, Direction, LossyChannel};
use crate::scheduler::{Dispatched, Event, SchedulerHandle};
use crate::SimError;
use sr_protocol::{
    AckOutcome, ProtocolConfig, ReceiverEngine, ReceiverStats, SenderEngine, SenderStats, SimTime,
};

/// Sender as wired by the simulator
pub type SimSender = SenderEngine<LossyChannel, SchedulerHandle>;

/// Receiver as wired by the simulator
pub type SimReceiver = ReceiverEngine<LossyChannel, MessageSink>;

/// Everything a run needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Protocol parameters
    pub protocol: ProtocolConfig,
    /// Fault model for data packets
    pub data_channel: ChannelModel,
    /// Fault model for ACKs
    pub ack_channel: ChannelModel,
    /// Messages the source produces
    pub messages: u64,
    /// Ticks between application ticks
    pub send_interval: u64,
    /// RNG seed; the ACK direction uses `seed + 1`
    pub seed: u64,
    /// Stop after this many ticks even if unfinished
    pub max_time: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            protocol: ProtocolConfig::default(),
            data_channel: ChannelModel::default(),
            ack_channel: ChannelModel::default(),
            messages: 100,
            send_interval: 1,
            seed: 0,
            max_time: 1_000_000,
        }
    }
}

impl SimConfig {
    /// Check every part of the configuration
    pub fn validate(&self) -> Result<(), SimError> {
        self.protocol.validate()?;
        self.data_channel.validate()?;
        self.ack_channel.validate()?;
        if self.send_interval == 0 {
            return Err(SimError::ZeroInterval);
        }
        let round_trip = self.max_round_trip();
        if self.protocol.timeout_ticks <= round_trip {
            tracing::warn!(
                timeout = self.protocol.timeout_ticks,
                round_trip,
                "timeout not longer than the worst round trip; expect spurious retransmissions"
            );
        }
        if self.data_channel.duplication > 0.0 && !self.late_acks_are_harmless() {
            tracing::warn!(
                ack_max_delay = self.ack_channel.max_delay,
                "duplicated data with a wide ACK delay spread; a late ACK may reach the next sequence lap"
            );
        }
        Ok(())
    }

    /// Worst-case data + ACK propagation time
    pub fn max_round_trip(&self) -> u64 {
        self.data_channel.max_delay + self.ack_channel.max_delay
    }

    /// True when every ACK of a packet arrives before the fastest possible
    /// ACK for a packet sent after the window moved past it
    pub fn late_acks_are_harmless(&self) -> bool {
        self.ack_channel.max_delay < self.data_channel.min_delay + self.ack_channel.min_delay
    }
}

/// Summary of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimReport {
    /// Time of the last processed event
    pub finished_at: SimTime,
    /// Whether every message was delivered and acknowledged
    pub complete: bool,
    /// Messages the source was asked to produce
    pub messages: u64,
    /// Payloads delivered to the sink
    pub delivered: u64,
    /// Delivered payloads are exactly `msg-0 .. msg-(n-1)` in order
    pub exactly_once_in_order: bool,
    /// Sender counters
    pub sender: SenderStats,
    /// Receiver counters
    pub receiver: ReceiverStats,
    /// Data direction counters
    pub data_channel: ChannelStats,
    /// ACK direction counters
    pub ack_channel: ChannelStats,
}

/// A sender, a receiver and the world between them
pub struct Simulation {
    config: SimConfig,
    scheduler: SchedulerHandle,
    sender: SimSender,
    receiver: SimReceiver,
    source: MessageSource,
}

impl Simulation {
    /// Build a simulation; the first application tick is at time zero
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let scheduler = SchedulerHandle::new();

        let data = LossyChannel::new(
            config.data_channel,
            Direction::ToReceiver,
            scheduler.clone(),
            config.seed,
        )?;
        let acks = LossyChannel::new(
            config.ack_channel,
            Direction::ToSender,
            scheduler.clone(),
            config.seed.wrapping_add(1),
        )?;

        let sender = SenderEngine::new(config.protocol, data, scheduler.clone())?;
        let receiver = ReceiverEngine::new(config.protocol, acks, MessageSink::new())?;

        if config.messages > 0 {
            scheduler.schedule(0, Event::AppTick);
        }

        Ok(Simulation {
            config,
            scheduler,
            sender,
            receiver,
            source: MessageSource::new(config.messages),
        })
    }

    /// Process the next event; `None` when the queue is empty
    pub fn step(&mut self) -> Option<Dispatched> {
        let dispatched = self.scheduler.pop()?;
        // Engines never read the clock; their logs pick up the time from here
        let _span = tracing::debug_span!("event", at = %dispatched.at).entered();
        tracing::trace!(id = dispatched.id, event = ?dispatched.event, "dispatch");

        match &dispatched.event {
            Event::TimerExpired { seq } => {
                self.sender.on_timer_expired(*seq, dispatched.handle());
            }
            Event::DeliverToReceiver(packet) => {
                self.receiver.on_packet(packet.clone());
            }
            Event::DeliverToSender(packet) => {
                if let AckOutcome::Accepted { advanced } = self.sender.on_ack(packet) {
                    if advanced > 0 {
                        self.retry_pending();
                    }
                }
            }
            Event::AppTick => self.app_tick(),
        }

        Some(dispatched)
    }

    /// Process every event due at or before `limit`
    pub fn run_until(&mut self, limit: SimTime) {
        while self
            .scheduler
            .peek_time()
            .is_some_and(|next| next <= limit)
        {
            self.step();
        }
    }

    /// Run to completion (or the configured time limit) and report
    pub fn run(&mut self) -> SimReport {
        self.run_until(SimTime::from_ticks(self.config.max_time));
        let report = self.report();
        if report.complete {
            tracing::info!(
                finished_at = %report.finished_at,
                delivered = report.delivered,
                retransmissions = report.sender.retransmissions,
                "transfer complete"
            );
        } else {
            tracing::warn!(
                finished_at = %report.finished_at,
                delivered = report.delivered,
                messages = report.messages,
                "transfer incomplete at time limit"
            );
        }
        report
    }

    /// Offer the source's next message; schedule the following tick
    fn app_tick(&mut self) {
        if let Some(message) = self.source.next_message() {
            if self.sender.submit(message).is_accepted() {
                self.source.accepted();
            }
        }
        if !self.source.is_exhausted() {
            self.scheduler.schedule(self.config.send_interval, Event::AppTick);
        }
    }

    /// Offer a message refused earlier, now that the window moved
    fn retry_pending(&mut self) {
        if let Some(message) = self.source.pending().cloned() {
            if self.sender.submit(message).is_accepted() {
                self.source.accepted();
            }
        }
    }

    /// Schedule an arbitrary event at absolute time `at`
    pub fn inject(&mut self, at: SimTime, event: Event) -> u64 {
        self.scheduler.schedule_at(at, event)
    }

    /// True when every message was delivered and the sender is idle
    pub fn is_complete(&self) -> bool {
        self.source.is_exhausted()
            && self.sender.is_idle()
            && self.receiver.app().len() as u64 == self.config.messages
    }

    /// Current report without running further
    pub fn report(&self) -> SimReport {
        let sink = self.receiver.app();
        SimReport {
            finished_at: self.scheduler.current_time(),
            complete: self.is_complete(),
            messages: self.config.messages,
            delivered: sink.len() as u64,
            exactly_once_in_order: sink.is_exact_sequence(self.source.generated()),
            sender: self.sender.stats(),
            receiver: self.receiver.stats(),
            data_channel: self.sender.channel().stats(),
            ack_channel: self.receiver.channel().stats(),
        }
    }

    /// Sender engine
    pub fn sender(&self) -> &SimSender {
        &self.sender
    }

    /// Receiver engine
    pub fn receiver(&self) -> &SimReceiver {
        &self.receiver
    }

    /// Application source
    pub fn source(&self) -> &MessageSource {
        &self.source
    }

    /// Shared event queue
    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.scheduler.current_time()
    }

    /// Configuration in use
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
