//! Unreliable channel model
//!
//! Each direction of the link is a [`LossyChannel`] that applies a fault
//! model to every packet handed to it:
//!
//! | Fault       | Description                                            |
//! |-------------|--------------------------------------------------------|
//! | Loss        | Packet silently dropped with probability `loss`.       |
//! | Corruption  | Packet delivered with `corrupted = true`.              |
//! | Duplication | A second copy arrives right behind the first.          |
//! | Delay       | Uniform in `min_delay..=max_delay` ticks; differing    |
//! |             | delays reorder packets.                                |
//!
//! Faults come from a seeded RNG so every run is reproducible.
//!
//! Every copy of a packet lives at most `max_delay` ticks. Together with
//! `K >= 2N` and a timeout longer than the worst round trip this keeps an old
//! data copy from landing in a later lap of the sequence space. A duplicated
//! data packet makes the receiver send two ACKs with independent delays; the
//! late one is only harmless while the ACK delay spread stays below
//! `data.min_delay + ack.min_delay`. See [`crate::SimConfig::validate`].

use crate::scheduler::{Event, SchedulerHandle};
use crate::SimError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sr_protocol::{Channel, Packet};

/// Fault model for one direction
///
/// Probabilities are in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelModel {
    /// Probability that a packet is dropped
    pub loss: f64,
    /// Probability that a delivered packet is marked corrupted
    pub corruption: f64,
    /// Probability that a packet is delivered twice
    pub duplication: f64,
    /// Minimum propagation delay in ticks
    pub min_delay: u64,
    /// Maximum propagation delay in ticks
    pub max_delay: u64,
}

impl Default for ChannelModel {
    fn default() -> Self {
        // No faults by default; the channel is a fixed-delay pipe.
        ChannelModel::perfect(2)
    }
}

impl ChannelModel {
    /// Fault-free channel with a fixed delay
    pub fn perfect(delay: u64) -> Self {
        ChannelModel {
            loss: 0.0,
            corruption: 0.0,
            duplication: 0.0,
            min_delay: delay,
            max_delay: delay,
        }
    }

    /// Check probabilities and delay bounds
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, value) in [
            ("loss", self.loss),
            ("corruption", self.corruption),
            ("duplication", self.duplication),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::InvalidProbability { name, value });
            }
        }
        if self.min_delay > self.max_delay {
            return Err(SimError::InvalidDelay {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }
}

/// Which end a channel delivers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sender → receiver (data)
    ToReceiver,
    /// Receiver → sender (ACKs)
    ToSender,
}

/// Per-channel counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Packets handed to the channel
    pub offered: u64,
    /// Packets dropped
    pub lost: u64,
    /// Copies delivered with the corruption flag set
    pub corrupted: u64,
    /// Extra copies created
    pub duplicated: u64,
    /// Copies scheduled for delivery
    pub scheduled: u64,
}

/// One direction of the simulated link
pub struct LossyChannel {
    model: ChannelModel,
    direction: Direction,
    scheduler: SchedulerHandle,
    rng: StdRng,
    stats: ChannelStats,
}

impl LossyChannel {
    /// Create a channel delivering towards `direction`
    pub fn new(
        model: ChannelModel,
        direction: Direction,
        scheduler: SchedulerHandle,
        seed: u64,
    ) -> Result<Self, SimError> {
        model.validate()?;
        Ok(LossyChannel {
            model,
            direction,
            scheduler,
            rng: StdRng::seed_from_u64(seed),
            stats: ChannelStats::default(),
        })
    }

    /// Counters
    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Fault model in use
    pub fn model(&self) -> &ChannelModel {
        &self.model
    }

    fn schedule_copy(&mut self, mut packet: Packet, delay: u64) {
        if self.rng.gen_bool(self.model.corruption) {
            packet.corrupted = true;
            self.stats.corrupted += 1;
        }

        tracing::trace!(
            seq = %packet.seq_num,
            corrupted = packet.corrupted,
            delay,
            direction = ?self.direction,
            "packet in transit"
        );

        let event = match self.direction {
            Direction::ToReceiver => Event::DeliverToReceiver(packet),
            Direction::ToSender => Event::DeliverToSender(packet),
        };
        self.scheduler.schedule(delay, event);
        self.stats.scheduled += 1;
    }
}

impl Channel for LossyChannel {
    fn send(&mut self, packet: Packet) {
        self.stats.offered += 1;

        if self.rng.gen_bool(self.model.loss) {
            self.stats.lost += 1;
            tracing::trace!(seq = %packet.seq_num, direction = ?self.direction, "packet lost");
            return;
        }

        let delay = self
            .rng
            .gen_range(self.model.min_delay..=self.model.max_delay);

        if self.rng.gen_bool(self.model.duplication) {
            self.stats.duplicated += 1;
            self.schedule_copy(packet.clone(), delay);
        }
        self.schedule_copy(packet, delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use sr_protocol::SeqNumber;

    fn packet(seq: u32) -> Packet {
        Packet::data(SeqNumber::new(seq), Bytes::from_static(b"x"), 10)
    }

    #[test]
    fn test_perfect_channel_delivers_after_delay() {
        let handle = SchedulerHandle::new();
        let mut chan =
            LossyChannel::new(ChannelModel::perfect(3), Direction::ToReceiver, handle.clone(), 1)
                .unwrap();
        chan.send(packet(1));

        let d = handle.pop().unwrap();
        assert_eq!(d.at.ticks(), 3);
        assert_eq!(d.event, Event::DeliverToReceiver(packet(1)));
        assert_eq!(chan.stats().scheduled, 1);
    }

    #[test]
    fn test_total_loss() {
        let handle = SchedulerHandle::new();
        let model = ChannelModel {
            loss: 1.0,
            ..ChannelModel::perfect(1)
        };
        let mut chan = LossyChannel::new(model, Direction::ToSender, handle.clone(), 1).unwrap();
        for seq in 0..10 {
            chan.send(packet(seq));
        }
        assert!(handle.pop().is_none());
        assert_eq!(chan.stats().lost, 10);
    }

    #[test]
    fn test_total_corruption_and_duplication() {
        let handle = SchedulerHandle::new();
        let model = ChannelModel {
            corruption: 1.0,
            duplication: 1.0,
            ..ChannelModel::perfect(1)
        };
        let mut chan = LossyChannel::new(model, Direction::ToSender, handle.clone(), 1).unwrap();
        chan.send(packet(4));

        let copies: Vec<_> = std::iter::from_fn(|| handle.pop()).collect();
        assert_eq!(copies.len(), 2);
        for copy in copies {
            assert_eq!(copy.event, Event::DeliverToSender(packet(4).corrupt()));
        }
    }

    #[test]
    fn test_same_seed_same_faults() {
        let model = ChannelModel {
            loss: 0.3,
            corruption: 0.2,
            duplication: 0.1,
            min_delay: 1,
            max_delay: 9,
        };
        let run = |seed| {
            let handle = SchedulerHandle::new();
            let mut chan =
                LossyChannel::new(model, Direction::ToReceiver, handle.clone(), seed).unwrap();
            for seq in 0..50 {
                chan.send(packet(seq));
            }
            std::iter::from_fn(|| handle.pop()).collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_invalid_model_rejected() {
        let model = ChannelModel {
            loss: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            model.validate(),
            Err(SimError::InvalidProbability { name: "loss", .. })
        ));

        let model = ChannelModel {
            min_delay: 5,
            max_delay: 2,
            ..Default::default()
        };
        assert!(matches!(model.validate(), Err(SimError::InvalidDelay { .. })));
    }
}
