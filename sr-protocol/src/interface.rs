//! Collaborator capabilities
//!
//! The engines talk to the outside world only through these traits: the
//! unreliable channel, the receiving application, and the host scheduler that
//! owns time. Simple implementations for `Vec` make good test doubles.

use crate::packet::Packet;
use crate::sequence::SeqNumber;
use crate::time::SimTime;
use bytes::Bytes;

/// Unreliable channel towards the peer
pub trait Channel {
    /// Hand a packet to the channel. Delivery is the channel's business.
    fn send(&mut self, packet: Packet);
}

/// Consumer of in-order payloads on the receiving side
pub trait Application {
    /// Called once per payload, in sequence order, without gaps or repeats
    fn deliver(&mut self, payload: Bytes);
}

/// Opaque identifier for one scheduled timer callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Host "wait then fire" primitive
///
/// When a scheduled timeout expires the host must call
/// [`crate::sender::SenderEngine::on_timer_expired`] with the same sequence
/// number and handle. After a successful [`TimerScheduler::cancel`] the host
/// must never deliver that handle.
pub trait TimerScheduler {
    /// Current simulated time
    fn now(&self) -> SimTime;

    /// Request a callback for `seq` after `delay` ticks
    fn schedule_timeout(&mut self, seq: SeqNumber, delay: u64) -> TimerHandle;

    /// Cancel a pending callback. Returns false if it already fired or is unknown.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
}

impl Channel for Vec<Packet> {
    fn send(&mut self, packet: Packet) {
        self.push(packet);
    }
}

impl Application for Vec<Bytes> {
    fn deliver(&mut self, payload: Bytes) {
        self.push(payload);
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn send(&mut self, packet: Packet) {
        (**self).send(packet);
    }
}

impl<A: Application + ?Sized> Application for &mut A {
    fn deliver(&mut self, payload: Bytes) {
        (**self).deliver(payload);
    }
}

/// Scheduler driven by hand, for unit tests
///
/// Records every request; the test decides when time moves and which
/// timers expire.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: SimTime,
    next_handle: u64,
    /// Timers scheduled and not cancelled: (handle, seq, deadline)
    pending: Vec<(TimerHandle, SeqNumber, SimTime)>,
    /// Handles cancelled so far
    cancelled: Vec<TimerHandle>,
}

impl ManualScheduler {
    /// Create a scheduler at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance(&mut self, ticks: u64) {
        self.now += ticks;
    }

    /// Remove and return every pending timer whose deadline has passed,
    /// in deadline order
    pub fn take_expired(&mut self) -> Vec<(SeqNumber, TimerHandle)> {
        let now = self.now;
        let mut expired: Vec<_> = self
            .pending
            .iter()
            .filter(|(_, _, deadline)| *deadline <= now)
            .copied()
            .collect();
        expired.sort_by_key(|(handle, _, deadline)| (*deadline, *handle));
        self.pending.retain(|(_, _, deadline)| *deadline > now);
        expired
            .into_iter()
            .map(|(handle, seq, _)| (seq, handle))
            .collect()
    }

    /// Pending (handle, seq, deadline) entries
    pub fn pending(&self) -> &[(TimerHandle, SeqNumber, SimTime)] {
        &self.pending
    }

    /// Handles cancelled so far
    pub fn cancelled(&self) -> &[TimerHandle] {
        &self.cancelled
    }
}

impl TimerScheduler for ManualScheduler {
    fn now(&self) -> SimTime {
        self.now
    }

    fn schedule_timeout(&mut self, seq: SeqNumber, delay: u64) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push((handle, seq, self.now + delay));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(h, _, _)| *h != handle);
        let removed = self.pending.len() != before;
        if removed {
            self.cancelled.push(handle);
        }
        removed
    }
}
