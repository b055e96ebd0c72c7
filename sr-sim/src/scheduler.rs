//! Discrete-event scheduler
//!
//! Events are processed in non-decreasing time. Events due at the same tick
//! run in registration order: every event gets a monotonically increasing id
//! when it is scheduled, and the queue orders by `(time, id)`.
//!
//! That rule decides the ACK-versus-timeout race. A retransmission timer is
//! registered when its packet is sent, which is always before the ACK for
//! that transmission can be registered, so a timer and an ACK due at the
//! same tick resolve as "timer first".
//!
//! Cancelled events are removed from the live set and skipped when popped;
//! a cancelled timer is never dispatched.

use parking_lot::Mutex;
use sr_protocol::{Packet, SeqNumber, SimTime, TimerHandle, TimerScheduler};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;

/// Something that happens at a point in simulated time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Retransmission timer for `seq` expired
    TimerExpired { seq: SeqNumber },
    /// Data packet reaches the receiver
    DeliverToReceiver(Packet),
    /// ACK reaches the sender
    DeliverToSender(Packet),
    /// Application source wants to offer data
    AppTick,
}

/// An event taken off the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    /// When it runs
    pub at: SimTime,
    /// Registration id (also the timer handle for timer events)
    pub id: u64,
    /// What happens
    pub event: Event,
}

impl Dispatched {
    /// Timer handle for this event
    pub fn handle(&self) -> TimerHandle {
        TimerHandle(self.id)
    }
}

#[derive(Debug)]
struct Scheduled {
    at: SimTime,
    id: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.at, self.id) == (other.at, other.id)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.id).cmp(&(other.at, other.id))
    }
}

/// Time-ordered event queue
#[derive(Debug, Default)]
pub struct EventQueue {
    now: SimTime,
    next_id: u64,
    heap: BinaryHeap<Reverse<Scheduled>>,
    /// Ids scheduled and neither popped nor cancelled
    live: HashSet<u64>,
}

impl EventQueue {
    /// Empty queue at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time (time of the last popped event)
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Schedule `event` `delay` ticks from now; returns its id
    pub fn schedule(&mut self, delay: u64, event: Event) -> u64 {
        let at = self.now + delay;
        self.schedule_at(at, event)
    }

    /// Schedule `event` at absolute time `at` (clamped to now)
    pub fn schedule_at(&mut self, at: SimTime, event: Event) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let at = at.max(self.now);
        self.heap.push(Reverse(Scheduled { at, id, event }));
        self.live.insert(id);
        id
    }

    /// Cancel a pending event. False if it already ran or was cancelled.
    pub fn cancel(&mut self, id: u64) -> bool {
        self.live.remove(&id)
    }

    /// Pop the next live event and advance the clock to it
    pub fn pop(&mut self) -> Option<Dispatched> {
        while let Some(Reverse(scheduled)) = self.heap.pop() {
            if !self.live.remove(&scheduled.id) {
                continue;
            }
            self.now = scheduled.at;
            return Some(Dispatched {
                at: scheduled.at,
                id: scheduled.id,
                event: scheduled.event,
            });
        }
        None
    }

    /// Time of the next live event
    pub fn peek_time(&mut self) -> Option<SimTime> {
        while let Some(Reverse(top)) = self.heap.peek() {
            if self.live.contains(&top.id) {
                return Some(top.at);
            }
            self.heap.pop();
        }
        None
    }

    /// Number of live events
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

/// Shared handle to the event queue
///
/// The sender's timer table and both channel directions hold clones. The
/// lock is only taken for the duration of one queue operation; the driver
/// pops an event and releases the lock before dispatching it.
#[derive(Debug, Clone, Default)]
pub struct SchedulerHandle {
    queue: Arc<Mutex<EventQueue>>,
}

impl SchedulerHandle {
    /// Handle to a fresh queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` `delay` ticks from now
    pub fn schedule(&self, delay: u64, event: Event) -> u64 {
        self.queue.lock().schedule(delay, event)
    }

    /// Schedule `event` at absolute time `at`
    pub fn schedule_at(&self, at: SimTime, event: Event) -> u64 {
        self.queue.lock().schedule_at(at, event)
    }

    /// Pop the next live event
    pub fn pop(&self) -> Option<Dispatched> {
        self.queue.lock().pop()
    }

    /// Time of the next live event
    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.lock().peek_time()
    }

    /// Current time
    pub fn current_time(&self) -> SimTime {
        self.queue.lock().now()
    }

    /// Number of live events
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl TimerScheduler for SchedulerHandle {
    fn now(&self) -> SimTime {
        self.current_time()
    }

    fn schedule_timeout(&mut self, seq: SeqNumber, delay: u64) -> TimerHandle {
        TimerHandle(self.schedule(delay, Event::TimerExpired { seq }))
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.queue.lock().cancel(handle.0)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_pops_in_time_then_registration_order(
            delays in prop::collection::vec(0u64..20, 1..64),
            cancel in prop::collection::vec(any::<bool>(), 64),
        ) {
            let mut q = EventQueue::new();
            let mut kept = 0;
            for (i, &delay) in delays.iter().enumerate() {
                let id = q.schedule(delay, Event::AppTick);
                if cancel[i] {
                    prop_assert!(q.cancel(id));
                } else {
                    kept += 1;
                }
            }
            prop_assert_eq!(q.len(), kept);

            let popped: Vec<(SimTime, u64)> =
                std::iter::from_fn(|| q.pop()).map(|d| (d.at, d.id)).collect();
            prop_assert_eq!(popped.len(), kept);
            for pair in popped.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            for (_, id) in &popped {
                prop_assert!(!cancel[*id as usize]);
            }
        }
    }
}
