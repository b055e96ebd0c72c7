//! Per-packet retransmission timers
//!
//! Every unacknowledged packet has one logical timer. Each timer is an
//! explicit state machine instead of an interruptible task, so the race
//! between an ACK cancelling a timer and the timer expiring is an ordinary
//! state transition:
//!
//! ```text
//!   Idle ──start──▶ Running ──stop──▶ Cancelled (removed)
//!                      │
//!                    fire
//!                      ▼
//!                    Fired ──finish──▶ (removed)
//! ```
//!
//! A `stop` that finds the timer `Fired` is a no-op: the timeout handling is
//! already under way and runs to completion.

use crate::interface::{TimerHandle, TimerScheduler};
use crate::sequence::SeqNumber;
use crate::time::SimTime;
use std::collections::HashMap;

/// Timer lifecycle state
///
/// `Idle` lasts only while [`TimerTable::start`] arms the entry and
/// `Cancelled` only while [`TimerTable::stop`] removes it, so a table query
/// observes `Running` or `Fired`, or no entry at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Created, not yet armed with the host
    Idle,
    /// Armed; the host will call back after the timeout
    Running,
    /// Expired; timeout handling in progress
    Fired,
    /// Stopped before expiry
    Cancelled,
}

/// One logical timer
#[derive(Debug, Clone)]
pub struct TimerEntry {
    /// Packet this timer guards
    pub seq: SeqNumber,
    /// Host handle of the armed callback
    pub handle: Option<TimerHandle>,
    /// Current state
    pub state: TimerState,
    /// When the timer was armed
    pub started_at: SimTime,
}

impl TimerEntry {
    fn new(seq: SeqNumber, now: SimTime) -> Self {
        TimerEntry {
            seq,
            handle: None,
            state: TimerState::Idle,
            started_at: now,
        }
    }
}

/// Result of [`TimerTable::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// New timer armed
    Started(TimerHandle),
    /// An entry already existed; nothing was reset
    AlreadyRunning,
}

/// Result of [`TimerTable::stop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Running timer cancelled and removed
    Stopped,
    /// Timer already fired; its timeout handling must complete
    AlreadyFired,
    /// No timer for this sequence number
    NotFound,
}

/// Table of per-packet timers on top of a host scheduler
pub struct TimerTable<S> {
    scheduler: S,
    timeout: u64,
    entries: HashMap<SeqNumber, TimerEntry>,
}

impl<S: TimerScheduler> TimerTable<S> {
    /// Create an empty table; every timer waits `timeout` ticks
    pub fn new(scheduler: S, timeout: u64) -> Self {
        TimerTable {
            scheduler,
            timeout,
            entries: HashMap::new(),
        }
    }

    /// Current host time
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Timeout applied to every timer
    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    /// Arm a timer for `seq` unless one already exists
    pub fn start(&mut self, seq: SeqNumber) -> StartOutcome {
        if let Some(existing) = self.entries.get(&seq) {
            tracing::warn!(
                seq = %seq,
                state = ?existing.state,
                "timer already running; not restarted"
            );
            return StartOutcome::AlreadyRunning;
        }

        let now = self.scheduler.now();
        let mut entry = TimerEntry::new(seq, now);
        let handle = self.scheduler.schedule_timeout(seq, self.timeout);
        entry.handle = Some(handle);
        entry.state = TimerState::Running;
        self.entries.insert(seq, entry);

        tracing::debug!(%now, seq = %seq, timeout = self.timeout, "timer started");
        StartOutcome::Started(handle)
    }

    /// Stop the timer for `seq`
    pub fn stop(&mut self, seq: SeqNumber) -> StopOutcome {
        let Some(entry) = self.entries.get_mut(&seq) else {
            tracing::warn!(seq = %seq, "stop requested for unknown timer");
            return StopOutcome::NotFound;
        };

        if entry.state == TimerState::Fired {
            tracing::debug!(seq = %seq, "timer already fired; stop ignored");
            return StopOutcome::AlreadyFired;
        }

        entry.state = TimerState::Cancelled;
        if let Some(handle) = entry.handle {
            if !self.scheduler.cancel(handle) {
                tracing::debug!(seq = %seq, ?handle, "host had no pending callback to cancel");
            }
        }
        self.entries.remove(&seq);
        tracing::debug!(now = %self.scheduler.now(), seq = %seq, "timer stopped");
        StopOutcome::Stopped
    }

    /// Host callback: the timer armed with `handle` expired
    ///
    /// Returns true when the entry moved Running → Fired and the caller must
    /// run timeout handling and then [`TimerTable::finish`]. Stale callbacks
    /// (cancelled, replaced, or unknown) return false and change nothing.
    pub fn fire(&mut self, seq: SeqNumber, handle: TimerHandle) -> bool {
        match self.entries.get_mut(&seq) {
            Some(entry) if entry.state == TimerState::Running && entry.handle == Some(handle) => {
                entry.state = TimerState::Fired;
                tracing::debug!(now = %self.scheduler.now(), seq = %seq, "timer fired");
                true
            }
            _ => {
                tracing::debug!(seq = %seq, ?handle, "stale timer callback ignored");
                false
            }
        }
    }

    /// Remove a fired entry once its timeout handling is done
    pub fn finish(&mut self, seq: SeqNumber) {
        if let Some(entry) = self.entries.get(&seq) {
            if entry.state == TimerState::Fired {
                self.entries.remove(&seq);
            }
        }
    }

    /// State of the timer for `seq`, if one exists
    pub fn state(&self, seq: SeqNumber) -> Option<TimerState> {
        self.entries.get(&seq).map(|e| e.state)
    }

    /// Entry for `seq`
    pub fn entry(&self, seq: SeqNumber) -> Option<&TimerEntry> {
        self.entries.get(&seq)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no timer exists
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Host scheduler
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Host scheduler, mutably (tests move time through this)
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::ManualScheduler;

    fn table() -> TimerTable<ManualScheduler> {
        TimerTable::new(ManualScheduler::new(), 10)
    }

    #[test]
    fn test_start_and_stop() {
        let mut timers = table();
        let seq = SeqNumber::new(3);

        let StartOutcome::Started(handle) = timers.start(seq) else {
            panic!("timer should start");
        };
        assert_eq!(timers.state(seq), Some(TimerState::Running));
        assert_eq!(timers.scheduler().pending().len(), 1);

        assert_eq!(timers.stop(seq), StopOutcome::Stopped);
        assert_eq!(timers.state(seq), None);
        assert_eq!(timers.scheduler().cancelled(), &[handle]);
        assert!(timers.scheduler().pending().is_empty());
    }

    #[test]
    fn test_only_running_or_fired_is_observable() {
        let mut timers = table();
        let seq = SeqNumber::new(6);

        let StartOutcome::Started(handle) = timers.start(seq) else {
            panic!("timer should start");
        };
        let entry = timers.entry(seq).unwrap();
        assert_eq!(entry.state, TimerState::Running);
        assert_eq!(entry.handle, Some(handle));

        timers.stop(seq);
        assert!(timers.entry(seq).is_none());

        let StartOutcome::Started(handle) = timers.start(seq) else {
            panic!("timer should start");
        };
        timers.fire(seq, handle);
        assert_eq!(timers.state(seq), Some(TimerState::Fired));
        timers.finish(seq);
        assert!(timers.entry(seq).is_none());
    }

    #[test]
    fn test_start_twice_does_not_reset() {
        let mut timers = table();
        let seq = SeqNumber::new(1);
        timers.start(seq);
        timers.scheduler_mut().advance(4);

        assert_eq!(timers.start(seq), StartOutcome::AlreadyRunning);
        assert_eq!(timers.entry(seq).unwrap().started_at, SimTime::ZERO);
        assert_eq!(timers.scheduler().pending().len(), 1);
    }

    #[test]
    fn test_stop_unknown() {
        let mut timers = table();
        assert_eq!(timers.stop(SeqNumber::new(9)), StopOutcome::NotFound);
    }

    #[test]
    fn test_fire_then_finish() {
        let mut timers = table();
        let seq = SeqNumber::new(2);
        let StartOutcome::Started(handle) = timers.start(seq) else {
            panic!("timer should start");
        };

        assert!(timers.fire(seq, handle));
        assert_eq!(timers.state(seq), Some(TimerState::Fired));

        timers.finish(seq);
        assert_eq!(timers.state(seq), None);

        // A fresh start creates a new entry
        assert!(matches!(timers.start(seq), StartOutcome::Started(h) if h != handle));
    }

    #[test]
    fn test_stop_after_fire_is_noop() {
        let mut timers = table();
        let seq = SeqNumber::new(2);
        let StartOutcome::Started(handle) = timers.start(seq) else {
            panic!("timer should start");
        };
        assert!(timers.fire(seq, handle));

        assert_eq!(timers.stop(seq), StopOutcome::AlreadyFired);
        assert_eq!(timers.state(seq), Some(TimerState::Fired));
        assert!(timers.scheduler().cancelled().is_empty());
    }

    #[test]
    fn test_fire_after_stop_is_ignored() {
        let mut timers = table();
        let seq = SeqNumber::new(4);
        let StartOutcome::Started(handle) = timers.start(seq) else {
            panic!("timer should start");
        };
        timers.stop(seq);

        assert!(!timers.fire(seq, handle));
        assert_eq!(timers.state(seq), None);
    }

    #[test]
    fn test_fire_with_stale_handle() {
        let mut timers = table();
        let seq = SeqNumber::new(4);
        let StartOutcome::Started(old) = timers.start(seq) else {
            panic!("timer should start");
        };
        timers.stop(seq);
        timers.start(seq);

        assert!(!timers.fire(seq, old));
        assert_eq!(timers.state(seq), Some(TimerState::Running));
    }

    #[test]
    fn test_finish_ignores_running() {
        let mut timers = table();
        let seq = SeqNumber::new(5);
        timers.start(seq);
        timers.finish(seq);
        assert_eq!(timers.state(seq), Some(TimerState::Running));
    }
}
