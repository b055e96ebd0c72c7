//! Simulated time
//!
//! The engines never read a wall clock. Time is whatever the host scheduler
//! says it is, counted in integer ticks.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Point in simulated time, in ticks since the start of the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(u64);

impl SimTime {
    /// Time zero
    pub const ZERO: SimTime = SimTime(0);

    /// Create a timestamp from a tick count
    #[inline]
    pub const fn from_ticks(ticks: u64) -> Self {
        SimTime(ticks)
    }

    /// Tick count
    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Ticks elapsed since `earlier` (zero if `earlier` is later)
    #[inline]
    pub fn since(self, earlier: SimTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

impl Add<u64> for SimTime {
    type Output = SimTime;

    fn add(self, ticks: u64) -> SimTime {
        SimTime(self.0.saturating_add(ticks))
    }
}

impl AddAssign<u64> for SimTime {
    fn add_assign(&mut self, ticks: u64) {
        self.0 = self.0.saturating_add(ticks);
    }
}

impl Sub for SimTime {
    type Output = u64;

    fn sub(self, other: SimTime) -> u64 {
        self.since(other)
    }
}
