//! Sequence Number Handling
//!
//! Selective Repeat numbers packets modulo a configurable `K`. This module
//! provides the sequence number newtype and [`SequenceSpace`], which holds `K`
//! and answers the window-membership questions both engines ask.

use std::fmt;

/// Largest supported modulus (sequence numbers must fit comfortably in a u32)
pub const MAX_MODULUS: u32 = 1 << 31;

/// Sequence number in `[0, K)`
///
/// The raw value carries no modulus; arithmetic goes through
/// [`SequenceSpace`] so that the wrap point is always the configured `K`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SeqNumber(u32);

impl SeqNumber {
    /// Create a new sequence number
    #[inline]
    pub const fn new(value: u32) -> Self {
        SeqNumber(value)
    }

    /// Get the raw sequence number value
    #[inline]
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqNumber({})", self.0)
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SeqNumber {
    fn from(value: u32) -> Self {
        SeqNumber(value)
    }
}

impl From<SeqNumber> for u32 {
    fn from(seq: SeqNumber) -> u32 {
        seq.0
    }
}

/// Modulo-`K` sequence space
///
/// Pure arithmetic, no state beyond the modulus. `K` is validated by
/// [`crate::config::ProtocolConfig::validate`] before a space is handed to an
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSpace {
    modulus: u32,
}

impl SequenceSpace {
    /// Create a sequence space of size `modulus`
    ///
    /// # Panics
    /// Panics if `modulus` is zero or exceeds [`MAX_MODULUS`]
    pub fn new(modulus: u32) -> Self {
        assert!(
            modulus > 0 && modulus <= MAX_MODULUS,
            "Sequence modulus {} outside 1..={}",
            modulus,
            MAX_MODULUS
        );
        SequenceSpace { modulus }
    }

    /// The modulus `K`
    #[inline]
    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    /// Reduce an arbitrary value into the space
    #[inline]
    pub fn wrap(&self, value: u32) -> SeqNumber {
        SeqNumber(value % self.modulus)
    }

    /// The number following `seq`, wrapping at `K`
    #[inline]
    pub fn next(&self, seq: SeqNumber) -> SeqNumber {
        self.add(seq, 1)
    }

    /// `seq + n (mod K)`
    #[inline]
    pub fn add(&self, seq: SeqNumber, n: u32) -> SeqNumber {
        let sum = (seq.0 as u64 + n as u64) % self.modulus as u64;
        SeqNumber(sum as u32)
    }

    /// Forward distance from `base` to `seq`: `(seq - base) mod K`
    #[inline]
    pub fn offset(&self, base: SeqNumber, seq: SeqNumber) -> u32 {
        let k = self.modulus as u64;
        ((seq.0 as u64 % k + k - base.0 as u64 % k) % k) as u32
    }

    /// Is `seq` one of `base, base+1, ..., base+size-1 (mod K)`?
    ///
    /// A `size` of `K` or more covers the whole space.
    #[inline]
    pub fn in_window(&self, seq: SeqNumber, base: SeqNumber, size: u32) -> bool {
        self.offset(base, seq) < size
    }

    /// Iterate over the `size` numbers of the window starting at `base`
    pub fn window(&self, base: SeqNumber, size: u32) -> impl Iterator<Item = SeqNumber> + '_ {
        (0..size.min(self.modulus)).map(move |i| self.add(base, i))
    }
}
