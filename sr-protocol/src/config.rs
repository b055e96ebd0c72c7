//! Protocol configuration
//!
//! Fixed at engine construction; there is no runtime reconfiguration.

use crate::sequence::{SeqNumber, SequenceSpace, MAX_MODULUS};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Window size must be at least 1")]
    ZeroWindow,

    #[error("Sequence modulus {0} outside 1..={max}", max = MAX_MODULUS)]
    ModulusOutOfRange(u32),

    #[error("Sequence modulus {modulus} is smaller than twice the {which} window ({window})")]
    ModulusTooSmall {
        modulus: u32,
        window: u32,
        which: &'static str,
    },

    #[error("Timeout must be at least one tick")]
    ZeroTimeout,

    #[error("Initial sequence number {initial} not below modulus {modulus}")]
    InitialSeqOutOfRange { initial: u32, modulus: u32 },
}

/// Selective Repeat parameters shared by sender and receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Sender window size (N)
    pub window_size: u32,
    /// Receiver window size (N_recv)
    pub receive_window: u32,
    /// Sequence numbers range over `0..modulus` (K)
    pub modulus: u32,
    /// Retransmission timeout in ticks
    pub timeout_ticks: u64,
    /// First sequence number used by both ends
    pub initial_seq: u32,
    /// Nominal data packet length in bits
    pub data_packet_length: usize,
    /// Nominal ACK packet length in bits
    pub ack_packet_length: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            window_size: 8,
            receive_window: 8,
            modulus: 16,
            timeout_ticks: 10,
            initial_seq: 1,
            data_packet_length: 10,
            ack_packet_length: 10,
        }
    }
}

impl ProtocolConfig {
    /// Config with the given window on both ends and modulus, other fields default
    pub fn with_window(window_size: u32, modulus: u32) -> Self {
        ProtocolConfig {
            window_size,
            receive_window: window_size,
            modulus,
            ..Default::default()
        }
    }

    /// Check the constraints Selective Repeat needs
    ///
    /// `K >= 2N` on both windows keeps a retransmitted old packet from being
    /// mistaken for a fresh one after the window wraps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 || self.receive_window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.modulus == 0 || self.modulus > MAX_MODULUS {
            return Err(ConfigError::ModulusOutOfRange(self.modulus));
        }
        for (window, which) in [(self.window_size, "sender"), (self.receive_window, "receiver")] {
            if (self.modulus as u64) < 2 * window as u64 {
                return Err(ConfigError::ModulusTooSmall {
                    modulus: self.modulus,
                    window,
                    which,
                });
            }
        }
        if self.timeout_ticks == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.initial_seq >= self.modulus {
            return Err(ConfigError::InitialSeqOutOfRange {
                initial: self.initial_seq,
                modulus: self.modulus,
            });
        }
        Ok(())
    }

    /// Sequence space for this configuration (call after `validate`)
    pub fn space(&self) -> SequenceSpace {
        SequenceSpace::new(self.modulus)
    }

    /// Initial sequence number as a [`SeqNumber`]
    pub fn initial_seq(&self) -> SeqNumber {
        SeqNumber::new(self.initial_seq)
    }
}
