//! Selective Repeat Protocol Core
//!
//! This crate implements the reliability logic of a Selective Repeat
//! sliding-window transfer: modulo-K sequence arithmetic, per-packet
//! retransmission timers, and the sender and receiver state machines.
//!
//! Nothing here performs I/O or reads a clock. The channel, the receiving
//! application and the scheduler that owns time are collaborators reached
//! through the traits in [`interface`].

pub mod config;
pub mod interface;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod sequence;
pub mod stats;
pub mod time;
pub mod timer;

pub use config::{ConfigError, ProtocolConfig};
pub use interface::{Application, Channel, ManualScheduler, TimerHandle, TimerScheduler};
pub use packet::Packet;
pub use receiver::{ReceiveOutcome, ReceiverEngine};
pub use sender::{AckOutcome, PacketRecord, SenderEngine, SubmitOutcome};
pub use sequence::{SeqNumber, SequenceSpace, MAX_MODULUS};
pub use stats::{ReceiverStats, SenderStats};
pub use time::SimTime;
pub use timer::{StartOutcome, StopOutcome, TimerEntry, TimerState, TimerTable};
