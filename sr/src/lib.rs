//! Selective Repeat reliable transfer
//!
//! High-level entry point: the protocol core and the discrete-event
//! simulator that exercises it.

pub use sr_protocol as protocol;
pub use sr_sim as sim;

// Re-export commonly used types
pub use protocol::{
    Packet, ProtocolConfig, ReceiverEngine, SenderEngine, SeqNumber, SequenceSpace, SimTime,
};
pub use sim::{ChannelModel, SimConfig, SimError, SimReport, Simulation};
