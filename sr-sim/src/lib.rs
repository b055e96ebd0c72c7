//! Discrete-event simulator for the Selective Repeat core
//!
//! Drives a sender and a receiver from `sr-protocol` over two simulated
//! unreliable channel directions. Time is a tick counter; nothing here
//! sleeps or touches the network.

pub mod app;
pub mod channel;
pub mod scheduler;
pub mod simulation;

pub use app::{message_payload, MessageSink, MessageSource};
pub use channel::{ChannelModel, ChannelStats, Direction, LossyChannel};
pub use scheduler::{Dispatched, Event, EventQueue, SchedulerHandle};
pub use simulation::{SimConfig, SimReceiver, SimReport, SimSender, Simulation};

use sr_protocol::ConfigError;
use thiserror::Error;

/// Simulator configuration errors
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Protocol configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Probability {name} = {value} outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("Minimum delay {min} exceeds maximum delay {max}")]
    InvalidDelay { min: u64, max: u64 },

    #[error("Send interval must be at least one tick")]
    ZeroInterval,
}
