//! Selective Repeat CLI Library
//!
//! Shared functionality for the simulator command-line tool.

pub mod config;
pub mod stats;

pub use config::{ChannelSection, ConfigFileError, FileConfig, ProtocolSection, RunSection};
pub use stats::{display_report, format_percent, format_ticks, render_report, summary_line};
