//! Configuration file support for the simulator CLI

use serde::{Deserialize, Serialize};
use sr::protocol::ProtocolConfig;
use sr::sim::{ChannelModel, SimConfig};
use std::fs;
use std::path::Path;

/// Protocol parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSection {
    /// Sender window size
    #[serde(default = "default_window")]
    pub window_size: u32,
    /// Receiver window size (defaults to the sender window)
    pub receive_window: Option<u32>,
    /// Sequence number modulus
    #[serde(default = "default_modulus")]
    pub modulus: u32,
    /// Retransmission timeout in ticks
    #[serde(default = "default_timeout")]
    pub timeout_ticks: u64,
    /// First sequence number
    #[serde(default = "default_initial_seq")]
    pub initial_seq: u32,
}

fn default_window() -> u32 {
    8
}

fn default_modulus() -> u32 {
    16
}

fn default_timeout() -> u64 {
    10
}

fn default_initial_seq() -> u32 {
    1
}

impl Default for ProtocolSection {
    fn default() -> Self {
        ProtocolSection {
            window_size: default_window(),
            receive_window: None,
            modulus: default_modulus(),
            timeout_ticks: default_timeout(),
            initial_seq: default_initial_seq(),
        }
    }
}

/// Fault model for one channel direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSection {
    /// Loss probability (0.0 to 1.0)
    #[serde(default)]
    pub loss: f64,
    /// Corruption probability (0.0 to 1.0)
    #[serde(default)]
    pub corruption: f64,
    /// Duplication probability (0.0 to 1.0)
    #[serde(default)]
    pub duplication: f64,
    /// Minimum delay in ticks
    #[serde(default = "default_delay")]
    pub min_delay: u64,
    /// Maximum delay in ticks
    #[serde(default = "default_delay")]
    pub max_delay: u64,
}

fn default_delay() -> u64 {
    2
}

impl Default for ChannelSection {
    fn default() -> Self {
        ChannelSection {
            loss: 0.0,
            corruption: 0.0,
            duplication: 0.0,
            min_delay: default_delay(),
            max_delay: default_delay(),
        }
    }
}

impl From<ChannelSection> for ChannelModel {
    fn from(section: ChannelSection) -> Self {
        ChannelModel {
            loss: section.loss,
            corruption: section.corruption,
            duplication: section.duplication,
            min_delay: section.min_delay,
            max_delay: section.max_delay,
        }
    }
}

impl From<ChannelModel> for ChannelSection {
    fn from(model: ChannelModel) -> Self {
        ChannelSection {
            loss: model.loss,
            corruption: model.corruption,
            duplication: model.duplication,
            min_delay: model.min_delay,
            max_delay: model.max_delay,
        }
    }
}

/// Run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    /// Messages to transfer
    #[serde(default = "default_messages")]
    pub messages: u64,
    /// Ticks between application sends
    #[serde(default = "default_send_interval")]
    pub send_interval: u64,
    /// RNG seed
    #[serde(default)]
    pub seed: u64,
    /// Give up after this many ticks
    #[serde(default = "default_max_time")]
    pub max_time: u64,
}

fn default_messages() -> u64 {
    100
}

fn default_send_interval() -> u64 {
    1
}

fn default_max_time() -> u64 {
    1_000_000
}

impl Default for RunSection {
    fn default() -> Self {
        RunSection {
            messages: default_messages(),
            send_interval: default_send_interval(),
            seed: 0,
            max_time: default_max_time(),
        }
    }
}

/// Whole configuration file
///
/// Every section and field is optional; missing values take the defaults
/// of [`SimConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub protocol: ProtocolSection,
    #[serde(default)]
    pub data_channel: ChannelSection,
    #[serde(default)]
    pub ack_channel: ChannelSection,
    #[serde(default)]
    pub run: RunSection,
}

impl FileConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigFileError> {
        let contents = fs::read_to_string(path)?;
        let config: FileConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigFileError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Example with a moderately hostile channel
    pub fn example() -> Self {
        let lossy = ChannelSection {
            loss: 0.1,
            corruption: 0.05,
            duplication: 0.02,
            min_delay: 2,
            max_delay: 3,
        };
        FileConfig {
            protocol: ProtocolSection {
                timeout_ticks: 8,
                ..Default::default()
            },
            data_channel: lossy.clone(),
            ack_channel: lossy,
            run: RunSection {
                messages: 500,
                seed: 42,
                ..Default::default()
            },
        }
    }

    /// Build and validate the simulator configuration
    pub fn to_sim_config(&self) -> Result<SimConfig, ConfigFileError> {
        let p = &self.protocol;
        let config = SimConfig {
            protocol: ProtocolConfig {
                window_size: p.window_size,
                receive_window: p.receive_window.unwrap_or(p.window_size),
                modulus: p.modulus,
                timeout_ticks: p.timeout_ticks,
                initial_seq: p.initial_seq,
                ..Default::default()
            },
            data_channel: self.data_channel.clone().into(),
            ack_channel: self.ack_channel.clone().into(),
            messages: self.run.messages,
            send_interval: self.run.send_interval,
            seed: self.run.seed,
            max_time: self.run.max_time,
        };
        config
            .validate()
            .map_err(|e| ConfigFileError::Invalid(e.to_string()))?;
        Ok(config)
    }
}

impl From<&SimConfig> for FileConfig {
    fn from(config: &SimConfig) -> Self {
        let p = &config.protocol;
        FileConfig {
            protocol: ProtocolSection {
                window_size: p.window_size,
                receive_window: Some(p.receive_window),
                modulus: p.modulus,
                timeout_ticks: p.timeout_ticks,
                initial_seq: p.initial_seq,
            },
            data_channel: config.data_channel.into(),
            ack_channel: config.ack_channel.into(),
            run: RunSection {
                messages: config.messages,
                send_interval: config.send_interval,
                seed: config.seed,
                max_time: config.max_time,
            },
        }
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.to_sim_config().unwrap(), SimConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: FileConfig = toml::from_str(
            r#"
            [protocol]
            window_size = 4
            modulus = 8

            [data_channel]
            loss = 0.25
            max_delay = 6

            [run]
            seed = 9
            "#,
        )
        .unwrap();

        let sim = config.to_sim_config().unwrap();
        assert_eq!(sim.protocol.window_size, 4);
        assert_eq!(sim.protocol.receive_window, 4);
        assert_eq!(sim.protocol.modulus, 8);
        assert_eq!(sim.data_channel.loss, 0.25);
        assert_eq!(sim.data_channel.min_delay, 2);
        assert_eq!(sim.data_channel.max_delay, 6);
        assert_eq!(sim.ack_channel, ChannelModel::default());
        assert_eq!(sim.seed, 9);
        assert_eq!(sim.messages, 100);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let config: FileConfig = toml::from_str(
            r#"
            [protocol]
            window_size = 16
            modulus = 16
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.to_sim_config(),
            Err(ConfigFileError::Invalid(_))
        ));
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = FileConfig::example();
        let toml = toml::to_string(&config).unwrap();
        let parsed: FileConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_sim_config_survives_file_form() {
        let sim = FileConfig::example().to_sim_config().unwrap();
        let back = FileConfig::from(&sim).to_sim_config().unwrap();
        assert_eq!(back, sim);
    }
}
