//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via PINLINK_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Largest pin table the wire format can address: one bit per output.
pub const MAX_OUTPUTS: usize = 32;

/// Daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration.
    pub network: NetworkConfig,
    /// Output pin configuration.
    pub outputs: OutputsConfig,
    /// WebSocket transport configuration.
    pub ws: WsConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("PINLINK_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.network.apply_env_overrides();
        self.outputs.apply_env_overrides();
        self.ws.apply_env_overrides();
    }

    /// Validates cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.outputs.validate()
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Per-connection read timeout in milliseconds; bounds every receive
    /// wait so handlers can observe shutdown.
    pub read_timeout_ms: u64,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{}", pinlink_protocol::DEFAULT_PORT)
                .parse()
                .unwrap(),
            read_timeout_ms: 1000,
            max_connections: 64,
        }
    }
}

impl NetworkConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("PINLINK_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }

        if let Ok(timeout) = std::env::var("PINLINK_READ_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.read_timeout_ms = ms;
            }
        }

        if let Ok(max) = std::env::var("PINLINK_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                self.max_connections = n;
            }
        }
    }

    /// Returns the read timeout as a Duration.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Output pin configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputsConfig {
    /// BCM pin numbers, one per output; bit `i` of a command pattern drives
    /// `pins[i]`.
    pub pins: Vec<u8>,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        // The reference deployment wires two LEDs on BCM pins 5 and 6.
        Self { pins: vec![5, 6] }
    }
}

impl OutputsConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(pins) = std::env::var("PINLINK_OUTPUT_PINS") {
            let parsed: Result<Vec<u8>, _> =
                pins.split(',').map(|p| p.trim().parse()).collect();
            if let Ok(parsed) = parsed {
                if !parsed.is_empty() {
                    self.pins = parsed;
                }
            }
        }
    }

    /// Validates the pin table against the wire format's pattern width.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pins.is_empty() {
            return Err(ConfigError::Invalid("outputs.pins must not be empty".into()));
        }
        if self.pins.len() > MAX_OUTPUTS {
            return Err(ConfigError::Invalid(format!(
                "outputs.pins has {} entries, the command pattern addresses at most {}",
                self.pins.len(),
                MAX_OUTPUTS
            )));
        }
        Ok(())
    }
}

/// WebSocket transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WsConfig {
    /// Whether the WebSocket listener is started.
    pub enabled: bool,
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_addr: "127.0.0.1:50003".parse().unwrap(),
        }
    }
}

impl WsConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(enabled) = std::env::var("PINLINK_WS_ENABLED") {
            self.enabled = enabled == "1" || enabled.to_lowercase() == "true";
        }

        if let Ok(addr) = std::env::var("PINLINK_WS_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.network.bind_addr.port(),
            pinlink_protocol::DEFAULT_PORT
        );
        assert_eq!(config.network.read_timeout(), Duration::from_millis(1000));
        assert_eq!(config.network.max_connections, 64);
        assert_eq!(config.outputs.pins, vec![5, 6]);
        assert!(!config.ws.enabled);
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
network:
  bind_addr: "0.0.0.0:6000"
  read_timeout_ms: 250
outputs:
  pins: [17, 27, 22]
ws:
  enabled: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.network.bind_addr, "0.0.0.0:6000".parse().unwrap());
        assert_eq!(config.network.read_timeout_ms, 250);
        // Unspecified sections keep their defaults.
        assert_eq!(config.network.max_connections, 64);
        assert_eq!(config.outputs.pins, vec![17, 27, 22]);
        assert!(config.ws.enabled);
        assert_eq!(config.ws.bind_addr, "127.0.0.1:50003".parse().unwrap());
    }

    #[test]
    fn test_outputs_validation() {
        let empty = OutputsConfig { pins: vec![] };
        assert!(empty.validate().is_err());

        let too_many = OutputsConfig {
            pins: (0..=MAX_OUTPUTS as u8).collect(),
        };
        assert!(too_many.validate().is_err());

        let ok = OutputsConfig::default();
        assert!(ok.validate().is_ok());
    }
}
