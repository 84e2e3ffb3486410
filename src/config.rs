//! Platform configuration parameters
//!
//! All tunable parameters for the Sensything platform.  Every field has a
//! default so a partial JSON document (stored in NVS or supplied by a
//! test) overrides only what it names.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Core platform configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    // --- Timing ---
    /// Sampling interval at boot (clamped into the board's range)
    pub default_interval_ms: u32,
    /// Period of the periodic status log line
    pub status_interval_ms: u32,

    // --- Sinks ---
    pub file_log: FileLogConfig,
    pub broker: BrokerConfig,
    pub network: NetworkConfig,
    pub radio: RadioConfig,
}

/// File log sink settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    /// Directory the storage medium is mounted at
    pub mount_point: String<32>,
    /// Artifact name prefix; names are `<prefix><n><extension>`
    pub prefix: String<16>,
    pub extension: String<8>,
    /// Buffered lines before a write to the medium
    pub flush_threshold_lines: usize,
    /// Automatic rotation period
    pub rotation_interval_ms: u32,
}

/// Message broker sink settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker host; empty disables the sink
    pub host: String<64>,
    pub port: u16,
    pub client_id: String<32>,
    /// Topic prefix for every publication
    pub base_topic: String<32>,
    /// 0, 1 or 2
    pub qos: u8,
    pub retain: bool,
    /// Minimum spacing between reconnect attempts
    pub reconnect_interval_ms: u32,
    /// Minimum sample deliveries between reconnect attempts (0 = time only)
    pub min_samples_between_attempts: u32,
}

/// Network dashboard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Bounded association attempts at bring-up
    pub attempt_budget: u8,
    pub attempt_delay_ms: u32,
    pub dashboard_port: u16,
    /// Open access point raised when no stored network is reachable, so
    /// `set_wifi` can be sent over the dashboard
    pub setup_ssid: String<32>,
}

/// Short-range radio settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Advertised name is `<prefix><board tag>`
    pub name_prefix: String<16>,
}

/// Fixed-capacity copy of a constant default.
fn text<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: 100,
            status_interval_ms: 10_000,
            file_log: FileLogConfig::default(),
            broker: BrokerConfig::default(),
            network: NetworkConfig::default(),
            radio: RadioConfig::default(),
        }
    }
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            mount_point: text("/sdcard"),
            prefix: text("sensything_"),
            extension: text(".csv"),
            flush_threshold_lines: 10,
            rotation_interval_ms: 3_600_000,
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            client_id: text("sensything"),
            base_topic: text("sensything"),
            qos: 1,
            retain: true,
            reconnect_interval_ms: 5_000,
            min_samples_between_attempts: 0,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            attempt_budget: 20,
            attempt_delay_ms: 500,
            dashboard_port: 81,
            setup_ssid: text("Sensything-Setup"),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            name_prefix: text("Sensything-"),
        }
    }
}

impl PlatformConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|_| ConfigError::ValidationFailed("config is not valid JSON"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "default_interval_ms must be > 0",
            ));
        }
        if self.status_interval_ms < 100 {
            return Err(ConfigError::ValidationFailed(
                "status_interval_ms must be >= 100",
            ));
        }
        let fl = &self.file_log;
        if fl.prefix.is_empty() || fl.extension.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "file_log prefix and extension must be non-empty",
            ));
        }
        if !(1..=100).contains(&fl.flush_threshold_lines) {
            return Err(ConfigError::ValidationFailed(
                "file_log.flush_threshold_lines must be 1-100",
            ));
        }
        if fl.rotation_interval_ms < 1_000 {
            return Err(ConfigError::ValidationFailed(
                "file_log.rotation_interval_ms must be >= 1000",
            ));
        }
        let br = &self.broker;
        if br.base_topic.is_empty() || br.base_topic.contains(['+', '#']) {
            return Err(ConfigError::ValidationFailed(
                "broker.base_topic must be non-empty and free of wildcards",
            ));
        }
        if br.qos > 2 {
            return Err(ConfigError::ValidationFailed("broker.qos must be 0-2"));
        }
        if br.port == 0 {
            return Err(ConfigError::ValidationFailed("broker.port must be > 0"));
        }
        if br.reconnect_interval_ms < 100 {
            return Err(ConfigError::ValidationFailed(
                "broker.reconnect_interval_ms must be >= 100",
            ));
        }
        if self.network.attempt_budget == 0 {
            return Err(ConfigError::ValidationFailed(
                "network.attempt_budget must be >= 1",
            ));
        }
        Ok(())
    }
}
