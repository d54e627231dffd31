//! Bridge configuration
//!
//! Configuration is read once at startup from a YAML file (or TOML, selected by
//! the `.toml` extension) keyed with the upper-case names used by existing
//! deployments. It is immutable for the lifetime of the process.

use crate::protocol::topics::topic_prefix;
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default broker port
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Name suffix that marks an audio accessory (e.g. "Left Bud")
pub const DEFAULT_ACCESSORY_SUFFIX: &str = "Bud";

/// Main bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    #[serde(rename = "MQTT_HOST", default = "default_host")]
    pub host: String,
    #[serde(rename = "MQTT_PORT", default = "default_port")]
    pub port: u16,
    /// Suffix of the topic namespace, see [`BridgeConfig::topic_prefix`]
    #[serde(rename = "MQTT_TOPIC_NAME", default)]
    pub topic_name: String,
    #[serde(rename = "MQTT_USERNAME", default)]
    pub username: String,
    #[serde(rename = "MQTT_PASSWORD", default)]
    pub password: String,

    /// macOS account whose Find My cache is read when no explicit file is set
    #[serde(rename = "MAC_USER", default)]
    pub mac_user: String,
    #[serde(rename = "AIRTAGS_DATA_FILE", default)]
    pub airtags_data_file: Option<PathBuf>,

    #[serde(rename = "HOME_STREET_NAME", default)]
    pub home_street_name: String,
    #[serde(rename = "HOME_STREET_ADDRESS", default)]
    pub home_street_address: String,

    /// Display label for audio accessories
    #[serde(rename = "AIRPODS_NAME", default = "default_airpods_name")]
    pub airpods_name: String,
    #[serde(rename = "ACCESSORY_SUFFIX", default = "default_accessory_suffix")]
    pub accessory_suffix: String,
    /// Display label for every other tracked device
    #[serde(rename = "DEVICE_LABEL", default = "default_device_label")]
    pub device_label: String,
    /// Value of the `device_type` attribute
    #[serde(rename = "DEVICE_TYPE", default = "default_device_type")]
    pub device_type: String,

    #[serde(rename = "HEALTHCHECK_ADDRESS", default)]
    pub healthcheck_address: Option<String>,
    #[serde(rename = "DEBUG", default)]
    pub debug: bool,

    #[serde(rename = "POLL_INTERVAL_SECS", default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(rename = "RETRY_DELAY_SECS", default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    DEFAULT_MQTT_PORT
}

fn default_airpods_name() -> String {
    "AirPods".to_string()
}

fn default_accessory_suffix() -> String {
    DEFAULT_ACCESSORY_SUFFIX.to_string()
}

fn default_device_label() -> String {
    "AirTag".to_string()
}

fn default_device_type() -> String {
    "Apple AirTag".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_retry_delay() -> u64 {
    15
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid topic name: {0}")]
    InvalidTopicName(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BridgeConfig {
    /// Load and validate configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse YAML without validating
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse TOML without validating
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Check field consistency. Called by [`BridgeConfig::load_from_file`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_topic_name(&self.topic_name)?;

        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "MQTT_HOST must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "MQTT_PORT must not be 0".to_string(),
            ));
        }
        if self.source_path().is_none() {
            return Err(ConfigError::InvalidConfig(
                "either AIRTAGS_DATA_FILE or MAC_USER must be set".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 || self.retry_delay_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "POLL_INTERVAL_SECS and RETRY_DELAY_SECS must be positive".to_string(),
            ));
        }
        if let Some(address) = &self.healthcheck_address {
            resolve_listen_addr(address).map_err(|e| {
                ConfigError::InvalidConfig(format!("HEALTHCHECK_ADDRESS '{address}': {e}"))
            })?;
        }

        Ok(())
    }

    /// Topic namespace every published topic lives under
    pub fn topic_prefix(&self) -> String {
        topic_prefix(&self.topic_name)
    }

    /// Path of the Find My device cache.
    ///
    /// An explicit `AIRTAGS_DATA_FILE` wins; otherwise the path is derived from
    /// `MAC_USER`. Returns `None` when neither is set.
    pub fn source_path(&self) -> Option<PathBuf> {
        match &self.airtags_data_file {
            Some(path) if !path.as_os_str().is_empty() => Some(path.clone()),
            _ if !self.mac_user.is_empty() => Some(default_source_path(&self.mac_user)),
            _ => None,
        }
    }

    /// Resolved health-check bind address, if one is configured
    pub fn healthcheck_addr(&self) -> Option<SocketAddr> {
        self.healthcheck_address
            .as_deref()
            .and_then(|address| resolve_listen_addr(address).ok())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Copy suitable for printing, with the broker password masked
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.password.is_empty() {
            config.password = "***".to_string();
        }
        config
    }

    /// Minimal valid configuration for unit tests
    #[cfg(test)]
    pub fn test_config() -> Self {
        let yaml = r#"
MQTT_HOST: localhost
MQTT_TOPIC_NAME: test
AIRTAGS_DATA_FILE: /tmp/Items.data
HOME_STREET_NAME: Main St
HOME_STREET_ADDRESS: "123"
"#;
        serde_yaml::from_str(yaml).expect("Test config should parse")
    }
}

/// Find My item cache location for a macOS user
pub fn default_source_path(mac_user: &str) -> PathBuf {
    PathBuf::from(format!(
        "/Users/{mac_user}/Library/Caches/com.apple.findmy.fmipcore/Items.data"
    ))
}

/// Resolve a listen address.
///
/// Accepts `ip:port`, `host:port`, and a bare `:port` meaning every interface.
pub fn resolve_listen_addr(address: &str) -> std::io::Result<SocketAddr> {
    let address = address.trim();
    let candidate = match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => address.to_string(),
    };

    candidate.to_socket_addrs()?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("'{address}' resolved to no addresses"),
        )
    })
}

/// Topic names end up inside MQTT topic levels, so wildcards and separators are refused
fn validate_topic_name(topic_name: &str) -> Result<(), ConfigError> {
    let valid_chars = topic_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if topic_name.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidTopicName(format!(
            "MQTT_TOPIC_NAME '{topic_name}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}
