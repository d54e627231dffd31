//! Payload records
//!
//! Each topic has its own typed record serialized through [`encode_json`], so
//! a field name typo is a compile error rather than a silently ignored key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display name of the bridge's connectivity sensor
pub const BRIDGE_DISPLAY_NAME: &str = "Mac Airtag To MQTT";

/// Bridge availability published on the status topic and used as last will
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Online,
    Offline,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Online => "online",
            Availability::Offline => "offline",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device tracker state payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    Home,
    NotHome,
}

impl PresenceState {
    pub fn from_is_home(is_home: bool) -> Self {
        if is_home {
            PresenceState::Home
        } else {
            PresenceState::NotHome
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceState::Home => "home",
            PresenceState::NotHome => "not_home",
        }
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Home Assistant discovery doc for the bridge connectivity binary sensor.
/// Uses Home Assistant's abbreviated keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivitySensorConfig {
    pub name: String,
    #[serde(rename = "uniq_id")]
    pub unique_id: String,
    #[serde(rename = "stat_t")]
    pub state_topic: String,
    #[serde(rename = "dev_cla")]
    pub device_class: String,
    #[serde(rename = "pl_on")]
    pub payload_on: String,
    #[serde(rename = "pl_off")]
    pub payload_off: String,
}

impl ConnectivitySensorConfig {
    pub fn new(unique_id: String, state_topic: String) -> Self {
        Self {
            name: BRIDGE_DISPLAY_NAME.to_string(),
            unique_id,
            state_topic,
            device_class: "connectivity".to_string(),
            payload_on: Availability::Online.to_string(),
            payload_off: Availability::Offline.to_string(),
        }
    }
}

/// Home Assistant discovery doc for one device tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTrackerConfig {
    pub state_topic: String,
    pub name: String,
    pub unique_id: String,
    pub payload_home: String,
    pub payload_not_home: String,
    pub json_attributes_topic: String,
}

/// JSON attributes attached to a device tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAttributes {
    pub latitude: f64,
    pub longitude: f64,
    pub gps_accuracy: f64,
    pub address: String,
    pub device_type: String,
}

/// Serialize a payload record
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}
