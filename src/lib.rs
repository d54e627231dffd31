//! AirTag MQTT bridge
//!
//! Republishes the Find My device cache written by macOS as retained MQTT
//! messages, with Home Assistant discovery docs so every tracked item shows
//! up as a `device_tracker` entity.
//!
//! # Overview
//!
//! - [`watcher::ChangeDetector`] wakes the bridge on a fixed tick or when the
//!   cache file is written.
//! - [`source`] decodes the cache, [`mapper`] turns each record into topics
//!   and payloads.
//! - [`bridge::Session`] publishes over a [`transport::Transport`];
//!   [`bridge::Supervisor`] rebuilds the session after any failure.
//! - [`observability::HealthState`] backs the optional `GET /health` endpoint.
//!
//! # Quick Start
//!
//! ```rust
//! use airtag_mqtt_bridge::mapper::map_device;
//! use airtag_mqtt_bridge::protocol::{PresenceState, TopicBuilder};
//! use airtag_mqtt_bridge::source::parse_devices;
//! use airtag_mqtt_bridge::BridgeConfig;
//!
//! let config = BridgeConfig::from_yaml_str(
//!     "MQTT_TOPIC_NAME: home\nMAC_USER: alice\nHOME_STREET_NAME: Main St\nHOME_STREET_ADDRESS: \"123\"\n",
//! )
//! .unwrap();
//! let devices = parse_devices(
//!     br#"[{"identifier": "A1", "name": "Keys",
//!           "address": {"streetName": "Main St", "streetAddress": "123 Main St"}}]"#,
//! )
//! .unwrap();
//!
//! let topics = TopicBuilder::new(config.topic_prefix());
//! let messages = map_device(&devices[0], &topics, &config).unwrap();
//! assert_eq!(messages.state_topic, "mac_airtag_to_mqtt_home/A1/state");
//! assert_eq!(messages.state, PresenceState::Home);
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod mapper;
pub mod observability;
pub mod protocol;
pub mod source;
pub mod testing;
pub mod transport;
pub mod watcher;

pub use bridge::{Session, Supervisor};
pub use config::{BridgeConfig, ConfigError};
pub use error::{BridgeError, BridgeResult};
pub use transport::mqtt::{MqttClient, MqttConnector};
