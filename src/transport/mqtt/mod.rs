//! rumqttc-backed broker transport
//!
//! - [`connection`] - connection state, errors, and client options including the last will
//! - [`message_handler`] - pure routing of event-loop events
//! - [`client`] - connect handshake, event-loop driver task, publishing
//!
//! # Usage
//!
//! ```rust,no_run
//! use airtag_mqtt_bridge::config::BridgeConfig;
//! use airtag_mqtt_bridge::transport::mqtt::MqttClient;
//! use airtag_mqtt_bridge::transport::Transport;
//!
//! # tokio_test::block_on(async {
//! let config = BridgeConfig::from_yaml_str("MQTT_TOPIC_NAME: home\nMAC_USER: alice")?;
//! let client = MqttClient::connect(&config).await?;
//! client.publish("mac_airtag_to_mqtt_home/status", b"online".to_vec(), true).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod message_handler;

pub use client::{MqttClient, MqttConnector};
pub use connection::{configure_mqtt_options, ConnectionState, MqttError};
pub use message_handler::{EventRoute, MessageHandler};
