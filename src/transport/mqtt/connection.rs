//! Pure connection state management for the MQTT client
//!
//! Connection state, transport errors, and construction of the rumqttc
//! options including the retained last will.

use crate::config::BridgeConfig;
use crate::protocol::{Availability, TopicBuilder};
use rumqttc::v5::mqttbytes::v5::LastWill;
use rumqttc::v5::{mqttbytes::QoS, MqttOptions};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Keep-alive interval negotiated with the broker
pub const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Connection state for MQTT client
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// Waiting for the broker's ConnAck
    Connecting,
    /// Successfully connected and ready for operations
    Connected,
    /// Disconnected with reason; terminal for this client
    Disconnected(String),
}

/// MQTT transport errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Publishing failed")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Not connected - current state: {state:?}")]
    NotConnected { state: ConnectionState },
}

/// Build client options from config, including credentials and the last will
pub fn configure_mqtt_options(config: &BridgeConfig) -> MqttOptions {
    let topics = TopicBuilder::new(config.topic_prefix());

    // A fresh client id per attempt keeps a stale session on the broker from
    // kicking the new connection.
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let client_id = format!("{}-{timestamp}", topics.prefix());

    let mut mqtt_options = MqttOptions::new(client_id, config.host.as_str(), config.port);

    if !config.username.is_empty() {
        mqtt_options.set_credentials(config.username.as_str(), config.password.as_str());
    }

    mqtt_options.set_keep_alive(KEEP_ALIVE);

    // Retained so hubs that subscribe later still see the bridge went away.
    let lwt = LastWill::new(
        topics.status(),
        Availability::Offline.as_str(),
        QoS::AtLeastOnce,
        true,
        None,
    );
    mqtt_options.set_last_will(lwt);

    mqtt_options
}
