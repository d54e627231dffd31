//! Broker session manager
//!
//! A [`Session`] is one live broker connection plus the topic layout used on
//! it. It never reconnects; when the connection goes away the session is
//! dropped and the supervisor builds a new one.

use crate::error::{BridgeError, BridgeResult};
use crate::mapper::DeviceMessages;
use crate::protocol::{encode_json, Availability, ConnectivitySensorConfig, TopicBuilder};
use crate::transport::{ConnectionState, Transport};
use tokio::sync::watch;
use tracing::{debug, info};

pub struct Session<T: Transport> {
    transport: T,
    topics: TopicBuilder,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, topics: TopicBuilder) -> Self {
        Self { transport, topics }
    }

    pub fn topics(&self) -> &TopicBuilder {
        &self.topics
    }

    /// Receiver that observes this session's connection state
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.transport.watch_state()
    }

    /// Publish the bridge's connectivity sensor, then mark it online.
    ///
    /// The discovery doc goes first so the hub knows the entity before its
    /// state arrives.
    pub async fn announce_online(&self) -> BridgeResult<()> {
        let sensor = ConnectivitySensorConfig::new(
            self.topics.connectivity_unique_id(),
            self.topics.status(),
        );
        self.publish(&self.topics.connectivity_config(), encode_json(&sensor)?, true)
            .await?;
        self.publish(
            &self.topics.status(),
            Availability::Online.as_str().as_bytes().to_vec(),
            true,
        )
        .await?;

        info!(status_topic = %self.topics.status(), "Bridge announced online");
        Ok(())
    }

    pub async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> BridgeResult<()> {
        self.transport
            .publish(topic, payload, retain)
            .await
            .map_err(BridgeError::transport)
    }

    /// Publish discovery config, state, and attributes for one device, in that order
    pub async fn publish_device(&self, messages: &DeviceMessages) -> BridgeResult<()> {
        self.publish(&messages.config_topic, messages.config_payload.clone(), true)
            .await?;
        self.publish(
            &messages.state_topic,
            messages.state.as_str().as_bytes().to_vec(),
            true,
        )
        .await?;

        match &messages.attributes_payload {
            Some(payload) => {
                self.publish(&messages.attributes_topic, payload.clone(), true)
                    .await?
            }
            None => debug!(device_id = %messages.device_id, "Skipping attributes publish"),
        }

        Ok(())
    }
}
