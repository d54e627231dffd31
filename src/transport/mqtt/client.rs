//! Impure I/O operations for MQTT client
//!
//! This module owns the rumqttc client: the connect handshake, the background
//! task that drives the event loop, and publishing.

use super::connection::{configure_mqtt_options, ConnectionState, MqttError};
use super::message_handler::{EventRoute, MessageHandler};
use crate::config::BridgeConfig;
use crate::transport::{Connector, Transport};
use async_trait::async_trait;
use rumqttc::v5::{mqttbytes::QoS, AsyncClient, EventLoop};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// How long to wait for the broker's ConnAck
pub const CONNACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of the request channel between client and event loop
const REQUEST_CAPACITY: usize = 10;

/// One MQTT connection.
///
/// There is no transparent reconnection: the first event-loop error moves the
/// state to [`ConnectionState::Disconnected`] and the driver task exits.
/// Dropping the client aborts the driver, so the broker sees an unclean
/// disconnect and publishes the last will.
pub struct MqttClient {
    client: AsyncClient,
    state_rx: watch::Receiver<ConnectionState>,
    event_loop_handle: Option<JoinHandle<()>>,
}

impl MqttClient {
    /// Connect and wait for the ConnAck
    pub async fn connect(config: &BridgeConfig) -> Result<Self, MqttError> {
        let mqtt_options = configure_mqtt_options(config);
        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let handle = tokio::spawn(Self::drive_event_loop(event_loop, state_tx));

        if let Err(e) = Self::wait_for_connection_confirmation(state_rx.clone(), CONNACK_TIMEOUT).await
        {
            handle.abort();
            return Err(e);
        }

        Ok(Self {
            client,
            state_rx,
            event_loop_handle: Some(handle),
        })
    }

    /// Poll the event loop until the first error or broker disconnect
    async fn drive_event_loop(mut event_loop: EventLoop, state_tx: watch::Sender<ConnectionState>) {
        loop {
            match event_loop.poll().await {
                Ok(event) => {
                    let route = MessageHandler::route_mqtt_event(&event);
                    match &route {
                        EventRoute::PublishAcknowledged { packet_id } => {
                            debug!(target: "mqtt_transport", "Publish acknowledged: {}", packet_id);
                        }
                        EventRoute::InfrastructureEvent(event_str) => {
                            debug!(target: "mqtt_transport", "MQTT event: {}", event_str);
                        }
                        _ => {}
                    }

                    if let Some(state) = MessageHandler::next_state(&route) {
                        let terminal = matches!(state, ConnectionState::Disconnected(_));
                        if terminal {
                            info!("MQTT broker disconnected the bridge");
                        }
                        let _ = state_tx.send(state);
                        if terminal {
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!("MQTT event loop error: {}", e);
                    let _ = state_tx.send(ConnectionState::Disconnected(e.to_string()));
                    break;
                }
            }
        }
        debug!(target: "mqtt_transport", "MQTT event loop stopped");
    }

    /// Wait for connection confirmation (ConnAck) with timeout
    async fn wait_for_connection_confirmation(
        mut state_rx: watch::Receiver<ConnectionState>,
        timeout: Duration,
    ) -> Result<(), MqttError> {
        let timeout_result = tokio::time::timeout(timeout, async {
            loop {
                match &*state_rx.borrow_and_update() {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Disconnected(reason) => {
                        return Err(MqttError::ConnectionFailed(reason.clone()));
                    }
                    ConnectionState::Connecting => {}
                }
                if state_rx.changed().await.is_err() {
                    return Err(MqttError::ConnectionFailed(
                        "State channel closed".to_string(),
                    ));
                }
            }
        })
        .await;

        match timeout_result {
            Ok(result) => result,
            Err(_) => Err(MqttError::ConnectionFailed(
                "ConnAck timeout - no connection confirmation received".to_string(),
            )),
        }
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// Refuse to publish unless connected
    fn check_connection_state(&self) -> Result<(), MqttError> {
        let current_state = self.connection_state();
        if current_state != ConnectionState::Connected {
            return Err(MqttError::NotConnected {
                state: current_state,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MqttClient {
    type Error = MqttError;

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> Result<(), Self::Error> {
        self.check_connection_state()?;

        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await
            .map_err(|e| MqttError::PublishFailed(Box::new(e)))?;

        debug!(target: "mqtt_transport", topic, retain, "Published");
        Ok(())
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        if let Some(handle) = self.event_loop_handle.take() {
            handle.abort();
        }
    }
}

/// Opens [`MqttClient`] connections
#[derive(Debug, Default, Clone, Copy)]
pub struct MqttConnector;

#[async_trait]
impl Connector for MqttConnector {
    type Transport = MqttClient;
    type Error = MqttError;

    async fn connect(&self, config: &BridgeConfig) -> Result<MqttClient, MqttError> {
        MqttClient::connect(config).await
    }
}
