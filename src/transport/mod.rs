//! Broker transport abstraction
//!
//! The bridge talks to the broker through [`Connector`] and [`Transport`] so
//! the session and supervisor logic can run against the in-memory mocks in
//! [`crate::testing`] as well as the rumqttc-backed [`mqtt::MqttClient`].

use crate::config::BridgeConfig;
use tokio::sync::watch;

pub mod mqtt;

pub use mqtt::ConnectionState;

/// One live broker connection
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Publish with at-least-once delivery
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool)
        -> Result<(), Self::Error>;

    /// Receiver that observes connection state changes
    fn watch_state(&self) -> watch::Receiver<ConnectionState>;

    /// Check if transport is currently connected
    fn is_connected(&self) -> bool {
        matches!(*self.watch_state().borrow(), ConnectionState::Connected)
    }
}

/// Opens broker connections.
///
/// Connect failures are returned as-is; retrying is the supervisor's job.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect(&self, config: &BridgeConfig) -> Result<Self::Transport, Self::Error>;
}
