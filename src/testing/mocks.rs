//! Mock implementations for testing
//!
//! Provides a recording [`MockTransport`] and a [`MockConnector`] that can be
//! told to fail a number of connect attempts before succeeding.

use crate::config::BridgeConfig;
use crate::transport::{ConnectionState, Connector, Transport};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

/// A message captured by the mock transport
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl PublishedMessage {
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).to_string()
    }
}

/// Error produced by the mocks
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MockError(pub String);

/// Mock transport for testing
#[derive(Debug, Clone)]
pub struct MockTransport {
    pub published_messages: Arc<Mutex<Vec<PublishedMessage>>>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    pub should_fail: bool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::with_log(Arc::default())
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose publishes always fail
    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Connected transport appending to a shared log
    pub fn with_log(published_messages: Arc<Mutex<Vec<PublishedMessage>>>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connected);
        Self {
            published_messages,
            state_tx: Arc::new(state_tx),
            should_fail: false,
        }
    }

    /// Mark the connection as lost
    pub fn simulate_disconnect(&self, reason: &str) {
        self.state_tx
            .send_replace(ConnectionState::Disconnected(reason.to_string()));
    }

    pub async fn get_published_messages(&self) -> Vec<PublishedMessage> {
        self.published_messages.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.published_messages.lock().await.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = MockError;

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> Result<(), Self::Error> {
        if self.should_fail {
            return Err(MockError("Mock publish failure".to_string()));
        }
        if !self.is_connected() {
            return Err(MockError("Mock transport not connected".to_string()));
        }

        self.published_messages.lock().await.push(PublishedMessage {
            topic: topic.to_string(),
            payload,
            retain,
        });
        Ok(())
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }
}

/// Mock connector for testing reconnection
#[derive(Debug, Default)]
pub struct MockConnector {
    failures_remaining: AtomicU32,
    connect_attempts: AtomicU32,
    pub published_messages: Arc<Mutex<Vec<PublishedMessage>>>,
    sessions: Mutex<Vec<MockTransport>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector that fails the first `failures` attempts
    pub fn failing(failures: u32) -> Self {
        Self {
            failures_remaining: AtomicU32::new(failures),
            ..Default::default()
        }
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub async fn get_published_messages(&self) -> Vec<PublishedMessage> {
        self.published_messages.lock().await.clone()
    }

    /// Transport handed out by the most recent successful connect
    pub async fn latest_session(&self) -> Option<MockTransport> {
        self.sessions.lock().await.last().cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;
    type Error = MockError;

    async fn connect(&self, _config: &BridgeConfig) -> Result<MockTransport, MockError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(MockError("Mock connection failure".to_string()));
        }

        let transport = MockTransport::with_log(self.published_messages.clone());
        self.sessions.lock().await.push(transport.clone());
        Ok(transport)
    }
}
