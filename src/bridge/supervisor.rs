//! Reconnect supervisor
//!
//! Owns the restart policy: run a session until it fails, record the failure
//! for the health endpoint, wait a fixed delay, start over. Forever.

use super::publish_loop::PublishLoop;
use super::session::Session;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::observability::HealthState;
use crate::protocol::TopicBuilder;
use crate::session_span;
use crate::transport::Connector;
use crate::watcher::ChangeDetector;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Instrument};

pub struct Supervisor<C: Connector> {
    connector: C,
    config: Arc<BridgeConfig>,
    health: HealthState,
    retry_delay: Duration,
    tick: Duration,
}

impl<C: Connector> Supervisor<C> {
    /// Supervisor using the configured retry delay and poll interval
    pub fn new(connector: C, config: Arc<BridgeConfig>, health: HealthState) -> Self {
        let retry_delay = config.retry_delay();
        let tick = config.poll_interval();
        Self {
            connector,
            config,
            health,
            retry_delay,
            tick,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run sessions back to back, never returning
    pub async fn run(&self) -> Infallible {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let e = match self
                .run_session()
                .instrument(session_span!(attempt))
                .await
            {
                Ok(never) => match never {},
                Err(e) => e,
            };

            error!(
                attempt,
                retry_in_secs = self.retry_delay.as_secs_f64(),
                "Session failed: {}",
                e
            );
            self.health.mark_unhealthy(&e.health_message());

            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// Connect, announce, watch, publish. Only returns on failure.
    pub async fn run_session(&self) -> BridgeResult<Infallible> {
        let source = self.config.source_path().ok_or_else(|| {
            BridgeError::internal_error("no device cache path configured")
        })?;

        let transport = self
            .connector
            .connect(&self.config)
            .await
            .map_err(BridgeError::transport)?;
        info!(host = %self.config.host, port = self.config.port, "Connected to MQTT broker");

        let session = Session::new(transport, TopicBuilder::new(self.config.topic_prefix()));
        session.announce_online().await?;

        let detector = ChangeDetector::watch(&source, self.tick)?;

        PublishLoop::new(self.config.clone(), source, self.health.clone())
            .run(&session, detector)
            .await
    }
}
