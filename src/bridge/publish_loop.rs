//! Publish loop
//!
//! Waits on the change detector, and on every signal re-reads the device
//! cache, maps each record and publishes the result. A read failure or a lost
//! connection ends the loop with an error; the supervisor decides what
//! happens next.

use super::session::Session;
use crate::config::BridgeConfig;
use crate::cycle_span;
use crate::error::{BridgeError, BridgeResult};
use crate::mapper::{map_device, DeviceMessages};
use crate::observability::HealthState;
use crate::protocol::{is_valid_topic_level, TopicBuilder};
use crate::source::{read_devices, DeviceRecord};
use crate::transport::{ConnectionState, Transport};
use crate::watcher::{ChangeDetector, ChangeSignal};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Outcome of one publish cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub devices: usize,
    pub attributes_skipped: usize,
}

/// Map every record, keeping source order.
///
/// Records whose identifier is not a usable topic level are logged and left
/// out; one bad record must not stop the others from publishing.
pub fn plan_cycle(
    records: &[DeviceRecord],
    topics: &TopicBuilder,
    config: &BridgeConfig,
) -> BridgeResult<Vec<DeviceMessages>> {
    records
        .iter()
        .filter(|record| {
            let usable = is_valid_topic_level(&record.identifier);
            if !usable {
                warn!(
                    identifier = %record.identifier,
                    name = %record.name,
                    "Skipping device with unusable identifier"
                );
            }
            usable
        })
        .map(|record| map_device(record, topics, config).map_err(BridgeError::from))
        .collect()
}

/// Read the cache once and publish every device sequentially
pub async fn publish_cycle<T: Transport>(
    session: &Session<T>,
    source: &Path,
    config: &BridgeConfig,
) -> BridgeResult<CycleReport> {
    let records = read_devices(source)?;
    let plan = plan_cycle(&records, session.topics(), config)?;

    let mut report = CycleReport::default();
    for messages in &plan {
        session.publish_device(messages).await?;
        report.devices += 1;
        if messages.attributes_payload.is_none() {
            report.attributes_skipped += 1;
        }
    }

    Ok(report)
}

pub struct PublishLoop {
    config: Arc<BridgeConfig>,
    source: PathBuf,
    health: HealthState,
}

impl PublishLoop {
    pub fn new(config: Arc<BridgeConfig>, source: PathBuf, health: HealthState) -> Self {
        Self {
            config,
            source,
            health,
        }
    }

    /// Run until the session fails. Never returns `Ok`.
    pub async fn run<T: Transport>(
        &self,
        session: &Session<T>,
        mut detector: ChangeDetector,
    ) -> BridgeResult<Infallible> {
        let mut state_rx = session.watch_state();
        let initial = state_rx.borrow_and_update().clone();
        if let ConnectionState::Disconnected(reason) = initial {
            return Err(BridgeError::connection_lost(reason));
        }

        let mut cycle: u64 = 0;
        loop {
            tokio::select! {
                signal = detector.next() => {
                    cycle += 1;
                    self.run_cycle(session, signal)
                        .instrument(cycle_span!(cycle, ?signal))
                        .await?;
                }
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        return Err(BridgeError::connection_lost("connection state channel closed"));
                    }
                    let state = state_rx.borrow_and_update().clone();
                    if let ConnectionState::Disconnected(reason) = state {
                        return Err(BridgeError::connection_lost(reason));
                    }
                    debug!(?state, "Connection state changed");
                }
            }
        }
    }

    async fn run_cycle<T: Transport>(
        &self,
        session: &Session<T>,
        signal: ChangeSignal,
    ) -> BridgeResult<CycleReport> {
        debug!(?signal, source = %self.source.display(), "Publishing device states");

        let report = publish_cycle(session, &self.source, &self.config).await?;
        self.health.mark_healthy();

        info!(
            devices = report.devices,
            attributes_skipped = report.attributes_skipped,
            "Publish cycle complete"
        );
        Ok(report)
    }
}
