//! Reconnect supervisor tests
//!
//! The supervisor runs on a background task with a short retry delay and is
//! observed through the mock connector and the shared health state.

mod test_helpers;

use airtag_mqtt_bridge::bridge::Supervisor;
use airtag_mqtt_bridge::observability::HealthState;
use airtag_mqtt_bridge::testing::MockConnector;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{devices_json, source_file, test_config};
use tokio::time::{sleep, timeout, Instant};

const RETRY_DELAY: Duration = Duration::from_millis(50);

/// Poll `condition` until it holds or five seconds pass
async fn eventually<F: FnMut() -> bool>(mut condition: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    false
}

type Running = (
    Arc<Supervisor<MockConnector>>,
    HealthState,
    tokio::task::JoinHandle<()>,
);

fn spawn_supervisor(connector: MockConnector, source: &std::path::Path) -> Running {
    let health = HealthState::new();
    let supervisor = Arc::new(
        Supervisor::new(connector, Arc::new(test_config(source)), health.clone())
            .with_retry_delay(RETRY_DELAY)
            .with_tick(Duration::from_secs(3600)),
    );

    let runner = supervisor.clone();
    let handle = tokio::spawn(async move {
        runner.run().await;
    });
    (supervisor, health, handle)
}

#[tokio::test]
async fn test_retries_until_connect_succeeds() {
    let file = source_file(&devices_json(&[("A1", "Keys", "123 Main St")]));
    let (supervisor, health, handle) = spawn_supervisor(MockConnector::failing(3), file.path());

    assert!(eventually(|| health.is_healthy()).await, "bridge never became healthy");
    assert_eq!(supervisor.connector().connect_attempts(), 4);
    assert_eq!(supervisor.connector().session_count().await, 1);

    let topics: Vec<_> = supervisor
        .connector()
        .get_published_messages()
        .await
        .into_iter()
        .map(|m| m.topic)
        .collect();
    assert_eq!(topics[1], "mac_airtag_to_mqtt_test/status");
    assert!(topics.contains(&"mac_airtag_to_mqtt_test/A1/state".to_string()));

    handle.abort();
}

#[tokio::test]
async fn test_connect_failure_reported_on_health() {
    let file = source_file("[]");
    let (supervisor, health, handle) =
        spawn_supervisor(MockConnector::failing(u32::MAX), file.path());

    assert!(eventually(|| health.last_error().contains("Mock connection failure")).await);
    assert!(!health.is_healthy());

    sleep(RETRY_DELAY * 4).await;
    assert!(supervisor.connector().connect_attempts() >= 2);

    handle.abort();
}

#[tokio::test]
async fn test_read_failure_marks_unhealthy_and_reconnects() {
    let file = source_file(&devices_json(&[("A1", "Keys", "123 Main St")]));
    let (supervisor, health, handle) = spawn_supervisor(MockConnector::new(), file.path());

    assert!(eventually(|| health.is_healthy()).await);

    // Keep every later session failing on read so the unhealthy state is stable.
    std::fs::write(file.path(), b"garbage").unwrap();
    supervisor
        .connector()
        .latest_session()
        .await
        .unwrap()
        .simulate_disconnect("keep-alive timeout");

    assert!(eventually(|| !health.is_healthy()).await);
    let connector = supervisor.connector();
    let mut reconnected = false;
    for _ in 0..100 {
        if connector.session_count().await >= 2 {
            reconnected = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(reconnected, "supervisor did not open a new session");
    assert!(eventually(|| health.last_error().contains("decode")).await);

    handle.abort();
}

#[tokio::test]
async fn test_recovers_after_transient_source_failure() {
    let file = source_file("not json yet");
    let (_supervisor, health, handle) = spawn_supervisor(MockConnector::new(), file.path());

    assert!(eventually(|| health.last_error().contains("decode")).await);
    assert!(!health.is_healthy());

    std::fs::write(file.path(), devices_json(&[("A1", "Keys", "1 Elm St")])).unwrap();

    let healthy = timeout(Duration::from_secs(5), async {
        while !health.is_healthy() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(healthy.is_ok(), "bridge never recovered");

    handle.abort();
}

/// Yield until the connector has seen `expected` attempts or give up
async fn settle(supervisor: &Supervisor<MockConnector>, expected: u32) -> u32 {
    for _ in 0..100 {
        if supervisor.connector().connect_attempts() >= expected {
            break;
        }
        tokio::task::yield_now().await;
    }
    supervisor.connector().connect_attempts()
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_waits_for_the_fixed_delay() {
    let file = source_file("[]");
    let config = Arc::new(test_config(file.path()));
    let retry_delay = config.retry_delay();
    assert_eq!(retry_delay, Duration::from_secs(15));

    let supervisor = Arc::new(Supervisor::new(
        MockConnector::failing(u32::MAX),
        config,
        HealthState::new(),
    ));
    let runner = supervisor.clone();
    let handle = tokio::spawn(async move {
        runner.run().await;
    });

    assert_eq!(settle(&supervisor, 1).await, 1);

    tokio::time::advance(retry_delay - Duration::from_millis(10)).await;
    assert_eq!(settle(&supervisor, 2).await, 1, "retried before the delay elapsed");

    tokio::time::advance(Duration::from_millis(20)).await;
    assert_eq!(settle(&supervisor, 2).await, 2, "no retry once the delay elapsed");

    tokio::time::advance(retry_delay - Duration::from_millis(20)).await;
    assert_eq!(settle(&supervisor, 3).await, 2);
    tokio::time::advance(Duration::from_millis(40)).await;
    assert_eq!(settle(&supervisor, 3).await, 3);

    handle.abort();
}
