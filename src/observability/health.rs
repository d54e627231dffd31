//! Health check HTTP endpoint
//!
//! [`HealthState`] is the only state shared between the publish task and the
//! health responder. It is written by the supervisor and publish loop and read
//! by `GET /health`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use warp::http::StatusCode;
use warp::Filter;

/// Body reported before the first session has run
pub const NOT_STARTED: &str = "not started yet";

#[derive(Debug)]
struct HealthInner {
    healthy: AtomicBool,
    last_error: Mutex<String>,
}

/// Shared liveness flag plus last error text
#[derive(Debug, Clone)]
pub struct HealthState {
    inner: Arc<HealthInner>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HealthInner {
                healthy: AtomicBool::new(false),
                last_error: Mutex::new(NOT_STARTED.to_string()),
            }),
        }
    }

    /// A publish cycle completed
    pub fn mark_healthy(&self) {
        self.inner.healthy.store(true, Ordering::Release);
    }

    /// A session ended with `error`
    pub fn mark_unhealthy(&self, error: &str) {
        *self
            .inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = error.to_string();
        self.inner.healthy.store(false, Ordering::Release);
    }

    pub fn is_healthy(&self) -> bool {
        self.inner.healthy.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> String {
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Status code and body served by `GET /health`
    pub fn report(&self) -> (StatusCode, String) {
        let status = if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (status, self.last_error())
    }
}

/// `GET /health` route
pub fn health_routes(
    state: HealthState,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || {
            let (status, body) = state.report();
            warp::reply::with_status(body, status)
        })
}

/// HTTP health check server
pub struct HealthServer {
    state: HealthState,
    addr: SocketAddr,
}

impl HealthServer {
    pub fn new(state: HealthState, addr: SocketAddr) -> Self {
        Self { state, addr }
    }

    /// Bind and serve until the process exits
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let (bound, server) =
            warp::serve(health_routes(self.state)).try_bind_ephemeral(self.addr)?;

        tracing::info!("Starting health server on {}", bound);
        server.await;

        Ok(())
    }
}
