//! Observability: structured logging and the health-check endpoint

pub mod health;
pub mod logging;

// Re-export for convenience
pub use health::{health_routes, HealthServer, HealthState};
pub use logging::{init_default_logging, init_logging, LogFormat};

// Span macros for structured logging
pub use logging::{cycle_span, session_span};
