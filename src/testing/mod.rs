//! Testing utilities and mock implementations
//!
//! In-memory broker doubles so sessions, the publish loop, and the reconnect
//! supervisor can be exercised without a running MQTT broker.

pub mod mocks;

pub use mocks::*;
