//! Session orchestration: broker session, publish loop, reconnect supervisor

pub mod publish_loop;
pub mod session;
pub mod supervisor;

pub use publish_loop::{plan_cycle, publish_cycle, CycleReport, PublishLoop};
pub use session::Session;
pub use supervisor::Supervisor;
