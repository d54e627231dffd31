//! MQTT topic layout and payload records published by the bridge

pub mod messages;
pub mod topics;

pub use messages::*;
pub use topics::{is_valid_topic_level, topic_prefix, TopicBuilder};
