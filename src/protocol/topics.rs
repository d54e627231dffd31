//! Topic construction
//!
//! Every topic is a pure function of the configured prefix and, for device
//! topics, the device identifier. Display names never reach a topic, so
//! renaming a device keeps its topic tree stable.

/// Namespace shared by all bridge topics
pub const TOPIC_NAMESPACE: &str = "mac_airtag_to_mqtt";

/// Home Assistant discovery root
pub const DISCOVERY_PREFIX: &str = "homeassistant";

/// Build the topic prefix from the configured topic name
pub fn topic_prefix(topic_name: &str) -> String {
    format!("{TOPIC_NAMESPACE}_{topic_name}")
}

/// True if `level` can be used as one topic level.
///
/// Rejects empty levels, separators, wildcards and NUL.
pub fn is_valid_topic_level(level: &str) -> bool {
    !level.is_empty() && !level.contains(['/', '+', '#', '\0'])
}

/// Topic construction for one bridge instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicBuilder {
    prefix: String,
}

impl TopicBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Bridge availability: `{prefix}/status`
    pub fn status(&self) -> String {
        format!("{}/status", self.prefix)
    }

    /// Discovery doc for the bridge's own connectivity sensor
    pub fn connectivity_config(&self) -> String {
        format!(
            "{DISCOVERY_PREFIX}/binary_sensor/{}/connectivity/config",
            self.prefix
        )
    }

    /// Unique id of the connectivity sensor
    pub fn connectivity_unique_id(&self) -> String {
        format!("{}_connectivity", self.prefix)
    }

    /// `{prefix}/{device_id}/state`
    pub fn device_state(&self, device_id: &str) -> String {
        format!("{}/{device_id}/state", self.prefix)
    }

    /// `{prefix}/{device_id}/attributes`
    pub fn device_attributes(&self, device_id: &str) -> String {
        format!("{}/{device_id}/attributes", self.prefix)
    }

    /// Discovery doc for one device tracker
    pub fn device_tracker_config(&self, device_id: &str) -> String {
        format!(
            "{DISCOVERY_PREFIX}/device_tracker/{}/config",
            self.device_unique_id(device_id)
        )
    }

    /// `{prefix}_{device_id}`
    pub fn device_unique_id(&self, device_id: &str) -> String {
        format!("{}_{device_id}", self.prefix)
    }
}
