//! Device state mapping
//!
//! Pure translation of one [`DeviceRecord`] into the discovery, state and
//! attribute messages published for it.

use crate::config::BridgeConfig;
use crate::protocol::{
    encode_json, DeviceAttributes, DeviceTrackerConfig, PresenceState, TopicBuilder,
};
use crate::source::{DeviceAddress, DeviceRecord};
use tracing::error;

/// Outgoing messages for one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceMessages {
    pub device_id: String,
    pub config_topic: String,
    pub config_payload: Vec<u8>,
    pub state_topic: String,
    pub state: PresenceState,
    pub attributes_topic: String,
    /// `None` when the attributes could not be serialized; that publish is skipped
    pub attributes_payload: Option<Vec<u8>>,
}

/// Display name shown in Home Assistant
pub fn display_name(name: &str, config: &BridgeConfig) -> String {
    if !config.accessory_suffix.is_empty() && name.ends_with(&config.accessory_suffix) {
        format!("{} - {name}", config.airpods_name)
    } else {
        format!("{} - {name}", config.device_label)
    }
}

/// Exact street name match and street address prefix match, case-sensitive.
///
/// An address that failed to reverse-geocode never counts as home.
pub fn is_home(address: &DeviceAddress, config: &BridgeConfig) -> bool {
    if address.street_name.is_empty() || address.street_address.is_empty() {
        return false;
    }

    address.street_name == config.home_street_name
        && address
            .street_address
            .starts_with(config.home_street_address.as_str())
}

/// Build every message for one device.
///
/// Fails only if the discovery doc cannot be serialized. An attributes
/// serialization failure is logged and leaves `attributes_payload` empty.
pub fn map_device(
    record: &DeviceRecord,
    topics: &TopicBuilder,
    config: &BridgeConfig,
) -> Result<DeviceMessages, serde_json::Error> {
    let device_id = record.identifier.as_str();
    let state_topic = topics.device_state(device_id);
    let attributes_topic = topics.device_attributes(device_id);

    let tracker = DeviceTrackerConfig {
        state_topic: state_topic.clone(),
        name: display_name(&record.name, config),
        unique_id: topics.device_unique_id(device_id),
        payload_home: PresenceState::Home.to_string(),
        payload_not_home: PresenceState::NotHome.to_string(),
        json_attributes_topic: attributes_topic.clone(),
    };
    let config_payload = encode_json(&tracker)?;

    let attributes = DeviceAttributes {
        latitude: record.location.latitude,
        longitude: record.location.longitude,
        gps_accuracy: record.location.horizontal_accuracy,
        address: record.address.full_address.clone(),
        device_type: config.device_type.clone(),
    };
    let attributes_payload = match encode_json(&attributes) {
        Ok(payload) => Some(payload),
        Err(e) => {
            error!(device_id, "Failed to serialize device attributes: {}", e);
            None
        }
    };

    Ok(DeviceMessages {
        device_id: device_id.to_string(),
        config_topic: topics.device_tracker_config(device_id),
        config_payload,
        state_topic,
        state: PresenceState::from_is_home(is_home(&record.address, config)),
        attributes_topic,
        attributes_payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DeviceLocation;
    use proptest::prelude::*;
    use serde_json::Value;

    fn record(name: &str, street_name: &str, street_address: &str) -> DeviceRecord {
        DeviceRecord {
            identifier: "A1".to_string(),
            name: name.to_string(),
            location: DeviceLocation::default(),
            address: DeviceAddress {
                street_name: street_name.to_string(),
                street_address: street_address.to_string(),
                full_address: String::new(),
            },
        }
    }

    fn topics(config: &BridgeConfig) -> TopicBuilder {
        TopicBuilder::new(config.topic_prefix())
    }

    #[test]
    fn test_home_when_street_and_prefix_match() {
        let config = BridgeConfig::test_config();
        let device = record("Keys", "Main St", "123 Main St");

        let messages = map_device(&device, &topics(&config), &config).unwrap();
        assert_eq!(messages.state, PresenceState::Home);
    }

    #[test]
    fn test_not_home_on_other_house_number() {
        let config = BridgeConfig::test_config();
        let device = record("Keys", "Main St", "456 Main St");

        let messages = map_device(&device, &topics(&config), &config).unwrap();
        assert_eq!(messages.state, PresenceState::NotHome);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let config = BridgeConfig::test_config();
        assert!(!is_home(&record("Keys", "main st", "123 Main St").address, &config));
    }

    #[test]
    fn test_empty_address_is_never_home() {
        let mut config = BridgeConfig::test_config();
        config.home_street_name = String::new();
        config.home_street_address = String::new();
        assert!(!is_home(&DeviceAddress::default(), &config));
    }

    #[test]
    fn test_display_names() {
        let config = BridgeConfig::test_config();
        assert_eq!(display_name("Keys", &config), "AirTag - Keys");
        assert_eq!(display_name("Left Bud", &config), "AirPods - Left Bud");
    }

    #[test]
    fn test_attributes_default_to_zero_coordinates() {
        let config = BridgeConfig::test_config();
        let device = record("Keys", "", "");

        let messages = map_device(&device, &topics(&config), &config).unwrap();
        let attributes: Value =
            serde_json::from_slice(messages.attributes_payload.as_ref().unwrap()).unwrap();
        assert_eq!(attributes["latitude"], 0.0);
        assert_eq!(attributes["longitude"], 0.0);
        assert_eq!(attributes["gps_accuracy"], 0.0);
        assert_eq!(attributes["device_type"], "Apple AirTag");
    }

    #[test]
    fn test_discovery_doc_references_device_topics() {
        let config = BridgeConfig::test_config();
        let device = record("Keys", "Main St", "123 Main St");

        let messages = map_device(&device, &topics(&config), &config).unwrap();
        let doc: Value = serde_json::from_slice(&messages.config_payload).unwrap();
        assert_eq!(doc["name"], "AirTag - Keys");
        assert_eq!(doc["unique_id"], "mac_airtag_to_mqtt_test_A1");
        assert_eq!(doc["state_topic"], messages.state_topic.as_str());
        assert_eq!(doc["json_attributes_topic"], messages.attributes_topic.as_str());
        assert_eq!(doc["payload_home"], "home");
        assert_eq!(doc["payload_not_home"], "not_home");
    }

    proptest! {
        #[test]
        fn accessory_suffix_selects_accessory_label(base in "[A-Za-z ]{0,12}") {
            let config = BridgeConfig::test_config();
            let name = format!("{base}Bud");
            prop_assert_eq!(display_name(&name, &config), format!("AirPods - {name}"));
        }

        #[test]
        fn other_names_use_device_label(name in "[A-Za-z ]{0,12}[AC-Za-z]") {
            let config = BridgeConfig::test_config();
            prop_assume!(!name.ends_with("Bud"));
            prop_assert_eq!(display_name(&name, &config), format!("AirTag - {name}"));
        }

        #[test]
        fn renaming_keeps_topics(first in ".{0,20}", second in ".{0,20}") {
            let config = BridgeConfig::test_config();
            let mut device = record(&first, "", "");
            let a = map_device(&device, &topics(&config), &config).unwrap();
            device.name = second;
            let b = map_device(&device, &topics(&config), &config).unwrap();
            prop_assert_eq!(a.config_topic, b.config_topic);
            prop_assert_eq!(a.state_topic, b.state_topic);
            prop_assert_eq!(a.attributes_topic, b.attributes_topic);
        }
    }
}
