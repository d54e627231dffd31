//! Test helpers and utilities for integration tests

use airtag_mqtt_bridge::BridgeConfig;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Create a test configuration reading from `source`
#[allow(dead_code)]
pub fn test_config(source: &Path) -> BridgeConfig {
    let yaml = format!(
        r#"
MQTT_HOST: localhost
MQTT_TOPIC_NAME: test
AIRTAGS_DATA_FILE: {}
HOME_STREET_NAME: Main St
HOME_STREET_ADDRESS: "123"
"#,
        source.display()
    );
    let config = BridgeConfig::from_yaml_str(&yaml).expect("Test config should parse");
    config.validate().expect("Test config should validate");
    config
}

/// One record per `(identifier, name, street_address)`, all on "Main St"
#[allow(dead_code)]
pub fn devices_json(devices: &[(&str, &str, &str)]) -> String {
    let records: Vec<_> = devices
        .iter()
        .map(|(identifier, name, street_address)| {
            serde_json::json!({
                "identifier": identifier,
                "name": name,
                "location": {"latitude": 52.5, "longitude": 13.4, "horizontalAccuracy": 10.0},
                "address": {
                    "streetName": "Main St",
                    "streetAddress": street_address,
                    "mapItemFullAddress": format!("{street_address}, Springfield"),
                },
            })
        })
        .collect();
    serde_json::Value::Array(records).to_string()
}

/// Write `content` into a fresh temp file
#[allow(dead_code)]
pub fn source_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write source");
    file.flush().expect("flush source");
    file
}
