//! Find My device cache reader
//!
//! The cache is a JSON array of item records. Records are decoded fresh on
//! every publish cycle and never written back.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Last known position of a device.
///
/// The cache has no validity flag: an unknown position decodes as `0,0` with
/// zero accuracy and is indistinguishable from a real fix at null island.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceLocation {
    #[serde(deserialize_with = "null_as_default")]
    pub latitude: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub longitude: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub horizontal_accuracy: f64,
}

/// Reverse-geocoded address of the last known position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceAddress {
    #[serde(deserialize_with = "null_as_default")]
    pub street_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub street_address: String,
    #[serde(
        rename = "mapItemFullAddress",
        alias = "fullAddress",
        deserialize_with = "null_as_default"
    )]
    pub full_address: String,
}

/// One tracked device.
///
/// Every field tolerates `null` or absence and decodes to its zero value, so
/// one half-written record never fails the whole cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub identifier: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: DeviceLocation,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: DeviceAddress,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Source read errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read and decode the device cache at `path`
pub fn read_devices(path: &Path) -> Result<Vec<DeviceRecord>, SourceError> {
    let data = std::fs::read(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_devices(&data).map_err(|source| SourceError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode the device cache contents
pub fn parse_devices(data: &[u8]) -> Result<Vec<DeviceRecord>, serde_json::Error> {
    serde_json::from_slice(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_record() {
        let json = br#"[{
            "identifier": "A1",
            "name": "Keys",
            "location": {"latitude": 52.5, "longitude": 13.4, "horizontalAccuracy": 8.5},
            "address": {
                "streetName": "Main St",
                "streetAddress": "123 Main St",
                "mapItemFullAddress": "123 Main St, Springfield"
            },
            "batteryStatus": 1
        }]"#;

        let devices = parse_devices(json).unwrap();
        assert_eq!(devices.len(), 1);
        let device = &devices[0];
        assert_eq!(device.identifier, "A1");
        assert_eq!(device.location.horizontal_accuracy, 8.5);
        assert_eq!(device.address.street_name, "Main St");
        assert_eq!(device.address.full_address, "123 Main St, Springfield");
    }

    #[test]
    fn test_missing_location_and_address_default_to_zero() {
        let json = br#"[{"identifier": "A2", "name": "Bag", "location": null}]"#;
        let devices = parse_devices(json).unwrap();

        assert_eq!(devices[0].location, DeviceLocation::default());
        assert_eq!(devices[0].address, DeviceAddress::default());
    }

    #[test]
    fn test_null_and_missing_scalars_decode_to_zero_values() {
        let json = br#"[
            {"identifier": "A1", "name": null,
             "location": {"latitude": null, "longitude": 13.4},
             "address": {"streetName": null, "streetAddress": null, "mapItemFullAddress": null}},
            {"identifier": "B2"},
            {"name": "Orphan"}
        ]"#;
        let devices = parse_devices(json).unwrap();
        assert_eq!(devices.len(), 3);

        assert_eq!(devices[0].name, "");
        assert_eq!(devices[0].location.latitude, 0.0);
        assert_eq!(devices[0].location.longitude, 13.4);
        assert_eq!(devices[0].location.horizontal_accuracy, 0.0);
        assert_eq!(devices[0].address, DeviceAddress::default());

        assert_eq!(devices[1].identifier, "B2");
        assert_eq!(devices[1].name, "");
        assert_eq!(devices[2].identifier, "");
    }

    #[test]
    fn test_full_address_alias() {
        let json = br#"[{"identifier": "A3", "name": "Bike",
            "address": {"fullAddress": "1 Side Rd"}}]"#;
        let devices = parse_devices(json).unwrap();
        assert_eq!(devices[0].address.full_address, "1 Side Rd");
    }

    #[test]
    fn test_order_is_preserved() {
        let json = br#"[{"identifier": "z", "name": "Z"}, {"identifier": "a", "name": "A"}]"#;
        let ids: Vec<_> = parse_devices(json)
            .unwrap()
            .into_iter()
            .map(|d| d.identifier)
            .collect();
        assert_eq!(ids, vec!["z", "a"]);
    }

    #[test]
    fn test_read_devices_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"identifier": "A1", "name": "Keys"}}]"#).unwrap();

        let devices = read_devices(file.path()).unwrap();
        assert_eq!(devices.len(), 1);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = read_devices(Path::new("/definitely/not/here/Items.data"));
        assert!(matches!(result, Err(SourceError::Read { .. })));
    }

    #[test]
    fn test_malformed_file_is_decode_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let result = read_devices(file.path());
        assert!(matches!(result, Err(SourceError::Decode { .. })));
    }
}
