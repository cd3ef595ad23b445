//! Proximity entries from the `proximity:` section

use ha_core::DeviceId;
use ha_location::UnitOfLength;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{ConfigError, ConfigResult};

/// Tolerance in meters when an entry does not set one
pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// Default target zone
const DEFAULT_ZONE: &str = "home";

/// How movement within the tolerance is reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithinTolerance {
    #[default]
    Stationary,
    Unknown,
}

/// A validated proximity entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityEntryConfig {
    /// Target zone name, without any `zone.` prefix
    pub zone: String,
    /// Zones whose occupants are left out of the calculation
    pub ignored_zones: Vec<String>,
    /// Tracked devices in configured order, duplicates removed
    pub devices: IndexSet<DeviceId>,
    /// Minimum movement in meters to report a direction
    pub tolerance: f64,
    pub unit_of_measurement: UnitOfLength,
    pub within_tolerance: WithinTolerance,
}

/// Tolerance may be written as a number or a numeric string
#[derive(Deserialize)]
#[serde(untagged)]
enum Tolerance {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    #[serde(default)]
    zone: Option<String>,
    #[serde(default)]
    ignored_zones: Vec<String>,
    #[serde(default)]
    devices: Vec<DeviceId>,
    #[serde(default)]
    tolerance: Option<Tolerance>,
    #[serde(default)]
    unit_of_measurement: UnitOfLength,
    #[serde(default)]
    within_tolerance: WithinTolerance,
}

impl ProximityEntryConfig {
    /// Parse and validate one entry of the `proximity:` mapping
    pub fn from_yaml(name: &str, value: &Value) -> ConfigResult<Self> {
        if !value.is_mapping() {
            return Err(ConfigError::InvalidValue {
                key: format!("proximity.{name}"),
                reason: "entry must be a mapping".to_string(),
            });
        }

        let raw: RawEntry =
            serde_yaml::from_value(value.clone()).map_err(|e| ConfigError::InvalidValue {
                key: format!("proximity.{name}"),
                reason: e.to_string(),
            })?;

        let devices: IndexSet<DeviceId> = raw.devices.into_iter().collect();
        if devices.is_empty() {
            return Err(ConfigError::MissingDevices {
                name: name.to_string(),
            });
        }

        let zone = strip_zone_prefix(raw.zone.as_deref().unwrap_or(DEFAULT_ZONE));
        if zone.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: format!("proximity.{name}.zone"),
                reason: "zone name cannot be empty".to_string(),
            });
        }

        let tolerance = match raw.tolerance {
            None => DEFAULT_TOLERANCE,
            Some(Tolerance::Number(value)) => value,
            Some(Tolerance::Text(text)) => {
                text.trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: format!("proximity.{name}.tolerance"),
                        reason: format!("'{text}' is not a number"),
                    })?
            }
        };
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: format!("proximity.{name}.tolerance"),
                reason: format!("must be a non-negative number, got {tolerance}"),
            });
        }

        Ok(Self {
            zone: zone.to_string(),
            ignored_zones: raw
                .ignored_zones
                .iter()
                .map(|z| strip_zone_prefix(z).to_string())
                .collect(),
            devices,
            tolerance,
            unit_of_measurement: raw.unit_of_measurement,
            within_tolerance: raw.within_tolerance,
        })
    }
}

fn strip_zone_prefix(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix("zone.").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ConfigResult<ProximityEntryConfig> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        ProximityEntryConfig::from_yaml("home", &value)
    }

    #[test]
    fn test_full_entry() {
        let entry = parse(
            r#"
zone: work
ignored_zones: [home]
devices: [device_tracker.test1, device_tracker.test2]
tolerance: 50
unit_of_measurement: km
within_tolerance: unknown
"#,
        )
        .unwrap();
        assert_eq!(entry.zone, "work");
        assert_eq!(entry.ignored_zones, vec!["home"]);
        assert_eq!(entry.devices.len(), 2);
        assert_eq!(entry.tolerance, 50.0);
        assert_eq!(entry.unit_of_measurement, UnitOfLength::Kilometers);
        assert_eq!(entry.within_tolerance, WithinTolerance::Unknown);
    }

    #[test]
    fn test_defaults() {
        let entry = parse("devices: [device_tracker.test1]").unwrap();
        assert_eq!(entry.zone, "home");
        assert!(entry.ignored_zones.is_empty());
        assert_eq!(entry.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(entry.unit_of_measurement, UnitOfLength::Meters);
        assert_eq!(entry.within_tolerance, WithinTolerance::Stationary);
    }

    #[test]
    fn test_tolerance_as_string() {
        let entry = parse("devices: [device_tracker.test1]\ntolerance: \"1\"").unwrap();
        assert_eq!(entry.tolerance, 1.0);

        let err = parse("devices: [device_tracker.test1]\ntolerance: lots").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let err = parse("devices: [device_tracker.test1]\ntolerance: -3").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_devices() {
        let err = parse("zone: home\nignored_zones: [work]\ntolerance: 1").unwrap_err();
        assert!(matches!(err, ConfigError::MissingDevices { ref name } if name == "home"));

        let err = parse("devices: []").unwrap_err();
        assert!(matches!(err, ConfigError::MissingDevices { .. }));
    }

    #[test]
    fn test_not_a_mapping() {
        let err = parse("test").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_zone_prefix_stripped() {
        let entry = parse("zone: zone.work\nignored_zones: [zone.home]\ndevices: [device_tracker.a]")
            .unwrap();
        assert_eq!(entry.zone, "work");
        assert_eq!(entry.ignored_zones, vec!["home"]);
    }

    #[test]
    fn test_duplicate_devices_keep_first_position() {
        let entry = parse("devices: [device_tracker.b, device_tracker.a, device_tracker.b]").unwrap();
        let ids: Vec<_> = entry.devices.iter().map(|d| d.as_str()).collect();
        assert_eq!(ids, vec!["device_tracker.b", "device_tracker.a"]);
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let err = parse("devices: [device_tracker.a]\nunit_of_measurement: furlong").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
