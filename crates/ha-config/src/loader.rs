//! Configuration document loader

use ha_zone::Zone;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core_config::CoreConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::proximity_config::ProximityEntryConfig;
use crate::zone_config::ZoneConfig;

/// The parsed configuration document
///
/// Proximity entries are kept raw so that one bad entry does not prevent
/// the others from being set up.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub homeassistant: CoreConfig,

    #[serde(default)]
    pub zone: Vec<ZoneConfig>,

    #[serde(default)]
    pub proximity: IndexMap<String, Value>,
}

impl HubConfig {
    /// All zones: the home zone first, then the `zone:` entries
    ///
    /// A `zone:` entry named `home` replaces the derived home zone.
    pub fn zones(&self) -> ConfigResult<Vec<Zone>> {
        let home = self
            .homeassistant
            .home_zone()
            .map_err(|source| ConfigError::InvalidZone {
                name: "home".to_string(),
                source,
            })?;

        let mut zones: IndexMap<String, Zone> = IndexMap::new();
        zones.insert(home.name.clone(), home);
        for entry in &self.zone {
            let zone = entry.to_zone()?;
            if zones.contains_key(&zone.name) {
                debug!(zone = %zone.name, "Zone entry overrides existing zone");
            }
            zones.insert(zone.name.clone(), zone);
        }
        Ok(zones.into_values().collect())
    }

    /// Parse every proximity entry, in document order
    pub fn proximity_entries(&self) -> Vec<(String, ConfigResult<ProximityEntryConfig>)> {
        self.proximity
            .iter()
            .map(|(name, value)| (name.clone(), ProximityEntryConfig::from_yaml(name, value)))
            .collect()
    }
}

/// Load the configuration document from a file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<HubConfig> {
    let path = path.as_ref();
    debug!("Loading configuration file: {:?}", path);

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse(&content, path)
}

/// Load the configuration document from a string
pub fn load_config_str(content: &str) -> ConfigResult<HubConfig> {
    parse(content, Path::new("<string>"))
}

fn parse(content: &str, source_path: &Path) -> ConfigResult<HubConfig> {
    let value: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
        path: PathBuf::from(source_path),
        source: e,
    })?;

    match value {
        Value::Null => {
            warn!("Configuration document is empty");
            Ok(HubConfig::default())
        }
        Value::Mapping(_) => {
            serde_yaml::from_value(value).map_err(|e| ConfigError::ParseYaml {
                path: PathBuf::from(source_path),
                source: e,
            })
        }
        _ => Err(ConfigError::InvalidValue {
            key: "root".to_string(),
            reason: "configuration must be a mapping".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
homeassistant:
  latitude: 2.1
  longitude: 1.1
  radius: 10
zone:
  - name: work
    latitude: 100
    longitude: 100
    radius: 10
proximity:
  home:
    ignored_zones: [work]
    devices: [device_tracker.test1, device_tracker.test2]
    tolerance: "1"
  work:
    zone: work
    ignored_zones: [home]
    devices: [device_tracker.test1]
  broken:
    zone: home
    tolerance: 1
"#;

    #[test]
    fn test_load_from_string() {
        let config = load_config_str(CONFIG).unwrap();
        assert_eq!(config.homeassistant.latitude, 2.1);
        assert_eq!(config.zone.len(), 1);
        assert_eq!(config.proximity.len(), 3);
    }

    #[test]
    fn test_zones_include_home_first() {
        let config = load_config_str(CONFIG).unwrap();
        let zones = config.zones().unwrap();
        let names: Vec<_> = zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, vec!["home", "work"]);
        assert_eq!(zones[0].radius, 10.0);
    }

    #[test]
    fn test_zone_entry_overrides_home() {
        let config = load_config_str(
            "zone:\n  - name: home\n    latitude: 5\n    longitude: 6\n    radius: 42\n",
        )
        .unwrap();
        let zones = config.zones().unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].latitude, 5.0);
        assert_eq!(zones[0].radius, 42.0);
    }

    #[test]
    fn test_proximity_entries_fail_independently() {
        let config = load_config_str(CONFIG).unwrap();
        let entries = config.proximity_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, "home");
        assert!(entries[0].1.is_ok());
        assert_eq!(entries[1].1.as_ref().unwrap().zone, "work");
        assert!(matches!(entries[2].1, Err(ConfigError::MissingDevices { .. })));
    }

    #[test]
    fn test_empty_document() {
        let config = load_config_str("").unwrap();
        assert!(config.proximity.is_empty());
        assert_eq!(config.zones().unwrap().len(), 1);
    }

    #[test]
    fn test_root_must_be_mapping() {
        assert!(matches!(
            load_config_str("- a\n- b\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            load_config_str("proximity: [unclosed"),
            Err(ConfigError::ParseYaml { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.proximity.len(), 3);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config("/nonexistent/configuration.yaml"),
            Err(ConfigError::ReadFile { .. })
        ));
    }
}
