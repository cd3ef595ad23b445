//! Zone entries from the `zone:` section

use ha_zone::Zone;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Radius used when a zone does not specify one
pub const DEFAULT_ZONE_RADIUS: f64 = 100.0;

/// One entry of the `zone:` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoneConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default)]
    pub passive: bool,
}

fn default_radius() -> f64 {
    DEFAULT_ZONE_RADIUS
}

impl ZoneConfig {
    /// Build a validated zone
    pub fn to_zone(&self) -> ConfigResult<Zone> {
        Zone::new(self.name.clone(), self.latitude, self.longitude, self.radius)
            .map(|zone| zone.with_passive(self.passive))
            .map_err(|source| ConfigError::InvalidZone {
                name: self.name.clone(),
                source,
            })
    }
}
