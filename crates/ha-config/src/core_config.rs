//! Core location configuration
//!
//! Parses the `homeassistant:` section, which supplies the home zone.

use ha_zone::{Zone, ZoneResult};
use serde::{Deserialize, Serialize};

use crate::zone_config::DEFAULT_ZONE_RADIUS;

/// The `homeassistant:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Name of the location (e.g., "Home")
    #[serde(default = "default_name")]
    pub name: String,

    /// Latitude of the home location
    #[serde(default)]
    pub latitude: f64,

    /// Longitude of the home location
    #[serde(default)]
    pub longitude: f64,

    /// Radius around the home location in meters
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_name() -> String {
    "Home".to_string()
}

fn default_radius() -> f64 {
    DEFAULT_ZONE_RADIUS
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            latitude: 0.0,
            longitude: 0.0,
            radius: default_radius(),
        }
    }
}

impl CoreConfig {
    /// The `home` zone centered on the configured location
    pub fn home_zone(&self) -> ZoneResult<Zone> {
        Zone::home(self.latitude, self.longitude, self.radius)
    }
}
