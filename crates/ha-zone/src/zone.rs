//! Zone type

use ha_core::Coordinates;
use ha_location::distance;
use serde::{Deserialize, Serialize};

use crate::{ZoneError, ZoneResult};

/// Name of the zone derived from the core location config
pub const HOME_ZONE: &str = "home";

/// A named circular region
///
/// Identity is the name, compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius in meters
    pub radius: f64,
    /// Passive zones are skipped by active zone searches
    #[serde(default)]
    pub passive: bool,
}

impl Zone {
    /// Create a validated zone
    pub fn new(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        radius: f64,
    ) -> ZoneResult<Self> {
        let zone = Self {
            name: name.into(),
            latitude,
            longitude,
            radius,
            passive: false,
        };
        zone.validate()?;
        Ok(zone)
    }

    /// The home zone built from the core location settings
    pub fn home(latitude: f64, longitude: f64, radius: f64) -> ZoneResult<Self> {
        Self::new(HOME_ZONE, latitude, longitude, radius)
    }

    pub fn with_passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    /// Check the radius and center invariants
    pub fn validate(&self) -> ZoneResult<()> {
        if self.name.is_empty() {
            return Err(ZoneError::EmptyName);
        }
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(ZoneError::InvalidRadius {
                name: self.name.clone(),
                radius: self.radius,
            });
        }
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(ZoneError::InvalidCenter {
                name: self.name.clone(),
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        Ok(())
    }

    pub fn center(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Tracker state reported by a device inside this zone
    pub fn state_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Distance in meters from the zone center, `None` for invalid input
    pub fn distance_to(&self, latitude: f64, longitude: f64) -> Option<f64> {
        distance(self.latitude, self.longitude, latitude, longitude).ok()
    }

    /// Membership test: `distance - extra_radius < radius`
    pub fn contains(&self, latitude: f64, longitude: f64, extra_radius: f64) -> bool {
        self.distance_to(latitude, longitude)
            .is_some_and(|d| d - extra_radius < self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_radius() {
        assert!(Zone::new("home", 2.1, 1.1, 10.0).is_ok());
        assert!(Zone::new("home", 2.1, 1.1, 0.0).is_ok());
        assert_eq!(
            Zone::new("home", 2.1, 1.1, -1.0),
            Err(ZoneError::InvalidRadius {
                name: "home".to_string(),
                radius: -1.0
            })
        );
        assert!(matches!(
            Zone::new("home", 2.1, 1.1, f64::NAN),
            Err(ZoneError::InvalidRadius { .. })
        ));
    }

    #[test]
    fn test_new_validates_center_and_name() {
        assert!(matches!(
            Zone::new("home", f64::NAN, 1.1, 10.0),
            Err(ZoneError::InvalidCenter { .. })
        ));
        assert_eq!(Zone::new("", 0.0, 0.0, 1.0), Err(ZoneError::EmptyName));
    }

    #[test]
    fn test_contains_center() {
        let zone = Zone::new("home", 2.1, 1.1, 10.0).unwrap();
        assert!(zone.contains(2.1, 1.1, 0.0));
        assert!(!zone.contains(20.1, 10.1, 0.0));
    }

    #[test]
    fn test_contains_boundary_is_exclusive() {
        // A zero radius zone never contains anything, not even its center
        let zone = Zone::new("point", 2.1, 1.1, 0.0).unwrap();
        assert!(!zone.contains(2.1, 1.1, 0.0));
    }

    #[test]
    fn test_contains_with_accuracy() {
        let zone = Zone::new("home", 2.1, 1.1, 5.0).unwrap();
        // roughly 8.9 m east of the center
        assert!(!zone.contains(2.1, 1.10008, 0.0));
        assert!(zone.contains(2.1, 1.10008, 5.0));
    }

    #[test]
    fn test_contains_invalid_point() {
        let zone = Zone::new("home", 2.1, 1.1, 10.0).unwrap();
        assert!(!zone.contains(f64::NAN, 1.1, 0.0));
    }

    #[test]
    fn test_state_name_is_lowercase() {
        let zone = Zone::new("Work", 0.0, 0.0, 1.0).unwrap();
        assert_eq!(zone.state_name(), "work");
    }

    #[test]
    fn test_passive_defaults_false_in_serde() {
        let zone: Zone = serde_json::from_value(serde_json::json!({
            "name": "work",
            "latitude": 100.0,
            "longitude": 100.0,
            "radius": 10.0
        }))
        .unwrap();
        assert!(!zone.passive);
    }
}
