//! Location snapshot representing a device's last known position

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DeviceId, STATE_UNAVAILABLE, STATE_UNKNOWN};

/// Read access to the current snapshot of each device
pub trait SnapshotSource {
    fn current_snapshot(&self, device_id: &DeviceId) -> Option<LocationSnapshot>;
}

impl SnapshotSource for std::collections::HashMap<DeviceId, LocationSnapshot> {
    fn current_snapshot(&self, device_id: &DeviceId) -> Option<LocationSnapshot> {
        self.get(device_id).cloned()
    }
}

impl<T: SnapshotSource + ?Sized> SnapshotSource for std::sync::Arc<T> {
    fn current_snapshot(&self, device_id: &DeviceId) -> Option<LocationSnapshot> {
        (**self).current_snapshot(device_id)
    }
}

/// A latitude/longitude pair in degrees
///
/// Coordinates are atomic: a snapshot either has both or neither.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components are finite numbers
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Immutable view of one device's location at a point in time
///
/// The `state` field is the tracker's zone-state: a lowercase zone name
/// ("home", "work"), "not_home", or "unknown"/"unavailable".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSnapshot {
    /// The device this snapshot belongs to
    pub device_id: DeviceId,

    /// Friendly name reported by the tracker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Zone-state of the tracker
    pub state: String,

    /// Last known position, if any
    #[serde(flatten)]
    pub coordinates: Option<Coordinates>,

    /// GPS accuracy in meters
    #[serde(default)]
    pub gps_accuracy: f64,

    /// Battery level in percent (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u8>,

    /// When the location was reported
    pub timestamp: DateTime<Utc>,
}

impl LocationSnapshot {
    /// Create a snapshot without coordinates at the current time
    pub fn new(device_id: DeviceId, state: impl Into<String>) -> Self {
        Self {
            device_id,
            name: None,
            state: state.into(),
            coordinates: None,
            gps_accuracy: 0.0,
            battery_level: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates::new(latitude, longitude));
        self
    }

    pub fn with_gps_accuracy(mut self, accuracy: f64) -> Self {
        self.gps_accuracy = accuracy.max(0.0);
        self
    }

    /// Battery levels above 100 are clamped
    pub fn with_battery_level(mut self, level: u8) -> Self {
        self.battery_level = Some(level.min(100));
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }

    /// Name used in proximity output: the friendly name, or the object id
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.device_id.object_id())
    }

    /// Check if the tracker state carries no zone information
    pub fn is_unknown(&self) -> bool {
        self.state == STATE_UNKNOWN || self.state == STATE_UNAVAILABLE
    }
}

impl PartialEq for LocationSnapshot {
    fn eq(&self, other: &Self) -> bool {
        // Timestamps are not compared
        self.device_id == other.device_id
            && self.name == other.name
            && self.state == other.state
            && self.coordinates == other.coordinates
            && self.gps_accuracy == other.gps_accuracy
            && self.battery_level == other.battery_level
    }
}
