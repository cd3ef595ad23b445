//! Proximity result types

use ha_core::DeviceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel shown when no device can be measured
pub const NOT_SET: &str = "not set";

/// Direction of travel relative to the target zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "arrived")]
    Arrived,
    #[serde(rename = "towards")]
    Towards,
    #[serde(rename = "away_from")]
    AwayFrom,
    #[serde(rename = "stationary")]
    Stationary,
    #[serde(rename = "unknown")]
    Unknown,
    #[default]
    #[serde(rename = "not set")]
    NotSet,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arrived => "arrived",
            Self::Towards => "towards",
            Self::AwayFrom => "away_from",
            Self::Stationary => "stationary",
            Self::Unknown => "unknown",
            Self::NotSet => NOT_SET,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary result of one proximity configuration
///
/// `None` for the distance or the nearest device renders as "not set".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProximityResult {
    /// Distance of the nearest device in the configured unit, rounded
    pub distance_to_zone: Option<f64>,
    pub direction_of_travel: Direction,
    /// Name of the nearest device, comma-joined when several are in the zone
    pub nearest: Option<String>,
}

impl ProximityResult {
    /// The reset result: nothing can be measured
    pub fn not_set() -> Self {
        Self::default()
    }

    /// One or more devices are inside the target zone
    pub fn arrived(nearest: impl Into<String>) -> Self {
        Self {
            distance_to_zone: Some(0.0),
            direction_of_travel: Direction::Arrived,
            nearest: Some(nearest.into()),
        }
    }

    pub fn new(distance: f64, direction: Direction, nearest: impl Into<String>) -> Self {
        Self {
            distance_to_zone: Some(distance),
            direction_of_travel: direction,
            nearest: Some(nearest.into()),
        }
    }

    /// State string: the distance without fraction, or "not set"
    pub fn state(&self) -> String {
        match self.distance_to_zone {
            Some(distance) => format!("{distance:.0}"),
            None => NOT_SET.to_string(),
        }
    }

    pub fn nearest_name(&self) -> &str {
        self.nearest.as_deref().unwrap_or(NOT_SET)
    }

    pub fn is_not_set(&self) -> bool {
        self.direction_of_travel == Direction::NotSet
    }
}

/// Per-device row of a proximity configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProximity {
    pub device_id: DeviceId,
    pub name: String,
    /// Distance in the configured unit, `None` when unknown
    pub distance: Option<f64>,
    pub direction: Direction,
    pub in_ignored_zone: bool,
}

impl DeviceProximity {
    pub fn new(device_id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            device_id,
            name: name.into(),
            distance: None,
            direction: Direction::Unknown,
            in_ignored_zone: false,
        }
    }
}
