//! Proximity configuration

use ha_config::{ProximityEntryConfig, WithinTolerance, DEFAULT_TOLERANCE};
use ha_core::DeviceId;
use ha_location::UnitOfLength;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::{ProximityError, SetupResult};

/// One proximity configuration: which devices to watch relative to which zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityConfig {
    /// Configuration name, also the key results are emitted under
    pub name: String,
    /// Zone distances and directions are measured against
    pub target_zone: String,
    /// Zone-states that exclude a device from the calculation
    pub ignored_zones: Vec<String>,
    /// Tracked devices; iteration order is the tie-break order
    pub tracked_devices: IndexSet<DeviceId>,
    /// Movement in meters below which a device is not moving
    pub tolerance_meters: f64,
    /// Unit reported distances are expressed in
    pub unit: UnitOfLength,
    /// Classification for movement inside the tolerance
    pub within_tolerance: WithinTolerance,
}

impl ProximityConfig {
    /// Create a configuration with default tolerance and unit
    pub fn new(
        name: impl Into<String>,
        target_zone: impl Into<String>,
        devices: impl IntoIterator<Item = DeviceId>,
    ) -> Self {
        Self {
            name: name.into(),
            target_zone: target_zone.into(),
            ignored_zones: Vec::new(),
            tracked_devices: devices.into_iter().collect(),
            tolerance_meters: DEFAULT_TOLERANCE,
            unit: UnitOfLength::default(),
            within_tolerance: WithinTolerance::default(),
        }
    }

    /// Build from a parsed `proximity:` entry
    pub fn from_entry(name: impl Into<String>, entry: ProximityEntryConfig) -> SetupResult<Self> {
        let config = Self {
            name: name.into(),
            target_zone: entry.zone,
            ignored_zones: entry.ignored_zones,
            tracked_devices: entry.devices,
            tolerance_meters: entry.tolerance,
            unit: entry.unit_of_measurement,
            within_tolerance: entry.within_tolerance,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_ignored_zones<S: Into<String>>(mut self, zones: impl IntoIterator<Item = S>) -> Self {
        self.ignored_zones = zones.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tolerance(mut self, meters: f64) -> Self {
        self.tolerance_meters = meters;
        self
    }

    pub fn with_unit(mut self, unit: UnitOfLength) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_within_tolerance(mut self, within: WithinTolerance) -> Self {
        self.within_tolerance = within;
        self
    }

    /// Check the setup-time requirements that do not need the zone registry
    pub fn validate(&self) -> SetupResult<()> {
        if self.tracked_devices.is_empty() {
            return Err(ProximityError::MissingDevices {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Check if a tracker zone-state is one of the ignored zones
    pub fn is_ignored(&self, state: &str) -> bool {
        self.ignored_zones.iter().any(|zone| zone == state)
    }

    pub fn tracks(&self, device_id: &DeviceId) -> bool {
        self.tracked_devices.contains(device_id)
    }

    /// Replace a tracked device id in place, keeping its position
    ///
    /// Returns false if `old` is not tracked. If `new` was already tracked
    /// the two merge at the earlier position.
    pub fn rename_device(&mut self, old: &DeviceId, new: &DeviceId) -> bool {
        if !self.tracked_devices.contains(old) {
            return false;
        }
        self.tracked_devices = self
            .tracked_devices
            .iter()
            .map(|id| if id == old { new.clone() } else { id.clone() })
            .collect();
        true
    }
}
