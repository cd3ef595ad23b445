//! Poll interval computation

use ha_core::{DeviceId, LocationSnapshot};
use ha_location::{round_half_even, round_to};
use ha_zone::ZoneRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Battery level (percent) at or below which polling slows down
pub const LOW_BATTERY_LEVEL: u8 = 33;

/// Low battery only slows polling beyond this distance from a zone
pub const LOW_BATTERY_MIN_DISTANCE_KM: f64 = 3.0;

/// Intervals above this many minutes are treated as air travel
pub const AIR_TRAVEL_THRESHOLD_MINUTES: u32 = 180;

/// Interval used while a device is presumed to be flying
pub const AIR_TRAVEL_INTERVAL: u32 = 30;

/// How per-device intervals are combined with `max_interval`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalClamp {
    /// `max(min(intervals), max_interval)`: never poll more often than
    /// `max_interval`
    #[default]
    Floor,
    /// `min(min(intervals), max_interval)`: never poll less often than
    /// `max_interval`
    Ceiling,
}

/// One device's contribution to the next poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollInterval {
    pub device_id: DeviceId,
    pub interval_minutes: u32,
}

/// Plans the delay before the next full device refresh
#[derive(Debug, Clone)]
pub struct PollIntervalPlanner {
    zones: Arc<ZoneRegistry>,
    clamp: IntervalClamp,
    /// Fixed interval that bypasses planning
    fetch_interval: Option<u32>,
}

impl PollIntervalPlanner {
    pub fn new(zones: Arc<ZoneRegistry>) -> Self {
        Self {
            zones,
            clamp: IntervalClamp::default(),
            fetch_interval: None,
        }
    }

    pub fn with_clamp(mut self, clamp: IntervalClamp) -> Self {
        self.clamp = clamp;
        self
    }

    /// Always return `minutes` instead of planning
    pub fn with_fetch_interval(mut self, minutes: u32) -> Self {
        self.fetch_interval = Some(minutes);
        self
    }

    pub fn clamp(&self) -> IntervalClamp {
        self.clamp
    }

    /// Minutes until the next full refresh
    ///
    /// Without any contributing device the result is `max_interval`.
    pub fn plan(&self, devices: &[LocationSnapshot], max_interval: u32) -> u32 {
        if let Some(fetch_interval) = self.fetch_interval {
            trace!(fetch_interval, "Using fixed fetch interval");
            return fetch_interval;
        }

        let Some(shortest) = self
            .plan_devices(devices, max_interval)
            .into_iter()
            .map(|p| p.interval_minutes)
            .min()
        else {
            return max_interval;
        };

        let interval = match self.clamp {
            IntervalClamp::Floor => shortest.max(max_interval),
            IntervalClamp::Ceiling => shortest.min(max_interval),
        };
        debug!(shortest, max_interval, interval, clamp = ?self.clamp, "Planned poll interval");
        interval
    }

    /// Per-device intervals, skipping devices that do not contribute
    pub fn plan_devices(&self, devices: &[LocationSnapshot], max_interval: u32) -> Vec<PollInterval> {
        devices
            .iter()
            .filter_map(|device| {
                self.device_interval(device, max_interval)
                    .map(|interval_minutes| PollInterval {
                        device_id: device.device_id.clone(),
                        interval_minutes,
                    })
            })
            .collect()
    }

    fn device_interval(&self, device: &LocationSnapshot, max_interval: u32) -> Option<u32> {
        let coordinates = device.coordinates.filter(|c| c.is_finite())?;
        let (latitude, longitude) = (coordinates.latitude, coordinates.longitude);

        if let Some(zone) = self.zones.active_zone(latitude, longitude, device.gps_accuracy) {
            trace!(device_id = %device.device_id, zone = %zone.name, "Device is in a zone");
            return Some(max_interval);
        }

        let min_distance_km = self
            .zones
            .active_zones()
            .iter()
            .filter_map(|zone| zone.distance_to(latitude, longitude))
            .map(|meters| round_to(meters / 1000.0, 1))
            .min_by(f64::total_cmp);
        let Some(min_distance_km) = min_distance_km else {
            trace!(device_id = %device.device_id, "No zones to measure against");
            return None;
        };

        // Time to drive to the nearest zone at 120 km/h
        let mut interval = (round_half_even(min_distance_km / 2.0) as u32).max(1);
        if interval > AIR_TRAVEL_THRESHOLD_MINUTES {
            interval = AIR_TRAVEL_INTERVAL;
        }

        let low_battery = device
            .battery_level
            .is_some_and(|level| level <= LOW_BATTERY_LEVEL);
        if low_battery && min_distance_km > LOW_BATTERY_MIN_DISTANCE_KM {
            interval = interval.saturating_mul(2);
        }

        trace!(
            device_id = %device.device_id,
            min_distance_km,
            low_battery,
            interval,
            "Computed device poll interval"
        );
        Some(interval)
    }
}
