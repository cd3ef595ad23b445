//! Proximity calculation
//!
//! [`ProximityEngine::evaluate`] runs once per location update of a tracked
//! device. It reads the current snapshot of every sibling device and decides
//! whether the summary result changes:
//!
//! 1. An update from a device in an ignored zone leaves the result alone,
//!    unless every tracked device is now ignored.
//! 2. If no tracked device has a usable zone-state the result is reset.
//! 3. Devices inside the target zone win: distance 0, `arrived`.
//! 4. An update without coordinates leaves the result alone.
//! 5. Otherwise the nearest device by distance is reported, with a direction
//!    of travel only when the nearest device is the one that moved.

use ha_config::WithinTolerance;
use ha_core::{DeviceId, LocationSnapshot, SnapshotSource};
use ha_location::{round_half_even, round_to};
use ha_zone::{Zone, ZoneLookup};
use tracing::{debug, trace, warn};

use crate::{DeviceProximity, Direction, ProximityConfig, ProximityResult};

/// One location change of a tracked device
#[derive(Debug, Clone, Copy)]
pub struct LocationUpdate<'a> {
    pub device_id: &'a DeviceId,
    /// Snapshot before the change, absent on the first report
    pub old: Option<&'a LocationSnapshot>,
    pub new: &'a LocationSnapshot,
}

impl<'a> LocationUpdate<'a> {
    pub fn new(old: Option<&'a LocationSnapshot>, new: &'a LocationSnapshot) -> Self {
        Self {
            device_id: &new.device_id,
            old,
            new,
        }
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Keep the previous result
    Unchanged,
    /// Replace the previous result
    Updated(ProximityResult),
}

impl Evaluation {
    pub fn into_result(self) -> Option<ProximityResult> {
        match self {
            Self::Unchanged => None,
            Self::Updated(result) => Some(result),
        }
    }
}

/// Classify a movement delta in meters against the tolerance
///
/// Negative deltas move towards the zone. A delta whose magnitude does not
/// exceed the tolerance is within tolerance.
pub fn classify_movement(delta: f64, tolerance: f64, within: WithinTolerance) -> Direction {
    if delta < -tolerance {
        Direction::Towards
    } else if delta > tolerance {
        Direction::AwayFrom
    } else {
        match within {
            WithinTolerance::Stationary => Direction::Stationary,
            WithinTolerance::Unknown => Direction::Unknown,
        }
    }
}

/// Pure proximity calculation over a zone lookup and a snapshot source
pub struct ProximityEngine<'a, Z: ?Sized, S: ?Sized> {
    zones: &'a Z,
    snapshots: &'a S,
}

/// A tracked device with its current snapshot
struct Tracked<'c> {
    device_id: &'c DeviceId,
    snapshot: Option<LocationSnapshot>,
}

impl<'a, Z, S> ProximityEngine<'a, Z, S>
where
    Z: ZoneLookup + ?Sized,
    S: SnapshotSource + ?Sized,
{
    pub fn new(zones: &'a Z, snapshots: &'a S) -> Self {
        Self { zones, snapshots }
    }

    /// Evaluate a location update of one tracked device
    pub fn evaluate(&self, config: &ProximityConfig, update: &LocationUpdate<'_>) -> Evaluation {
        let Some(zone) = self.target_zone(config) else {
            return Evaluation::Unchanged;
        };

        let tracked = self.tracked(config, Some(update));

        if config.is_ignored(&update.new.state) {
            debug!(
                proximity = %config.name,
                device_id = %update.device_id,
                state = %update.new.state,
                "Device is in an ignored zone"
            );
            if !self.any_trackable(config, &tracked) {
                return Evaluation::Updated(ProximityResult::not_set());
            }
            return Evaluation::Unchanged;
        }

        if let Some(evaluation) = self.scan_zone_states(config, &zone, &tracked) {
            return evaluation;
        }

        let Some(new_coordinates) = update.new.coordinates else {
            debug!(
                proximity = %config.name,
                device_id = %update.device_id,
                "Update has no coordinates"
            );
            return Evaluation::Unchanged;
        };

        let distances = self.distance_table(config, &zone, &tracked);
        let Some((nearest, nearest_distance)) = nearest(&distances) else {
            return Evaluation::Unchanged;
        };

        if &nearest.device_id != update.device_id {
            trace!(proximity = %config.name, nearest = %nearest.device_id, "Nearest device did not move");
            return Evaluation::Updated(ProximityResult::new(
                round_half_even(nearest_distance),
                Direction::Unknown,
                display_name(nearest),
            ));
        }

        let name = update.new.display_name();
        let distance = round_half_even(nearest_distance);

        let old_meters = update
            .old
            .and_then(|old| old.coordinates)
            .and_then(|c| zone.distance_to(c.latitude, c.longitude));
        let new_meters = zone.distance_to(new_coordinates.latitude, new_coordinates.longitude);

        let (Some(old_meters), Some(new_meters)) = (old_meters, new_meters) else {
            return Evaluation::Updated(ProximityResult::new(distance, Direction::Unknown, name));
        };

        let delta = round_to(new_meters - old_meters, 1);
        let direction = classify_movement(delta, config.tolerance_meters, config.within_tolerance);
        debug!(
            proximity = %config.name,
            device_id = %update.device_id,
            delta,
            direction = %direction,
            "Computed direction of travel"
        );

        Evaluation::Updated(ProximityResult::new(distance, direction, name))
    }

    /// Evaluate a configuration without a triggering update
    ///
    /// Only the reset and arrival checks run; anything else keeps the
    /// current result.
    pub fn evaluate_initial(&self, config: &ProximityConfig) -> Evaluation {
        let Some(zone) = self.target_zone(config) else {
            return Evaluation::Unchanged;
        };
        let tracked = self.tracked(config, None);
        self.scan_zone_states(config, &zone, &tracked)
            .unwrap_or(Evaluation::Unchanged)
    }

    /// Evaluate a configuration after a tracked device disappeared
    ///
    /// Without a triggering device the nearest remaining device is reported
    /// with an unknown direction.
    pub fn evaluate_removal(&self, config: &ProximityConfig) -> Evaluation {
        let Some(zone) = self.target_zone(config) else {
            return Evaluation::Unchanged;
        };
        let tracked = self.tracked(config, None);
        if let Some(evaluation) = self.scan_zone_states(config, &zone, &tracked) {
            return evaluation;
        }

        let distances = self.distance_table(config, &zone, &tracked);
        let result = match nearest(&distances) {
            Some((device, distance)) => ProximityResult::new(
                round_half_even(distance),
                Direction::Unknown,
                display_name(device),
            ),
            None => ProximityResult::not_set(),
        };
        Evaluation::Updated(result)
    }

    /// Rebuild the per-device table
    ///
    /// Rows follow the configured device order; devices without a snapshot
    /// are left out. Only the device that moved gets a fresh direction, the
    /// others keep theirs unless their distance became unknown.
    pub fn device_table(
        &self,
        config: &ProximityConfig,
        update: Option<&LocationUpdate<'_>>,
        previous: &[DeviceProximity],
    ) -> Vec<DeviceProximity> {
        let Some(zone) = self.target_zone(config) else {
            return previous.to_vec();
        };
        let zone_state = zone.state_name();

        self.tracked(config, update)
            .into_iter()
            .filter_map(|tracked| {
                let snapshot = tracked.snapshot?;
                let in_ignored_zone = config.is_ignored(&snapshot.state);
                let in_zone =
                    !in_ignored_zone && !snapshot.is_unknown() && snapshot.state == zone_state;

                // Ignored zones only hide a device from the summary, not from its row
                let distance = if in_zone {
                    Some(0.0)
                } else {
                    self.display_distance(config, &zone, &snapshot)
                        .map(round_half_even)
                };

                let triggered = update.filter(|u| u.device_id == tracked.device_id);
                let direction = match (distance, triggered) {
                    (None, _) => Direction::Unknown,
                    _ if in_zone => Direction::Arrived,
                    (Some(_), Some(update)) => self.device_direction(config, &zone, update),
                    (Some(_), None) => previous
                        .iter()
                        .find(|row| &row.device_id == tracked.device_id)
                        .map(|row| row.direction)
                        .unwrap_or(Direction::Unknown),
                };

                Some(DeviceProximity {
                    device_id: tracked.device_id.clone(),
                    name: snapshot.display_name().to_string(),
                    distance,
                    direction,
                    in_ignored_zone,
                })
            })
            .collect()
    }

    fn target_zone(&self, config: &ProximityConfig) -> Option<Zone> {
        let zone = self.zones.get_zone(&config.target_zone);
        if zone.is_none() {
            warn!(
                proximity = %config.name,
                zone = %config.target_zone,
                "Target zone not found"
            );
        }
        zone
    }

    /// Current snapshots in configured order; the moving device uses its new snapshot
    fn tracked<'c>(
        &self,
        config: &'c ProximityConfig,
        update: Option<&LocationUpdate<'_>>,
    ) -> Vec<Tracked<'c>> {
        config
            .tracked_devices
            .iter()
            .map(|device_id| {
                let snapshot = match update {
                    Some(update) if update.device_id == device_id => Some(update.new.clone()),
                    _ => self.snapshots.current_snapshot(device_id),
                };
                if snapshot.is_none() {
                    trace!(proximity = %config.name, device_id = %device_id, "No snapshot for device");
                }
                Tracked {
                    device_id,
                    snapshot,
                }
            })
            .collect()
    }

    fn any_trackable(&self, config: &ProximityConfig, tracked: &[Tracked<'_>]) -> bool {
        tracked
            .iter()
            .filter_map(|t| t.snapshot.as_ref())
            .any(|s| !config.is_ignored(&s.state))
    }

    /// The reset and arrival checks
    fn scan_zone_states(
        &self,
        config: &ProximityConfig,
        zone: &Zone,
        tracked: &[Tracked<'_>],
    ) -> Option<Evaluation> {
        if !self.any_trackable(config, tracked) {
            debug!(proximity = %config.name, "No trackable devices");
            return Some(Evaluation::Updated(ProximityResult::not_set()));
        }

        let zone_state = zone.state_name();
        let in_zone: Vec<&str> = tracked
            .iter()
            .filter_map(|t| t.snapshot.as_ref())
            .filter(|s| !config.is_ignored(&s.state) && !s.is_unknown() && s.state == zone_state)
            .map(|s| s.display_name())
            .collect();

        if in_zone.is_empty() {
            return None;
        }
        debug!(proximity = %config.name, devices = ?in_zone, "Devices in zone");
        Some(Evaluation::Updated(ProximityResult::arrived(in_zone.join(", "))))
    }

    /// Distances in the display unit to one decimal, in configured order
    fn distance_table<'t>(
        &self,
        config: &ProximityConfig,
        zone: &Zone,
        tracked: &'t [Tracked<'_>],
    ) -> Vec<(&'t LocationSnapshot, f64)> {
        tracked
            .iter()
            .filter_map(|t| t.snapshot.as_ref())
            .filter(|s| !config.is_ignored(&s.state))
            .filter_map(|s| {
                self.display_distance(config, zone, s)
                    .map(|d| (s, round_to(d, 1)))
            })
            .collect()
    }

    fn display_distance(
        &self,
        config: &ProximityConfig,
        zone: &Zone,
        snapshot: &LocationSnapshot,
    ) -> Option<f64> {
        let coordinates = snapshot.coordinates?;
        match zone.distance_to(coordinates.latitude, coordinates.longitude) {
            Some(meters) if meters.is_finite() => Some(config.unit.from_meters(meters)),
            _ => {
                warn!(
                    proximity = %config.name,
                    device_id = %snapshot.device_id,
                    latitude = coordinates.latitude,
                    longitude = coordinates.longitude,
                    "Skipping device with invalid coordinates"
                );
                None
            }
        }
    }

    fn device_direction(
        &self,
        config: &ProximityConfig,
        zone: &Zone,
        update: &LocationUpdate<'_>,
    ) -> Direction {
        let meters = |snapshot: Option<&LocationSnapshot>| {
            snapshot
                .and_then(|s| s.coordinates)
                .and_then(|c| zone.distance_to(c.latitude, c.longitude))
        };
        match (meters(update.old), meters(Some(update.new))) {
            (Some(old), Some(new)) => classify_movement(
                round_to(new - old, 1),
                config.tolerance_meters,
                config.within_tolerance,
            ),
            _ => Direction::Unknown,
        }
    }
}

/// First device with the smallest distance
fn nearest<'t>(distances: &[(&'t LocationSnapshot, f64)]) -> Option<(&'t LocationSnapshot, f64)> {
    let mut best: Option<(&LocationSnapshot, f64)> = None;
    for &(snapshot, distance) in distances {
        match best {
            Some((_, current)) if distance >= current => {}
            _ => best = Some((snapshot, distance)),
        }
    }
    best
}

fn display_name(snapshot: &LocationSnapshot) -> String {
    snapshot.display_name().to_string()
}
