//! Device location storage for the proximity hub
//!
//! This crate provides the TrackerStore, which keeps the latest
//! LocationSnapshot of every tracked device and fires LOCATION_CHANGED events
//! carrying the previous and new snapshot on the event bus.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ha_core::events::LocationChangedData;
use ha_core::{DeviceId, LocationSnapshot, SnapshotSource, STATE_NOT_HOME};
use ha_event_bus::EventBus;
use ha_zone::ZoneRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// A raw GPS report from a device tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsReport {
    pub device_id: DeviceId,
    #[serde(default)]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub gps_accuracy: f64,
    #[serde(default)]
    pub battery_level: Option<u8>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The tracker store holds the current snapshot of every device
///
/// The TrackerStore is responsible for:
/// - Storing the latest snapshot per device
/// - Classifying raw GPS reports into a zone-state using the zone registry
/// - Firing LOCATION_CHANGED events with old and new snapshots
pub struct TrackerStore {
    /// Latest snapshot keyed by device id
    snapshots: DashMap<DeviceId, LocationSnapshot>,
    /// Zones used to classify GPS reports
    zones: Arc<ZoneRegistry>,
    /// Event bus for firing location change events
    event_bus: Arc<EventBus>,
}

impl TrackerStore {
    /// Create a new store publishing to the given event bus
    pub fn new(event_bus: Arc<EventBus>, zones: Arc<ZoneRegistry>) -> Self {
        Self {
            snapshots: DashMap::new(),
            zones,
            event_bus,
        }
    }

    /// Store a snapshot as the device's current location
    ///
    /// Fires a LOCATION_CHANGED event and returns the previous snapshot.
    #[instrument(skip(self, snapshot), fields(device_id = %snapshot.device_id))]
    pub fn set(&self, snapshot: LocationSnapshot) -> Option<LocationSnapshot> {
        let device_id = snapshot.device_id.clone();
        let old_snapshot = self.snapshots.insert(device_id.clone(), snapshot.clone());

        debug!(
            state = %snapshot.state,
            has_coordinates = snapshot.coordinates.is_some(),
            "Setting device location"
        );

        self.event_bus.fire_typed(LocationChangedData {
            device_id,
            old_snapshot: old_snapshot.clone(),
            new_snapshot: Some(snapshot),
        });

        old_snapshot
    }

    /// Store a GPS report, deriving the zone-state from the active zone
    ///
    /// The report's accuracy widens the zone membership test.
    pub fn report_gps(&self, report: GpsReport) -> LocationSnapshot {
        let state = self
            .zones
            .active_zone(report.latitude, report.longitude, report.gps_accuracy)
            .map(|zone| zone.state_name())
            .unwrap_or_else(|| STATE_NOT_HOME.to_string());

        trace!(device_id = %report.device_id, state = %state, "Classified GPS report");

        let mut snapshot = LocationSnapshot::new(report.device_id, state)
            .with_coordinates(report.latitude, report.longitude)
            .with_gps_accuracy(report.gps_accuracy);
        if let Some(name) = report.name {
            snapshot = snapshot.with_name(name);
        }
        if let Some(level) = report.battery_level {
            snapshot = snapshot.with_battery_level(level);
        }
        if let Some(timestamp) = report.timestamp {
            snapshot = snapshot.with_timestamp(timestamp);
        }

        self.set(snapshot.clone());
        snapshot
    }

    /// Get the current snapshot of a device
    pub fn get(&self, device_id: &DeviceId) -> Option<LocationSnapshot> {
        self.snapshots.get(device_id).map(|s| s.clone())
    }

    /// Get the zone-state of a device, or None if the device is unknown
    pub fn get_state(&self, device_id: &DeviceId) -> Option<String> {
        self.snapshots.get(device_id).map(|s| s.state.clone())
    }

    /// All device ids currently stored
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.snapshots.iter().map(|r| r.key().clone()).collect()
    }

    /// All current snapshots
    pub fn all(&self) -> Vec<LocationSnapshot> {
        self.snapshots.iter().map(|r| r.value().clone()).collect()
    }

    /// Remove a device
    ///
    /// Fires a LOCATION_CHANGED event with None for the new snapshot.
    #[instrument(skip(self), fields(device_id = %device_id))]
    pub fn remove(&self, device_id: &DeviceId) -> Option<LocationSnapshot> {
        let old_snapshot = self.snapshots.remove(device_id).map(|(_, s)| s);

        if let Some(ref snapshot) = old_snapshot {
            trace!("Removing device location");
            self.event_bus.fire_typed(LocationChangedData {
                device_id: device_id.clone(),
                old_snapshot: Some(snapshot.clone()),
                new_snapshot: None,
            });
        }

        old_snapshot
    }

    /// Number of stored devices
    pub fn device_count(&self) -> usize {
        self.snapshots.len()
    }
}

impl SnapshotSource for TrackerStore {
    fn current_snapshot(&self, device_id: &DeviceId) -> Option<LocationSnapshot> {
        self.get(device_id)
    }
}

/// Thread-safe wrapper for TrackerStore
pub type SharedTrackerStore = Arc<TrackerStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use ha_zone::Zone;

    fn device(id: &str) -> DeviceId {
        DeviceId::new(id).unwrap()
    }

    fn make_store() -> (TrackerStore, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new());
        let zones = Arc::new(
            ZoneRegistry::with_zones([
                Zone::new("home", 2.1, 1.1, 10.0).unwrap(),
                Zone::new("Work", 100.0, 100.0, 10.0).unwrap(),
            ])
            .unwrap(),
        );
        (TrackerStore::new(bus.clone(), zones), bus)
    }

    fn report(id: &str, lat: f64, lon: f64) -> GpsReport {
        GpsReport {
            device_id: device(id),
            name: None,
            latitude: lat,
            longitude: lon,
            gps_accuracy: 0.0,
            battery_level: None,
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_set_fires_location_changed() {
        let (store, bus) = make_store();
        let mut rx = bus.subscribe_typed::<LocationChangedData>();

        let first = LocationSnapshot::new(device("device_tracker.test1"), "not_home")
            .with_coordinates(50.0, 50.0);
        assert!(store.set(first.clone()).is_none());

        let second = first.clone().with_coordinates(2.1, 1.1);
        let old = store.set(second.clone()).unwrap();
        assert_eq!(old, first);

        let event = rx.recv().await.unwrap();
        assert!(event.data.old_snapshot.is_none());
        assert_eq!(event.data.new_snapshot, Some(first.clone()));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.data.old_snapshot, Some(first));
        assert_eq!(event.data.new_snapshot, Some(second));
    }

    #[test]
    fn test_report_gps_classifies_zone() {
        let (store, _bus) = make_store();

        let snap = store.report_gps(report("device_tracker.test1", 2.1, 1.1));
        assert_eq!(snap.state, "home");

        let snap = store.report_gps(report("device_tracker.test1", 100.0, 100.0));
        assert_eq!(snap.state, "work");

        let snap = store.report_gps(report("device_tracker.test1", 50.0, 50.0));
        assert_eq!(snap.state, "not_home");
        assert_eq!(store.get_state(&device("device_tracker.test1")).as_deref(), Some("not_home"));
    }

    #[test]
    fn test_report_gps_keeps_metadata() {
        let (store, _bus) = make_store();
        let mut gps = report("device_tracker.test1", 50.0, 50.0);
        gps.name = Some("Phone".to_string());
        gps.battery_level = Some(30);
        gps.gps_accuracy = 12.0;

        let snap = store.report_gps(gps);
        assert_eq!(snap.display_name(), "Phone");
        assert_eq!(snap.battery_level, Some(30));
        assert_eq!(snap.gps_accuracy, 12.0);
    }

    #[test]
    fn test_report_gps_deserializes_with_defaults() {
        let gps: GpsReport = serde_json::from_value(serde_json::json!({
            "device_id": "device_tracker.test1",
            "latitude": 20.1,
            "longitude": 10.1
        }))
        .unwrap();
        assert_eq!(gps.gps_accuracy, 0.0);
        assert!(gps.battery_level.is_none());
    }

    #[test]
    fn test_remove_fires_with_none() {
        let (store, bus) = make_store();
        store.report_gps(report("device_tracker.test1", 2.1, 1.1));

        let mut rx = bus.subscribe_typed::<LocationChangedData>();
        let removed = store.remove(&device("device_tracker.test1"));
        assert!(removed.is_some());
        assert_eq!(store.device_count(), 0);

        let event = tokio_test::block_on(rx.recv()).unwrap();
        assert!(event.data.new_snapshot.is_none());
        assert_eq!(event.data.old_snapshot.unwrap().state, "home");

        assert!(store.remove(&device("device_tracker.test1")).is_none());
    }

    #[test]
    fn test_snapshot_source() {
        let (store, _bus) = make_store();
        store.report_gps(report("device_tracker.test2", 20.1, 10.1));
        let snap = store.current_snapshot(&device("device_tracker.test2")).unwrap();
        assert_eq!(snap.latitude(), Some(20.1));
        assert!(store.current_snapshot(&device("device_tracker.none")).is_none());
        assert_eq!(store.device_ids().len(), 1);
        assert_eq!(store.all().len(), 1);
    }
}
