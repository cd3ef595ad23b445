//! Proximity service
//!
//! Owns every proximity configuration together with its last result and
//! per-device table. Location changes are dispatched to the engine for each
//! configuration tracking the device; changed results go to the sink.

use ha_config::{ConfigResult, ProximityEntryConfig};
use ha_core::events::LocationChangedData;
use ha_core::{DeviceId, SnapshotSource};
use ha_event_bus::{EventBus, ListenerHandle};
use ha_zone::ZoneLookup;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::{
    DeviceProximity, Evaluation, LocationUpdate, ProximityConfig, ProximityEngine, ProximityError,
    ProximityResult, ProximitySink, SetupResult,
};

/// State held for one configuration
#[derive(Debug, Clone)]
struct Entry {
    config: ProximityConfig,
    result: ProximityResult,
    devices: Vec<DeviceProximity>,
}

/// A result waiting to be handed to the sink
type Emission = (String, ProximityResult, Vec<DeviceProximity>);

/// The proximity service
pub struct ProximityService {
    zones: Arc<dyn ZoneLookup + Send + Sync>,
    snapshots: Arc<dyn SnapshotSource + Send + Sync>,
    sink: Arc<dyn ProximitySink>,
    /// Configurations keyed by name, in setup order
    entries: Mutex<IndexMap<String, Entry>>,
}

impl ProximityService {
    pub fn new(
        zones: Arc<dyn ZoneLookup + Send + Sync>,
        snapshots: Arc<dyn SnapshotSource + Send + Sync>,
        sink: Arc<dyn ProximitySink>,
    ) -> Self {
        Self {
            zones,
            snapshots,
            sink,
            entries: Mutex::new(IndexMap::new()),
        }
    }

    fn engine(&self) -> ProximityEngine<'_, dyn ZoneLookup + Send + Sync, dyn SnapshotSource + Send + Sync> {
        ProximityEngine::new(&*self.zones, &*self.snapshots)
    }

    /// Add a configuration
    ///
    /// Fails if the name is taken, no devices are tracked, or the target zone
    /// does not exist. The initial result is emitted once.
    #[instrument(skip(self, config), fields(proximity = %config.name))]
    pub fn add_config(&self, config: ProximityConfig) -> SetupResult<()> {
        config.validate()?;
        if self.zones.get_zone(&config.target_zone).is_none() {
            return Err(ProximityError::ZoneNotFound {
                name: config.name.clone(),
                zone: config.target_zone.clone(),
            });
        }

        let engine = self.engine();
        let result = engine
            .evaluate_initial(&config)
            .into_result()
            .unwrap_or_else(ProximityResult::not_set);
        let devices = engine.device_table(&config, None, &[]);

        let emission = {
            let mut entries = self.entries.lock();
            if entries.contains_key(&config.name) {
                return Err(ProximityError::AlreadyConfigured(config.name));
            }
            let name = config.name.clone();
            entries.insert(
                name.clone(),
                Entry {
                    config,
                    result: result.clone(),
                    devices: devices.clone(),
                },
            );
            (name, result, devices)
        };

        info!(state = %emission.1.state(), "Proximity configured");
        self.emit(vec![emission]);
        Ok(())
    }

    /// Set up every entry of the `proximity:` configuration section
    ///
    /// Entries that fail are logged and skipped. Returns the number of
    /// configurations added.
    pub fn setup_from_entries(
        &self,
        entries: impl IntoIterator<Item = (String, ConfigResult<ProximityEntryConfig>)>,
    ) -> usize {
        let mut added = 0;
        for (name, entry) in entries {
            let outcome = entry
                .map_err(|source| ProximityError::Config {
                    name: name.clone(),
                    source,
                })
                .and_then(|entry| ProximityConfig::from_entry(name.clone(), entry))
                .and_then(|config| self.add_config(config));

            match outcome {
                Ok(()) => added += 1,
                Err(err) => error!(proximity = %name, %err, "Failed to set up proximity"),
            }
        }
        added
    }

    /// Remove a configuration, returning it if it existed
    #[instrument(skip(self))]
    pub fn remove_config(&self, name: &str) -> Option<ProximityConfig> {
        let removed = self.entries.lock().shift_remove(name).map(|e| e.config);
        if removed.is_some() {
            debug!("Removed proximity");
        }
        removed
    }

    /// Process a location change
    ///
    /// A `None` new snapshot means the device was removed.
    #[instrument(skip(self, data), fields(device_id = %data.device_id))]
    pub fn handle_location_changed(&self, data: &LocationChangedData) {
        let engine = self.engine();
        let mut emissions = Vec::new();

        {
            let mut entries = self.entries.lock();
            for (name, entry) in entries.iter_mut() {
                if !entry.config.tracks(&data.device_id) {
                    continue;
                }

                let (evaluation, devices) = match &data.new_snapshot {
                    Some(new) => {
                        let update = LocationUpdate::new(data.old_snapshot.as_ref(), new);
                        (
                            engine.evaluate(&entry.config, &update),
                            engine.device_table(&entry.config, Some(&update), &entry.devices),
                        )
                    }
                    None => (
                        engine.evaluate_removal(&entry.config),
                        engine.device_table(&entry.config, None, &entry.devices),
                    ),
                };

                let mut changed = false;
                if let Evaluation::Updated(result) = evaluation {
                    if result != entry.result {
                        entry.result = result;
                        changed = true;
                    }
                }
                if devices != entry.devices {
                    entry.devices = devices;
                    changed = true;
                }

                if changed {
                    debug!(
                        proximity = %name,
                        state = %entry.result.state(),
                        nearest = entry.result.nearest_name(),
                        direction = %entry.result.direction_of_travel,
                        "Proximity changed"
                    );
                    emissions.push((name.clone(), entry.result.clone(), entry.devices.clone()));
                }
            }
        }

        self.emit(emissions);
    }

    /// Current result of a configuration
    pub fn result(&self, name: &str) -> Option<ProximityResult> {
        self.entries.lock().get(name).map(|e| e.result.clone())
    }

    /// Current per-device table of a configuration
    pub fn device_proximity(&self, name: &str) -> Option<Vec<DeviceProximity>> {
        self.entries.lock().get(name).map(|e| e.devices.clone())
    }

    pub fn config(&self, name: &str) -> Option<ProximityConfig> {
        self.entries.lock().get(name).map(|e| e.config.clone())
    }

    /// Configuration names in setup order
    pub fn config_names(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Rename a tracked device in every configuration
    ///
    /// Returns the number of configurations that tracked `old`.
    #[instrument(skip(self, old, new), fields(old = %old, new = %new))]
    pub fn rename_tracked_device(&self, old: &DeviceId, new: &DeviceId) -> usize {
        let mut renamed = 0;
        for entry in self.entries.lock().values_mut() {
            if !entry.config.rename_device(old, new) {
                continue;
            }
            for row in entry.devices.iter_mut().filter(|row| &row.device_id == old) {
                row.device_id = new.clone();
            }
            renamed += 1;
        }
        debug!(renamed, "Renamed tracked device");
        renamed
    }

    /// Listen for location changes on the bus
    pub fn start(self: &Arc<Self>, bus: &EventBus) -> ListenerHandle {
        let service = Arc::clone(self);
        bus.listen_typed::<LocationChangedData, _>(move |event| {
            service.handle_location_changed(&event.data)
        })
    }

    fn emit(&self, emissions: Vec<Emission>) {
        for (name, result, devices) in emissions {
            self.sink.emit_proximity_result(&name, &result, &devices);
        }
    }
}

/// Thread-safe wrapper for ProximityService
pub type SharedProximityService = Arc<ProximityService>;
