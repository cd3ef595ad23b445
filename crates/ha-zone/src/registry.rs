//! Zone registry
//!
//! Holds every configured zone keyed by name. Mutations take the write lock
//! for their whole duration, so readers never observe a half-applied reload.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

use crate::{Zone, ZoneError, ZoneResult};

/// Read access to zones by name
///
/// Implemented by [`ZoneRegistry`]; the proximity engine only needs this
/// lookup, which keeps it testable against fixed zone sets.
pub trait ZoneLookup {
    /// Look up a zone by name, accepting an optional `zone.` prefix
    fn get_zone(&self, name: &str) -> Option<Zone>;
}

/// The registry of all known zones
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    zones: RwLock<BTreeMap<String, Zone>>,
}

impl ZoneRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with zones
    ///
    /// Later zones with the same name replace earlier ones.
    pub fn with_zones(zones: impl IntoIterator<Item = Zone>) -> ZoneResult<Self> {
        let registry = Self::new();
        registry.reload(zones)?;
        Ok(registry)
    }

    /// Register a new zone
    #[instrument(skip(self, zone), fields(zone = %zone.name))]
    pub fn register(&self, zone: Zone) -> ZoneResult<()> {
        zone.validate()?;
        let mut zones = self.zones.write();
        if zones.contains_key(&zone.name) {
            return Err(ZoneError::AlreadyExists(zone.name));
        }
        debug!(radius = zone.radius, passive = zone.passive, "Registering zone");
        zones.insert(zone.name.clone(), zone);
        Ok(())
    }

    /// Replace an existing zone (live position/radius change)
    #[instrument(skip(self, zone), fields(zone = %zone.name))]
    pub fn update(&self, zone: Zone) -> ZoneResult<()> {
        zone.validate()?;
        let mut zones = self.zones.write();
        match zones.get_mut(&zone.name) {
            Some(existing) => {
                debug!(radius = zone.radius, passive = zone.passive, "Updating zone");
                *existing = zone;
                Ok(())
            }
            None => Err(ZoneError::NotFound(zone.name)),
        }
    }

    /// Remove a zone, returning it if it existed
    #[instrument(skip(self))]
    pub fn remove(&self, name: &str) -> Option<Zone> {
        let removed = self.zones.write().remove(strip_domain(name));
        if removed.is_some() {
            debug!("Removed zone");
        }
        removed
    }

    /// Replace the whole zone set atomically
    ///
    /// Every zone is validated before the swap; on error the registry is
    /// left untouched.
    #[instrument(skip(self, zones))]
    pub fn reload(&self, zones: impl IntoIterator<Item = Zone>) -> ZoneResult<()> {
        let mut next = BTreeMap::new();
        for zone in zones {
            zone.validate()?;
            next.insert(zone.name.clone(), zone);
        }
        debug!(count = next.len(), "Reloading zones");
        *self.zones.write() = next;
        Ok(())
    }

    /// Check if a point lies inside the named zone
    ///
    /// An unknown zone is a silent non-match.
    pub fn contains(&self, zone_name: &str, latitude: f64, longitude: f64, extra_radius: f64) -> bool {
        let zones = self.zones.read();
        match zones.get(strip_domain(zone_name)) {
            Some(zone) => zone.contains(latitude, longitude, extra_radius),
            None => {
                trace!(zone = zone_name, "Membership test against unknown zone");
                false
            }
        }
    }

    /// Find the active zone a point is in
    ///
    /// Passive zones are skipped. Among matching zones the smallest
    /// `distance - radius` wins; equal scores prefer the smaller radius, then
    /// the lexically smaller name.
    pub fn active_zone(&self, latitude: f64, longitude: f64, extra_radius: f64) -> Option<Zone> {
        let zones = self.zones.read();
        let mut best: Option<(&Zone, f64)> = None;

        for zone in zones.values().filter(|z| !z.passive) {
            let Some(dist) = zone.distance_to(latitude, longitude) else {
                continue;
            };
            if dist - extra_radius >= zone.radius {
                continue;
            }

            let score = dist - zone.radius;
            let better = match best {
                None => true,
                Some((current, current_score)) => {
                    score < current_score
                        || (score == current_score && zone.radius < current.radius)
                        || (score == current_score
                            && zone.radius == current.radius
                            && zone.name < current.name)
                }
            };
            if better {
                best = Some((zone, score));
            }
        }

        best.map(|(zone, _)| zone.clone())
    }

    /// All zones, ordered by name
    pub fn zones(&self) -> Vec<Zone> {
        self.zones.read().values().cloned().collect()
    }

    /// Non-passive zones, ordered by name
    pub fn active_zones(&self) -> Vec<Zone> {
        self.zones
            .read()
            .values()
            .filter(|z| !z.passive)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.zones.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.read().is_empty()
    }
}

impl ZoneLookup for ZoneRegistry {
    fn get_zone(&self, name: &str) -> Option<Zone> {
        self.zones.read().get(strip_domain(name)).cloned()
    }
}

impl<T: ZoneLookup + ?Sized> ZoneLookup for Arc<T> {
    fn get_zone(&self, name: &str) -> Option<Zone> {
        (**self).get_zone(name)
    }
}

/// Thread-safe wrapper for ZoneRegistry
pub type SharedZoneRegistry = Arc<ZoneRegistry>;

/// Zone names may be given as entity ids ("zone.home")
fn strip_domain(name: &str) -> &str {
    name.strip_prefix("zone.").unwrap_or(name)
}
