//! Proximity monitoring for the hub
//!
//! A proximity configuration watches a set of tracked devices relative to a
//! target zone and reports three values: the distance of the nearest device
//! to the zone, that device's name, and its direction of travel.
//!
//! - [`ProximityEngine`] is the pure calculation run for one location update.
//! - [`ProximityService`] owns every configuration with its last result,
//!   dispatches location changes to the engine and hands changed results to
//!   a [`ProximitySink`].

mod config;
mod engine;
mod result;
mod service;
mod sink;

pub use config::ProximityConfig;
pub use engine::{classify_movement, Evaluation, LocationUpdate, ProximityEngine};
pub use ha_config::WithinTolerance;
pub use result::{DeviceProximity, Direction, ProximityResult, NOT_SET};
pub use service::{ProximityService, SharedProximityService};
pub use sink::{ProximitySink, ProximityUpdatedData, PROXIMITY_UPDATED};

use thiserror::Error;

/// Result type for proximity setup
pub type SetupResult<T> = Result<T, ProximityError>;

/// Errors raised while setting up a proximity configuration
///
/// Runtime updates never fail; they leave the previous result in place.
#[derive(Debug, Error)]
pub enum ProximityError {
    #[error("proximity '{name}': {source}")]
    Config {
        name: String,
        #[source]
        source: ha_config::ConfigError,
    },

    #[error("proximity '{name}' has no devices configured")]
    MissingDevices { name: String },

    #[error("proximity '{name}': zone '{zone}' not found")]
    ZoneNotFound { name: String, zone: String },

    #[error("proximity '{0}' is already configured")]
    AlreadyConfigured(String),
}
