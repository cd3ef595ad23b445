//! Zones and the zone registry
//!
//! A zone is a named circle (center + radius in meters). The registry answers
//! membership questions: whether a point is inside a given zone, and which
//! active (non-passive) zone a point currently belongs to.

mod registry;
mod zone;

pub use registry::{SharedZoneRegistry, ZoneLookup, ZoneRegistry};
pub use zone::{Zone, HOME_ZONE};

use thiserror::Error;

/// Result type for zone operations
pub type ZoneResult<T> = Result<T, ZoneError>;

/// Errors raised by explicit zone mutations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ZoneError {
    #[error("zone name cannot be empty")]
    EmptyName,

    #[error("invalid radius for zone '{name}': {radius}")]
    InvalidRadius { name: String, radius: f64 },

    #[error("invalid center for zone '{name}': ({latitude}, {longitude})")]
    InvalidCenter {
        name: String,
        latitude: f64,
        longitude: f64,
    },

    #[error("zone already registered: {0}")]
    AlreadyExists(String),

    #[error("zone not found: {0}")]
    NotFound(String),
}
