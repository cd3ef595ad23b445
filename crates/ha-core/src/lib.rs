//! Core types for the proximity hub
//!
//! This crate provides the fundamental types shared by the zone, tracker and
//! proximity crates: DeviceId, Coordinates, LocationSnapshot and Event.

mod device;
mod event;
mod snapshot;

pub use device::{DeviceId, DeviceIdError};
pub use event::{Event, EventData, EventType};
pub use snapshot::{Coordinates, LocationSnapshot, SnapshotSource};

/// Tracker state for a device inside the home zone
pub const STATE_HOME: &str = "home";

/// Tracker state for a device outside every active zone
pub const STATE_NOT_HOME: &str = "not_home";

/// Tracker state when the device reported nothing usable
pub const STATE_UNKNOWN: &str = "unknown";

/// Tracker state when the device is unreachable
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// Standard event types fired on the bus
pub mod events {
    use super::*;

    /// Event type for device location changes
    pub const LOCATION_CHANGED: &str = "location_changed";

    /// Data for LOCATION_CHANGED events
    ///
    /// `new_snapshot` is `None` when the device was removed from the store.
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct LocationChangedData {
        pub device_id: DeviceId,
        pub old_snapshot: Option<LocationSnapshot>,
        pub new_snapshot: Option<LocationSnapshot>,
    }

    impl EventData for LocationChangedData {
        fn event_type() -> &'static str {
            LOCATION_CHANGED
        }
    }
}
