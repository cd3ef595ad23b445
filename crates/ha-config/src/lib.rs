//! YAML configuration for the proximity hub
//!
//! One document with three optional sections:
//!
//! - `homeassistant:` - the home location, which becomes the `home` zone
//! - `zone:` - a list of additional zones
//! - `proximity:` - a mapping of proximity configuration name to entry
//!
//! # Example
//!
//! ```ignore
//! use ha_config::load_config;
//!
//! let config = load_config("/config/configuration.yaml")?;
//! let zones = config.zones()?;
//! for (name, entry) in config.proximity_entries() {
//!     let entry = entry?;
//!     println!("{name} tracks {} devices", entry.devices.len());
//! }
//! ```

mod core_config;
mod error;
mod loader;
mod proximity_config;
mod zone_config;

pub use core_config::CoreConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, HubConfig};
pub use proximity_config::{ProximityEntryConfig, WithinTolerance, DEFAULT_TOLERANCE};
pub use zone_config::{ZoneConfig, DEFAULT_ZONE_RADIUS};

// Re-export serde_yaml::Value for convenience
pub use serde_yaml::Value;
