//! Output of computed proximity results

use ha_core::EventData;
use ha_event_bus::EventBus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

use crate::{DeviceProximity, ProximityResult};

/// Event type fired when a proximity result changes
pub const PROXIMITY_UPDATED: &str = "proximity_updated";

/// Receives every changed proximity result
pub trait ProximitySink: Send + Sync {
    fn emit_proximity_result(
        &self,
        config_name: &str,
        result: &ProximityResult,
        devices: &[DeviceProximity],
    );
}

/// Data for PROXIMITY_UPDATED events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityUpdatedData {
    pub name: String,
    pub result: ProximityResult,
    #[serde(default)]
    pub devices: Vec<DeviceProximity>,
}

impl EventData for ProximityUpdatedData {
    fn event_type() -> &'static str {
        PROXIMITY_UPDATED
    }
}

impl ProximitySink for EventBus {
    fn emit_proximity_result(
        &self,
        config_name: &str,
        result: &ProximityResult,
        devices: &[DeviceProximity],
    ) {
        trace!(proximity = config_name, state = %result.state(), "Publishing proximity result");
        self.fire_typed(ProximityUpdatedData {
            name: config_name.to_string(),
            result: result.clone(),
            devices: devices.to_vec(),
        });
    }
}

impl<T: ProximitySink + ?Sized> ProximitySink for Arc<T> {
    fn emit_proximity_result(
        &self,
        config_name: &str,
        result: &ProximityResult,
        devices: &[DeviceProximity],
    ) {
        (**self).emit_proximity_result(config_name, result, devices)
    }
}
