//! Proximity hub
//!
//! Loads a YAML configuration, reads GPS reports as JSON lines on stdin and
//! prints every changed proximity result as a JSON line on stdout. Logs go
//! to stderr; set `RUST_LOG` to change the level.
//!
//! ```text
//! proximity-hub configuration.yaml < reports.jsonl
//! ```

use anyhow::{Context, Result};
use ha_config::HubConfig;
use ha_core::events::LocationChangedData;
use ha_event_bus::EventBus;
use ha_poll_planner::{PollIntervalPlanner, WakeScheduler};
use ha_proximity::{
    DeviceProximity, ProximityResult, ProximityService, ProximitySink, ProximityUpdatedData,
};
use ha_tracker_store::{GpsReport, TrackerStore};
use ha_zone::ZoneRegistry;
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_CONFIG_PATH: &str = "configuration.yaml";

/// Upper bound handed to the poll planner, in minutes
const MAX_POLL_INTERVAL_MINUTES: u32 = 30;

/// Wake key for the next full refresh
const POLL_WAKE_KEY: &str = "refresh";

/// Writes each proximity update as one JSON line
struct JsonLinesSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl<W: Write + Send> ProximitySink for JsonLinesSink<W> {
    fn emit_proximity_result(
        &self,
        config_name: &str,
        result: &ProximityResult,
        devices: &[DeviceProximity],
    ) {
        let data = ProximityUpdatedData {
            name: config_name.to_string(),
            result: result.clone(),
            devices: devices.to_vec(),
        };
        let line = match serde_json::to_string(&data) {
            Ok(line) => line,
            Err(err) => {
                warn!(proximity = config_name, %err, "Failed to serialize proximity update");
                return;
            }
        };

        let mut out = self.out.lock();
        if let Err(err) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            warn!(%err, "Failed to write proximity update");
        }
    }
}

/// The running hub
struct Hub {
    store: Arc<TrackerStore>,
    service: Arc<ProximityService>,
    planner: PollIntervalPlanner,
    scheduler: WakeScheduler,
}

impl Hub {
    /// Build every component from the configuration
    fn new(config: &HubConfig, sink: Arc<dyn ProximitySink>) -> Result<Self> {
        let zones = Arc::new(
            ZoneRegistry::with_zones(config.zones().context("Invalid zone configuration")?)
                .context("Invalid zone configuration")?,
        );
        info!(zones = zones.len(), "Zones loaded");

        let bus = Arc::new(EventBus::new());
        let store = Arc::new(TrackerStore::new(bus, zones.clone()));
        let service = Arc::new(ProximityService::new(zones.clone(), store.clone(), sink));

        let configured = service.setup_from_entries(config.proximity_entries());
        info!(configured, "Proximity configured");

        Ok(Self {
            store,
            service,
            planner: PollIntervalPlanner::new(zones),
            scheduler: WakeScheduler::new(),
        })
    }

    /// Store one GPS report and update every proximity tracking the device
    fn ingest(&self, report: GpsReport) {
        let device_id = report.device_id.clone();
        let old_snapshot = self.store.get(&device_id);
        let new_snapshot = self.store.report_gps(report);

        self.service.handle_location_changed(&LocationChangedData {
            device_id,
            old_snapshot,
            new_snapshot: Some(new_snapshot),
        });
    }

    /// Arm the next refresh wake from the current device set
    ///
    /// A fired wake plans the one after it, so refreshes keep going while
    /// the hub is alive.
    fn plan_next_refresh(self: &Arc<Self>) -> u32 {
        let minutes = self
            .planner
            .plan(&self.store.all(), MAX_POLL_INTERVAL_MINUTES);
        let hub = Arc::downgrade(self);
        if self.scheduler.schedule_next_wake(POLL_WAKE_KEY, minutes, move || {
            info!(minutes, "Refresh interval elapsed");
            if let Some(hub) = hub.upgrade() {
                hub.plan_next_refresh();
            }
        }) {
            debug!(minutes, "Next refresh scheduled");
        }
        minutes
    }

    /// Handle one input line; blank lines are skipped
    fn handle_line(self: &Arc<Self>, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<GpsReport>(line) {
            Ok(report) => {
                self.ingest(report);
                self.plan_next_refresh();
            }
            Err(err) => warn!(%err, "Skipping malformed GPS report"),
        }
    }

    fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}

fn load(path: &Path) -> Result<HubConfig> {
    ha_config::load_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let path = PathBuf::from(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
    );
    info!(path = %path.display(), "Starting proximity hub");

    let config = load(&path)?;
    let hub = Arc::new(Hub::new(
        &config,
        Arc::new(JsonLinesSink::new(std::io::stdout())),
    )?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => hub.handle_line(&line),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!("Shutting down");
    hub.shutdown();
    Ok(())
}
