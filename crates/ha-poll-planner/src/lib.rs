//! Poll interval planning for cloud-polled device trackers
//!
//! Some trackers are not pushed but fetched from a cloud account. After each
//! full refresh the [`PollIntervalPlanner`] decides how many minutes to wait
//! before the next one: devices far from every zone can be polled rarely,
//! devices closing in on a zone more often. The [`WakeScheduler`] arms the
//! next refresh without ever stacking duplicate timers for the same key.

mod planner;
mod scheduler;

pub use planner::{
    IntervalClamp, PollInterval, PollIntervalPlanner, AIR_TRAVEL_INTERVAL,
    AIR_TRAVEL_THRESHOLD_MINUTES, LOW_BATTERY_LEVEL, LOW_BATTERY_MIN_DISTANCE_KM,
};
pub use scheduler::WakeScheduler;
