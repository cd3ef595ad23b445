//! Poll planning scenarios for a cloud account with several devices

use ha_core::{DeviceId, LocationSnapshot};
use ha_poll_planner::{IntervalClamp, PollIntervalPlanner, WakeScheduler};
use ha_zone::{Zone, ZoneRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn zones() -> Arc<ZoneRegistry> {
    Arc::new(
        ZoneRegistry::with_zones([
            Zone::home(0.0, 0.0, 100.0).unwrap(),
            Zone::new("work", 10.0, 10.0, 200.0).unwrap(),
        ])
        .unwrap(),
    )
}

fn phone(lat: f64, lon: f64) -> LocationSnapshot {
    LocationSnapshot::new(DeviceId::new("device_tracker.phone").unwrap(), "not_home")
        .with_coordinates(lat, lon)
}

#[test]
fn test_low_battery_device_five_km_out() {
    // (0, 0.045) is ~5.0 km east of home
    let device = phone(0.0, 0.045).with_battery_level(30);

    let planner = PollIntervalPlanner::new(zones());
    let intervals = planner.plan_devices(&[device.clone()], 30);
    // round(5.0 / 2) rounds half to even: 2, doubled for the low battery
    assert_eq!(intervals[0].interval_minutes, 4);

    // The floor dominates: never poll more often than max_interval
    assert_eq!(planner.plan(&[device.clone()], 30), 30);

    let ceiling = PollIntervalPlanner::new(zones()).with_clamp(IntervalClamp::Ceiling);
    assert_eq!(ceiling.plan(&[device], 30), 4);
}

#[test]
fn test_device_home_and_device_away() {
    let home = phone(0.0, 0.0);
    let away = LocationSnapshot::new(DeviceId::new("device_tracker.tablet").unwrap(), "not_home")
        .with_coordinates(0.0, 0.9);

    let planner = PollIntervalPlanner::new(zones()).with_clamp(IntervalClamp::Ceiling);
    let intervals = planner.plan_devices(&[home.clone(), away.clone()], 15);
    assert_eq!(intervals.len(), 2);
    assert_eq!(intervals[0].interval_minutes, 15);
    // ~100.1 km from home -> 50 minutes
    assert_eq!(intervals[1].interval_minutes, 50);

    assert_eq!(planner.plan(&[home, away], 15), 15);
}

#[tokio::test(start_paused = true)]
async fn test_planned_wake_is_armed_once() {
    let planner = PollIntervalPlanner::new(zones());
    let scheduler = Arc::new(WakeScheduler::new());
    let refreshes = Arc::new(AtomicUsize::new(0));

    let devices = [phone(0.0, 0.045)];
    for _ in 0..3 {
        let minutes = planner.plan(&devices, 5);
        let refreshes = refreshes.clone();
        scheduler.schedule_next_wake("account", minutes, move || {
            refreshes.fetch_add(1, Ordering::SeqCst);
        });
    }
    assert_eq!(scheduler.pending_count(), 1);

    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert!(!scheduler.is_scheduled("account"));

    scheduler.shutdown();
}
