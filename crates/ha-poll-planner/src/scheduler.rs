//! Idempotent wake timers
//!
//! Each key (a device or configuration id) holds at most one pending wake.
//! Scheduling a key that is already pending is a no-op, so overlapping
//! planners can all ask for the next tick without stacking timers.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

#[derive(Debug)]
struct PendingWake {
    generation: u64,
    task: JoinHandle<()>,
}

/// Schedules one-shot wakes keyed by id
#[derive(Debug, Default)]
pub struct WakeScheduler {
    pending: Arc<DashMap<String, PendingWake>>,
    next_generation: AtomicU64,
    shut_down: AtomicBool,
}

impl WakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` once after `delay` unless `key` already has a pending wake
    ///
    /// Returns true if a new wake was armed. Must be called from within a
    /// tokio runtime.
    pub fn schedule<F>(&self, key: impl Into<String>, delay: Duration, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let key = key.into();
        if self.shut_down.load(Ordering::SeqCst) {
            debug!(key = %key, "Scheduler is shut down, not scheduling");
            return false;
        }

        match self.pending.entry(key.clone()) {
            Entry::Occupied(entry) if !entry.get().task.is_finished() => {
                trace!(key = %key, "Wake already pending");
                false
            }
            entry => {
                let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
                let pending = Arc::clone(&self.pending);
                let task_key = key.clone();
                let task = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    pending.remove_if(&task_key, |_, wake| wake.generation == generation);
                    trace!(key = %task_key, "Wake fired");
                    callback();
                });

                let wake = PendingWake { generation, task };
                match entry {
                    Entry::Occupied(mut entry) => {
                        entry.insert(wake);
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(wake);
                    }
                }
                debug!(key = %key, ?delay, "Scheduled wake");
                true
            }
        }
    }

    /// Schedule the next wake in whole minutes
    pub fn schedule_next_wake<F>(&self, key: impl Into<String>, delay_minutes: u32, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule(key, Duration::from_secs(u64::from(delay_minutes) * 60), callback)
    }

    /// Cancel a pending wake, returning true if one was pending
    pub fn cancel(&self, key: &str) -> bool {
        match self.pending.remove(key) {
            Some((_, wake)) => {
                wake.task.abort();
                debug!(key, "Cancelled wake");
                true
            }
            None => false,
        }
    }

    /// Check if a key has a wake that has not fired yet
    pub fn is_scheduled(&self, key: &str) -> bool {
        self.pending
            .get(key)
            .is_some_and(|wake| !wake.task.is_finished())
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .iter()
            .filter(|wake| !wake.task.is_finished())
            .count()
    }

    /// Abort every pending wake and refuse new ones
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        let keys: Vec<String> = self.pending.iter().map(|r| r.key().clone()).collect();
        for key in keys {
            self.cancel(&key);
        }
        debug!("Wake scheduler shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Drop for WakeScheduler {
    fn drop(&mut self) {
        for wake in self.pending.iter() {
            wake.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let make = {
            let count = count.clone();
            move || -> Box<dyn FnOnce() + Send> {
                let count = count.clone();
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_fires_after_delay() {
        let scheduler = WakeScheduler::new();
        let (count, callback) = counter();

        assert!(scheduler.schedule("account", Duration::from_secs(60), callback()));
        assert!(scheduler.is_scheduled("account"));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_scheduled("account"));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_pending_key_is_noop() {
        let scheduler = WakeScheduler::new();
        let (count, callback) = counter();

        assert!(scheduler.schedule("account", Duration::from_secs(60), callback()));
        assert!(!scheduler.schedule("account", Duration::from_secs(10), callback()));
        assert!(scheduler.schedule("other", Duration::from_secs(10), callback()));
        assert_eq!(scheduler.pending_count(), 2);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        // Fired keys can be armed again
        assert!(scheduler.schedule("account", Duration::from_secs(60), callback()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let scheduler = WakeScheduler::new();
        let (count, callback) = counter();

        scheduler.schedule_next_wake("account", 5, callback());
        assert!(scheduler.cancel("account"));
        assert!(!scheduler.cancel("account"));

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_rescheduling() {
        let scheduler = WakeScheduler::new();
        let (count, callback) = counter();

        scheduler.schedule("a", Duration::from_secs(60), callback());
        scheduler.schedule("b", Duration::from_secs(60), callback());
        scheduler.shutdown();

        assert!(scheduler.is_shut_down());
        assert_eq!(scheduler.pending_count(), 0);
        assert!(!scheduler.schedule("a", Duration::from_secs(1), callback()));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
