//! # Completion Scheduler
//!
//! One deferred task per assigned ride. Each task sleeps for the trip duration
//! on `tokio::time`, deregisters itself and then runs the completion callback it
//! was given. Timers are driven by tokio's clock, so paused-time tests advance
//! trips instantly.
//!
//! A ride can only have one outstanding timer. Cancelling is supported but the
//! engine never needs it during normal operation: a driver going offline
//! mid-trip leaves the timer in place.

use crate::models::RideId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct CompletionScheduler {
    trip_duration: Duration,
    timers: Arc<DashMap<RideId, JoinHandle<()>>>,
}

impl CompletionScheduler {
    pub fn new(trip_duration: Duration) -> Self {
        Self {
            trip_duration,
            timers: Arc::new(DashMap::new()),
        }
    }

    /// Arm the completion timer for `ride_id`.
    ///
    /// Returns false, leaving the existing timer untouched, when the ride
    /// already has one.
    pub fn schedule<F, Fut>(&self, ride_id: RideId, on_fire: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        match self.timers.entry(ride_id) {
            Entry::Occupied(_) => {
                warn!(ride_id, "⚠️ SCHEDULER: completion already scheduled, ignoring");
                false
            }
            Entry::Vacant(slot) => {
                let timers = Arc::clone(&self.timers);
                let trip_duration = self.trip_duration;

                let task = tokio::spawn(async move {
                    tokio::time::sleep(trip_duration).await;
                    timers.remove(&ride_id);
                    debug!(ride_id, "⏰ SCHEDULER: trip elapsed, firing completion");
                    on_fire().await;
                });
                slot.insert(task);

                info!(
                    ride_id,
                    trip_seconds = trip_duration.as_secs(),
                    "⏱️ SCHEDULER: completion scheduled"
                );
                true
            }
        }
    }

    /// Abort the timer for `ride_id`. False when none was pending.
    pub fn cancel(&self, ride_id: RideId) -> bool {
        match self.timers.remove(&ride_id) {
            Some((_, task)) => {
                task.abort();
                debug!(ride_id, "SCHEDULER: completion cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, ride_id: RideId) -> bool {
        self.timers.contains_key(&ride_id)
    }

    pub fn scheduled_count(&self) -> usize {
        self.timers.len()
    }

    pub fn trip_duration(&self) -> Duration {
        self.trip_duration
    }

    /// Abort every outstanding timer
    pub fn shutdown(&self) -> usize {
        let rides: Vec<RideId> = self.timers.iter().map(|entry| *entry.key()).collect();
        let aborted = rides.into_iter().filter(|ride_id| self.cancel(*ride_id)).count();

        if aborted > 0 {
            info!(aborted, "🛑 SCHEDULER: outstanding completions aborted");
        }
        aborted
    }
}

impl Drop for CompletionScheduler {
    fn drop(&mut self) {
        for entry in self.timers.iter() {
            entry.value().abort();
        }
    }
}
