//! # Driver Registry
//!
//! Owns driver records and their status transitions.
//!
//! `list_available()` performs liveness eviction as a side effect of the read:
//! online drivers whose last heartbeat is older than the liveness window are
//! demoted to offline before the list is computed. The demotion runs as one
//! atomic repository operation, and going online writes status and
//! `last_seen` together, so a driver that just came online is never evicted.
//!
//! A claimed driver records the ride that claimed it. Only that ride can hand
//! the driver back, and the binding outlives going offline or re-registering.

use crate::clock::Clock;
use crate::error::{DispatchError, DispatchResult, EntityKind};
use crate::events::{DispatchEvent, EventPublisher};
use crate::logging::log_driver_operation;
use crate::models::{Driver, DriverId, NewDriver, RideId};
use crate::repository::DriverRepository;
use crate::state_machine::DriverStatus;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct DriverRegistry {
    repository: Arc<dyn DriverRepository>,
    clock: Arc<dyn Clock>,
    liveness_window: chrono::Duration,
    events: EventPublisher,
}

impl DriverRegistry {
    pub fn new(
        repository: Arc<dyn DriverRepository>,
        clock: Arc<dyn Clock>,
        liveness_window: Duration,
        events: EventPublisher,
    ) -> Self {
        let liveness_window = chrono::Duration::from_std(liveness_window).unwrap_or_else(|_| {
            warn!(
                requested_seconds = liveness_window.as_secs(),
                "⚠️ DRIVER: liveness window out of range, capping at 52 weeks"
            );
            chrono::Duration::weeks(52)
        });
        Self {
            repository,
            clock,
            liveness_window,
            events,
        }
    }

    /// Register a driver, idempotent on `contact`.
    ///
    /// Re-registering an existing contact resets the driver to offline and
    /// returns the original id. A driver still bound to a ride stays bound.
    pub async fn register(
        &self,
        name: &str,
        contact: &str,
        location: &str,
    ) -> DispatchResult<DriverId> {
        if contact.trim().is_empty() {
            return Err(DispatchError::Validation(
                "driver contact must not be empty".to_string(),
            ));
        }

        let registration = self
            .repository
            .upsert_by_contact(NewDriver::new(name, contact, location), self.clock.now())
            .await?;
        let driver_id = registration.driver.driver_id;

        if let Some(previous) = registration.previous_status {
            if previous != registration.driver.status {
                self.events.publish(DispatchEvent::DriverStatusChanged {
                    driver_id,
                    from: previous,
                    to: registration.driver.status,
                });
            }
        }

        log_driver_operation(
            if registration.created() {
                "register"
            } else {
                "re_register"
            },
            Some(driver_id),
            &registration.driver.status.to_string(),
            Some(location),
        );

        Ok(driver_id)
    }

    pub async fn get(&self, driver_id: DriverId) -> DispatchResult<Driver> {
        self.repository
            .get(driver_id)
            .await?
            .ok_or_else(|| DispatchError::not_found(EntityKind::Driver, driver_id))
    }

    pub async fn list(&self) -> DispatchResult<Vec<Driver>> {
        self.repository.list().await
    }

    /// Unconditional status write. Going online also refreshes `last_seen`.
    pub async fn set_status(
        &self,
        driver_id: DriverId,
        status: DriverStatus,
    ) -> DispatchResult<Driver> {
        let seen_at = (status == DriverStatus::Online).then(|| self.clock.now());
        let (previous, driver) = self
            .repository
            .update_status(driver_id, status, seen_at)
            .await?;

        if previous != status {
            self.events.publish(DispatchEvent::DriverStatusChanged {
                driver_id,
                from: previous,
                to: status,
            });
        }
        log_driver_operation("set_status", Some(driver_id), &status.to_string(), None);

        Ok(driver)
    }

    /// Write `new` only if the driver is currently `expected`.
    /// Swapping to online refreshes `last_seen` in the same write.
    pub async fn set_status_if(
        &self,
        driver_id: DriverId,
        expected: DriverStatus,
        new: DriverStatus,
    ) -> DispatchResult<bool> {
        let seen_at = (new == DriverStatus::Online).then(|| self.clock.now());
        let swapped = self
            .repository
            .compare_and_set_status(driver_id, expected, new, seen_at)
            .await?;

        if swapped {
            self.events.publish(DispatchEvent::DriverStatusChanged {
                driver_id,
                from: expected,
                to: new,
            });
            debug!(driver_id, from = %expected, to = %new, "DRIVER: status swapped");
        } else {
            debug!(
                driver_id,
                expected = %expected,
                "DRIVER: status changed concurrently, swap skipped"
            );
        }

        Ok(swapped)
    }

    /// Record a heartbeat
    pub async fn touch(&self, driver_id: DriverId) -> DispatchResult<Driver> {
        self.repository.touch(driver_id, self.clock.now()).await
    }

    /// Earliest-registered online driver, without claiming it
    pub async fn first_available(&self) -> DispatchResult<Option<Driver>> {
        Ok(self
            .repository
            .list()
            .await?
            .into_iter()
            .find(Driver::is_available))
    }

    /// Atomically take the earliest-registered online driver for `ride_id`,
    /// leaving it on_trip and bound to that ride
    pub async fn claim_first_available(&self, ride_id: RideId) -> DispatchResult<Option<Driver>> {
        let claimed = self.repository.claim_first_online(ride_id).await?;

        if let Some(driver) = &claimed {
            self.events.publish(DispatchEvent::DriverStatusChanged {
                driver_id: driver.driver_id,
                from: DriverStatus::Online,
                to: DriverStatus::OnTrip,
            });
            info!(driver_id = driver.driver_id, ride_id, "🎯 DRIVER: claimed for dispatch");
        }

        Ok(claimed)
    }

    /// Hand a driver back from `ride_id`. It returns to online, with a fresh
    /// `last_seen`, only if it is still on_trip for that ride. Returns true
    /// when it did.
    pub async fn release_from_ride(
        &self,
        driver_id: DriverId,
        ride_id: RideId,
    ) -> DispatchResult<bool> {
        let released = self
            .repository
            .release_from_ride(driver_id, ride_id, self.clock.now())
            .await?;

        if released {
            self.events.publish(DispatchEvent::DriverStatusChanged {
                driver_id,
                from: DriverStatus::OnTrip,
                to: DriverStatus::Online,
            });
            debug!(driver_id, ride_id, "DRIVER: released back online");
        } else {
            debug!(
                driver_id,
                ride_id,
                "DRIVER: not on_trip for this ride, status kept"
            );
        }

        Ok(released)
    }

    /// Evict stale drivers, then list everyone still online
    pub async fn list_available(&self) -> DispatchResult<Vec<Driver>> {
        self.evict_stale().await;

        Ok(self
            .repository
            .list()
            .await?
            .into_iter()
            .filter(Driver::is_available)
            .collect())
    }

    /// Demote online drivers silent for longer than the liveness window.
    /// Failures are routine state correction and only logged.
    pub async fn evict_stale(&self) -> Vec<DriverId> {
        let cutoff = self.clock.now() - self.liveness_window;

        match self.repository.demote_stale(cutoff).await {
            Ok(demoted) => {
                for driver_id in &demoted {
                    self.events
                        .publish(DispatchEvent::DriverEvicted { driver_id: *driver_id });
                    warn!(
                        driver_id = *driver_id,
                        "💤 DRIVER: evicted after missing heartbeats"
                    );
                }
                demoted
            }
            Err(e) => {
                debug!(error = %e, "DRIVER: liveness eviction skipped");
                Vec::new()
            }
        }
    }

    pub fn liveness_window(&self) -> chrono::Duration {
        self.liveness_window
    }
}
