//! # Storage Collaborators
//!
//! The engine consumes storage through these traits. Implementations must make
//! every status write a compare-and-set under their own serialization so that
//! concurrent dispatchers cannot bind the same driver or the same ride twice.
//! [`memory`] provides the in-process implementations.

pub mod memory;

use crate::error::DispatchResult;
use crate::models::{Driver, DriverId, NewDriver, NewRide, Port, Ride, RideId, RideUpdate};
use crate::state_machine::{DriverStatus, RideStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::{InMemoryDriverRepository, InMemoryRideRepository};

/// Outcome of an idempotent driver registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverRegistration {
    pub driver: Driver,
    /// Status before the reset, or `None` when the contact is new
    pub previous_status: Option<DriverStatus>,
}

impl DriverRegistration {
    pub fn created(&self) -> bool {
        self.previous_status.is_none()
    }
}

#[async_trait]
pub trait DriverRepository: Send + Sync {
    /// Insert a driver, or reset an existing one with the same contact to
    /// offline. The reset keeps any ride binding.
    async fn upsert_by_contact(
        &self,
        driver: NewDriver,
        now: DateTime<Utc>,
    ) -> DispatchResult<DriverRegistration>;

    async fn get(&self, driver_id: DriverId) -> DispatchResult<Option<Driver>>;

    /// All drivers in registration order
    async fn list(&self) -> DispatchResult<Vec<Driver>>;

    /// Unconditional status write; `seen_at` also refreshes `last_seen`
    async fn update_status(
        &self,
        driver_id: DriverId,
        status: DriverStatus,
        seen_at: Option<DateTime<Utc>>,
    ) -> DispatchResult<(DriverStatus, Driver)>;

    /// Write `new` only if the current status is `expected`; `seen_at` also
    /// refreshes `last_seen` in the same write
    async fn compare_and_set_status(
        &self,
        driver_id: DriverId,
        expected: DriverStatus,
        new: DriverStatus,
        seen_at: Option<DateTime<Utc>>,
    ) -> DispatchResult<bool>;

    async fn touch(&self, driver_id: DriverId, now: DateTime<Utc>) -> DispatchResult<Driver>;

    /// Atomically move the earliest-registered online driver to on_trip,
    /// recording `ride_id` as the ride that owns it
    async fn claim_first_online(&self, ride_id: RideId) -> DispatchResult<Option<Driver>>;

    /// Drop the driver's binding to `ride_id`. A driver still on_trip goes
    /// back online with `last_seen = seen_at`; any other status is kept.
    /// Returns true only when the driver went back online. A driver bound to
    /// a different ride is left untouched.
    async fn release_from_ride(
        &self,
        driver_id: DriverId,
        ride_id: RideId,
        seen_at: DateTime<Utc>,
    ) -> DispatchResult<bool>;

    /// Atomically demote online drivers last seen before `cutoff`
    async fn demote_stale(&self, cutoff: DateTime<Utc>) -> DispatchResult<Vec<DriverId>>;
}

#[async_trait]
pub trait RideRepository: Send + Sync {
    async fn insert(&self, ride: NewRide, now: DateTime<Utc>) -> DispatchResult<Ride>;

    async fn get(&self, ride_id: RideId) -> DispatchResult<Option<Ride>>;

    /// All rides, ascending id
    async fn list_ordered(&self) -> DispatchResult<Vec<Ride>>;

    /// Rides in `status`, ascending id
    async fn list_by_status(&self, status: RideStatus) -> DispatchResult<Vec<Ride>>;

    /// Apply `update` if the ride is in the state its event requires.
    /// Fails with `NotFound` or `InvalidTransition` otherwise.
    async fn transition(&self, ride_id: RideId, update: RideUpdate) -> DispatchResult<Ride>;

    /// The pending or assigned ride holding `port`, if any
    async fn find_active_by_port(&self, port: Port) -> DispatchResult<Option<Ride>>;
}
