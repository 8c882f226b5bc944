//! # Ride Service
//!
//! The operations a transport layer exposes: book-ride, queue and ride lookups,
//! driver status changes, heartbeats, and registration of drivers and riders.
//! Responses are plain serde structs; every failure is a [`DispatchError`]
//! the caller can render as a structured response.

use super::dispatcher::Dispatcher;
use super::types::{BookRideResponse, DriverStatusResponse};
use crate::error::{DispatchError, DispatchResult, EntityKind};
use crate::models::{Driver, DriverId, Port, Ride, RideId, UserId};
use crate::registry::UserDirectory;
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct RideService {
    dispatcher: Dispatcher,
    users: Arc<UserDirectory>,
    require_registered_riders: bool,
}

impl RideService {
    pub fn new(
        dispatcher: Dispatcher,
        users: Arc<UserDirectory>,
        require_registered_riders: bool,
    ) -> Self {
        Self {
            dispatcher,
            users,
            require_registered_riders,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[instrument(skip(self, origin, destination))]
    pub async fn book_ride(
        &self,
        user_id: UserId,
        origin: &str,
        destination: &str,
    ) -> DispatchResult<BookRideResponse> {
        if self.require_registered_riders && !self.users.contains(user_id) {
            return Err(DispatchError::not_found(EntityKind::User, user_id));
        }

        let outcome = self.dispatcher.book(user_id, origin, destination).await?;
        Ok(BookRideResponse::from(outcome))
    }

    /// Every ride, ascending id
    pub async fn queue(&self) -> DispatchResult<Vec<Ride>> {
        self.dispatcher.rides().list_ordered().await
    }

    /// Oldest ride still waiting for a driver
    pub async fn next_pending(&self) -> DispatchResult<Option<Ride>> {
        self.dispatcher.rides().next_pending().await
    }

    pub async fn ride(&self, ride_id: RideId) -> DispatchResult<Ride> {
        self.dispatcher.rides().get(ride_id).await
    }

    /// The active ride holding `port`
    pub async fn ride_by_port(&self, port: Port) -> DispatchResult<Ride> {
        self.dispatcher
            .rides()
            .find_active_by_port(port)
            .await?
            .ok_or_else(|| DispatchError::not_found(EntityKind::Port, i64::from(port)))
    }

    pub async fn driver(&self, driver_id: DriverId) -> DispatchResult<Driver> {
        self.dispatcher.drivers().get(driver_id).await
    }

    pub async fn go_online(&self, driver_id: DriverId) -> DispatchResult<DriverStatusResponse> {
        let update = self.dispatcher.go_online(driver_id).await?;
        Ok(DriverStatusResponse::new(
            &update.driver,
            update.rematch.assigned,
        ))
    }

    pub async fn go_offline(&self, driver_id: DriverId) -> DispatchResult<DriverStatusResponse> {
        let driver = self.dispatcher.go_offline(driver_id).await?;
        Ok(DriverStatusResponse::new(&driver, Vec::new()))
    }

    /// Refresh a driver's `last_seen`; status is left alone
    pub async fn heartbeat(&self, driver_id: DriverId) -> DispatchResult<Driver> {
        self.dispatcher.drivers().touch(driver_id).await
    }

    /// Online drivers, after demoting any that missed their heartbeats
    pub async fn available_drivers(&self) -> DispatchResult<Vec<Driver>> {
        self.dispatcher.drivers().list_available().await
    }

    pub async fn register_driver(
        &self,
        name: &str,
        contact: &str,
        location: &str,
    ) -> DispatchResult<DriverId> {
        self.dispatcher
            .drivers()
            .register(name, contact, location)
            .await
    }

    pub fn register_user(&self, name: &str, contact: &str) -> DispatchResult<UserId> {
        self.users.register(name, contact)
    }
}
