//! # Ride Store
//!
//! Mutation contract for ride records. Durability belongs to the repository;
//! this layer stamps times, maps missing rides to `NotFound` and logs each
//! transition.

use crate::clock::Clock;
use crate::error::{DispatchError, DispatchResult, EntityKind};
use crate::logging::log_ride_operation;
use crate::models::{DriverId, NewRide, Port, Ride, RideId, RideUpdate, UserId};
use crate::repository::RideRepository;
use crate::session::SessionHandle;
use crate::state_machine::RideStatus;
use std::sync::Arc;

pub struct RideStore {
    repository: Arc<dyn RideRepository>,
    clock: Arc<dyn Clock>,
}

impl RideStore {
    pub fn new(repository: Arc<dyn RideRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Create a pending ride with no driver or port
    pub async fn create(
        &self,
        requester_id: UserId,
        origin: &str,
        destination: &str,
    ) -> DispatchResult<Ride> {
        let ride = self
            .repository
            .insert(
                NewRide::new(requester_id, origin, destination),
                self.clock.now(),
            )
            .await?;

        log_ride_operation(
            "create",
            Some(ride.ride_id),
            None,
            None,
            &ride.status.to_string(),
            Some(&format!("{origin} -> {destination}")),
        );

        Ok(ride)
    }

    pub async fn get(&self, ride_id: RideId) -> DispatchResult<Ride> {
        self.repository
            .get(ride_id)
            .await?
            .ok_or_else(|| DispatchError::not_found(EntityKind::Ride, ride_id))
    }

    /// Every ride, ascending id
    pub async fn list_ordered(&self) -> DispatchResult<Vec<Ride>> {
        self.repository.list_ordered().await
    }

    /// pending -> assigned; `InvalidTransition` if the ride is no longer pending
    pub async fn assign(
        &self,
        ride_id: RideId,
        driver_id: DriverId,
        port: Option<Port>,
        session: Option<SessionHandle>,
    ) -> DispatchResult<Ride> {
        let ride = self
            .repository
            .transition(
                ride_id,
                RideUpdate::Assign {
                    driver_id,
                    port,
                    session,
                    at: self.clock.now(),
                },
            )
            .await?;

        log_ride_operation(
            "assign",
            Some(ride_id),
            Some(driver_id),
            port,
            &ride.status.to_string(),
            None,
        );

        Ok(ride)
    }

    /// assigned -> completed; `InvalidTransition` if the ride is not assigned
    pub async fn complete(&self, ride_id: RideId) -> DispatchResult<Ride> {
        let ride = self
            .repository
            .transition(
                ride_id,
                RideUpdate::Complete {
                    at: self.clock.now(),
                },
            )
            .await?;

        log_ride_operation(
            "complete",
            Some(ride_id),
            ride.driver_id,
            ride.port,
            &ride.status.to_string(),
            None,
        );

        Ok(ride)
    }

    /// Pending rides, oldest first
    pub async fn find_pending_ordered(&self) -> DispatchResult<Vec<Ride>> {
        self.repository.list_by_status(RideStatus::Pending).await
    }

    /// Oldest pending ride, if any
    pub async fn next_pending(&self) -> DispatchResult<Option<Ride>> {
        Ok(self.find_pending_ordered().await?.into_iter().next())
    }

    /// The pending or assigned ride holding `port`
    pub async fn find_active_by_port(&self, port: Port) -> DispatchResult<Option<Ride>> {
        self.repository.find_active_by_port(port).await
    }
}
