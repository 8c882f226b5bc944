//! # Orchestration Types
//!
//! Outcomes produced by the dispatcher and the serialisable responses the
//! service facade hands to a transport layer.

use crate::error::DispatchError;
use crate::models::{Driver, DriverId, Port, Ride, RideId};
use crate::state_machine::{DriverStatus, RideStatus};
use serde::{Deserialize, Serialize};

/// Result of one bind attempt for one pending ride
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAttempt {
    /// The ride is now assigned to the driver
    Assigned { ride: Ride, driver: Driver },
    /// Nobody is online; the ride stays pending
    NoDriver,
    /// A resource could not be acquired; the ride stays pending and every
    /// partial acquisition has been rolled back
    Deferred(DispatchError),
    /// The ride stopped being pending while the attempt ran. `driver_released`
    /// is set when a driver claimed for it went back online.
    Skipped { driver_released: bool },
}

impl DispatchAttempt {
    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned { .. })
    }
}

/// What `book` did with a new ride
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingOutcome {
    pub ride: Ride,
    pub driver: Option<Driver>,
    /// Why a driver-bearing match was deferred, when it was
    pub deferred: Option<DispatchError>,
}

/// What one rematch scan did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RematchSummary {
    /// Pending rides looked at before the scan stopped
    pub scanned: usize,
    /// Rides assigned by this scan, oldest first
    pub assigned: Vec<RideId>,
    /// Error that ended the scan early, if any
    pub stopped_by: Option<DispatchError>,
}

/// A driver's state after a status change, with any rides it triggered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverUpdate {
    pub driver: Driver,
    pub rematch: RematchSummary,
}

/// Book-ride response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRideResponse {
    pub ride_id: RideId,
    pub status: RideStatus,
    pub driver_id: Option<DriverId>,
    pub driver_name: Option<String>,
    pub port: Option<Port>,
    pub message: String,
}

impl From<BookingOutcome> for BookRideResponse {
    fn from(outcome: BookingOutcome) -> Self {
        let BookingOutcome {
            ride,
            driver,
            deferred,
        } = outcome;

        let message = match (&driver, &deferred) {
            (Some(driver), _) => format!("Ride assigned to {}", driver.name),
            (None, Some(reason)) => format!("Ride is pending: {reason}"),
            (None, None) => "Ride is pending until a driver comes online".to_string(),
        };

        Self {
            ride_id: ride.ride_id,
            status: ride.status,
            driver_id: ride.driver_id,
            driver_name: driver.map(|d| d.name),
            port: ride.port,
            message,
        }
    }
}

/// Go-online / go-offline / heartbeat response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverStatusResponse {
    pub driver_id: DriverId,
    pub status: DriverStatus,
    /// Rides assigned by the rematch this change triggered
    pub assigned_rides: Vec<RideId>,
    pub message: String,
}

impl DriverStatusResponse {
    pub fn new(driver: &Driver, assigned_rides: Vec<RideId>) -> Self {
        let message = match driver.status {
            DriverStatus::Online => format!("Driver {} is now online", driver.name),
            DriverStatus::OnTrip => format!("Driver {} is on a trip", driver.name),
            DriverStatus::Offline => format!("Driver {} is now offline", driver.name),
        };
        Self {
            driver_id: driver.driver_id,
            status: driver.status,
            assigned_rides,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ride(status: RideStatus, driver_id: Option<DriverId>, port: Option<Port>) -> Ride {
        Ride {
            ride_id: 5,
            requester_id: 1,
            origin: "A".to_string(),
            destination: "B".to_string(),
            status,
            driver_id,
            port,
            session: None,
            created_at: Utc::now(),
            assigned_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_pending_booking_response_explains_deferral() {
        let response = BookRideResponse::from(BookingOutcome {
            ride: ride(RideStatus::Pending, None, None),
            driver: None,
            deferred: Some(DispatchError::ports_exhausted(8100, 2)),
        });

        assert_eq!(response.status, RideStatus::Pending);
        assert!(response.driver_id.is_none());
        assert!(response.message.contains("no free port"));
    }

    #[test]
    fn test_response_serializes_snake_case_status() {
        let response = BookRideResponse::from(BookingOutcome {
            ride: ride(RideStatus::Assigned, Some(2), Some(8100)),
            driver: None,
            deferred: None,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "assigned");
        assert_eq!(json["port"], 8100);
    }
}
