use super::{DriverId, Port, RideId, UserId};
use crate::session::SessionHandle;
use crate::state_machine::{RideEvent, RideStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ride request and its dispatch state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ride {
    pub ride_id: RideId,
    pub requester_id: UserId,
    pub origin: String,
    pub destination: String,
    pub status: RideStatus,
    pub driver_id: Option<DriverId>,
    pub port: Option<Port>,
    pub session: Option<SessionHandle>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Ride {
    pub fn is_pending(&self) -> bool {
        self.status == RideStatus::Pending
    }

    pub fn is_assigned(&self) -> bool {
        self.status == RideStatus::Assigned
    }

    /// Active rides hold their port exclusively
    pub fn holds_port(&self, port: Port) -> bool {
        self.status.is_active() && self.port == Some(port)
    }
}

/// Booking payload for a ride
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRide {
    pub requester_id: UserId,
    pub origin: String,
    pub destination: String,
}

impl NewRide {
    pub fn new(
        requester_id: UserId,
        origin: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            requester_id,
            origin: origin.into(),
            destination: destination.into(),
        }
    }
}

/// A status transition together with the fields it writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RideUpdate {
    Assign {
        driver_id: DriverId,
        port: Option<Port>,
        session: Option<SessionHandle>,
        at: DateTime<Utc>,
    },
    Complete {
        at: DateTime<Utc>,
    },
}

impl RideUpdate {
    pub fn event(&self) -> RideEvent {
        match self {
            Self::Assign { .. } => RideEvent::Assign,
            Self::Complete { .. } => RideEvent::Complete,
        }
    }

    /// Write the update onto `ride`; the caller has already validated the transition
    pub fn apply_to(self, ride: &mut Ride, target: RideStatus) {
        ride.status = target;
        match self {
            Self::Assign {
                driver_id,
                port,
                session,
                at,
            } => {
                ride.driver_id = Some(driver_id);
                ride.port = port;
                ride.session = session;
                ride.assigned_at = Some(at);
            }
            Self::Complete { at } => {
                ride.completed_at = Some(at);
            }
        }
    }
}
