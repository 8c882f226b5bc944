use crate::constants::events as names;
use crate::models::{DriverId, Port, RideId, UserId};
use crate::state_machine::DriverStatus;
use serde::{Deserialize, Serialize};

/// Lifecycle events emitted by the dispatch engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    RideRequested {
        ride_id: RideId,
        requester_id: UserId,
    },
    RideAssigned {
        ride_id: RideId,
        driver_id: DriverId,
        port: Option<Port>,
    },
    RideCompleted {
        ride_id: RideId,
        driver_id: Option<DriverId>,
        port: Option<Port>,
    },
    AssignmentRolledBack {
        ride_id: RideId,
        driver_id: DriverId,
        reason: String,
    },
    DriverStatusChanged {
        driver_id: DriverId,
        from: DriverStatus,
        to: DriverStatus,
    },
    DriverEvicted {
        driver_id: DriverId,
    },
    PortAllocated {
        port: Port,
    },
    PortReleased {
        port: Port,
    },
}

impl DispatchEvent {
    /// Dotted event name, e.g. `ride.assigned`
    pub fn name(&self) -> &'static str {
        match self {
            Self::RideRequested { .. } => names::RIDE_REQUESTED,
            Self::RideAssigned { .. } => names::RIDE_ASSIGNED,
            Self::RideCompleted { .. } => names::RIDE_COMPLETED,
            Self::AssignmentRolledBack { .. } => names::RIDE_ASSIGNMENT_ROLLED_BACK,
            Self::DriverStatusChanged { .. } => names::DRIVER_STATUS_CHANGED,
            Self::DriverEvicted { .. } => names::DRIVER_EVICTED,
            Self::PortAllocated { .. } => names::PORT_ALLOCATED,
            Self::PortReleased { .. } => names::PORT_RELEASED,
        }
    }

    /// Ride this event concerns, if any
    pub fn ride_id(&self) -> Option<RideId> {
        match self {
            Self::RideRequested { ride_id, .. }
            | Self::RideAssigned { ride_id, .. }
            | Self::RideCompleted { ride_id, .. }
            | Self::AssignmentRolledBack { ride_id, .. } => Some(*ride_id),
            _ => None,
        }
    }
}
