use super::states::RideStatus;
use crate::error::{DispatchError, DispatchResult, EntityKind};
use serde::{Deserialize, Serialize};

/// Events that can trigger ride state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideEvent {
    /// Bind the ride to a driver
    Assign,
    /// Finish the trip
    Complete,
}

impl RideEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Complete => "complete",
        }
    }

    /// Target state for this event from `current`, if the transition is legal
    pub fn target_from(&self, current: RideStatus) -> Option<RideStatus> {
        match (current, self) {
            (RideStatus::Pending, Self::Assign) => Some(RideStatus::Assigned),
            (RideStatus::Assigned, Self::Complete) => Some(RideStatus::Completed),
            _ => None,
        }
    }

    /// The only state this event may be applied to
    pub fn required_state(&self) -> RideStatus {
        match self {
            Self::Assign => RideStatus::Pending,
            Self::Complete => RideStatus::Assigned,
        }
    }

    /// Resolve the transition for `ride_id`, or report why it is rejected
    pub fn apply(&self, ride_id: i64, current: RideStatus) -> DispatchResult<RideStatus> {
        self.target_from(current).ok_or_else(|| {
            DispatchError::invalid_transition(EntityKind::Ride, ride_id, current, self.event_type())
        })
    }
}
