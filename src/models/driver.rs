use super::{DriverId, RideId};
use crate::state_machine::DriverStatus;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A registered driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub driver_id: DriverId,
    pub name: String,
    /// Unique contact key; registration is idempotent on it
    pub contact: String,
    pub location: String,
    pub status: DriverStatus,
    /// Ride that claimed this driver. Set at claim time and cleared only by
    /// that ride's rollback or completion, so it survives going offline.
    #[serde(default)]
    pub current_ride: Option<RideId>,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Driver {
    pub fn is_available(&self) -> bool {
        self.status.is_available()
    }

    /// Still bound to a ride, whatever the status says
    pub fn is_bound(&self) -> bool {
        self.current_ride.is_some()
    }

    /// True when the driver has been silent for longer than `window` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.last_seen > window
    }
}

/// Registration payload for a driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDriver {
    pub name: String,
    pub contact: String,
    pub location: String,
}

impl NewDriver {
    pub fn new(
        name: impl Into<String>,
        contact: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
            location: location.into(),
        }
    }
}
