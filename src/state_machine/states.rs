use serde::{Deserialize, Serialize};
use std::fmt;

/// Ride status definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    /// Booked and waiting for a driver
    Pending,
    /// Bound to exactly one driver, trip in progress
    Assigned,
    /// Trip finished; no further transitions allowed
    Completed,
}

impl RideStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Check if the ride may still hold a driver or a port
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Assigned)
    }

    /// Only pending rides take part in matching
    pub fn is_dispatchable(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Assigned => write!(f, "assigned"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for RideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid ride status: {s}")),
        }
    }
}

/// Default state for new rides
impl Default for RideStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Driver availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    /// Registered but not taking rides
    Offline,
    /// Idle and eligible for dispatch
    Online,
    /// Bound to an assigned ride
    OnTrip,
}

impl DriverStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::Online => write!(f, "online"),
            Self::OnTrip => write!(f, "on_trip"),
        }
    }
}

impl std::str::FromStr for DriverStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(Self::Offline),
            "online" => Ok(Self::Online),
            "on_trip" => Ok(Self::OnTrip),
            _ => Err(format!("Invalid driver status: {s}")),
        }
    }
}

/// Newly registered drivers start offline
impl Default for DriverStatus {
    fn default() -> Self {
        Self::Offline
    }
}
