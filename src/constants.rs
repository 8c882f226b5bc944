//! # System Constants
//!
//! Reference values and event names that define the operational boundaries of
//! the dispatch engine.

pub use crate::state_machine::{DriverStatus, RideStatus};

/// Lifecycle event names carried by [`crate::events::DispatchEvent`]
pub mod events {
    // Ride lifecycle events
    pub const RIDE_REQUESTED: &str = "ride.requested";
    pub const RIDE_ASSIGNED: &str = "ride.assigned";
    pub const RIDE_COMPLETED: &str = "ride.completed";
    pub const RIDE_ASSIGNMENT_ROLLED_BACK: &str = "ride.assignment_rolled_back";

    // Driver lifecycle events
    pub const DRIVER_STATUS_CHANGED: &str = "driver.status_changed";
    pub const DRIVER_EVICTED: &str = "driver.evicted";

    // Resource events
    pub const PORT_ALLOCATED: &str = "port.allocated";
    pub const PORT_RELEASED: &str = "port.released";
}

/// Reference defaults used when no configuration overrides them
pub mod defaults {
    /// First port handed out by the pool
    pub const BASE_PORT: u16 = 8100;

    /// Number of consecutive ports the pool may scan before reporting exhaustion
    pub const MAX_PORTS: u16 = 1000;

    /// Address used to probe and bind session ports
    pub const BIND_ADDRESS: &str = "127.0.0.1";

    /// Drivers silent for longer than this are demoted to offline
    pub const LIVENESS_WINDOW_SECONDS: u64 = 10;

    /// Longest liveness window configuration accepts (one week)
    pub const MAX_LIVENESS_WINDOW_SECONDS: u64 = 7 * 24 * 60 * 60;

    /// One simulated trip
    pub const TRIP_DURATION_SECONDS: u64 = 60;

    pub const EVENT_CHANNEL_CAPACITY: usize = 1000;
}

/// Status groupings used by queries and invariant checks
pub mod status_groups {
    use super::{DriverStatus, RideStatus};

    /// Rides that still hold (or may still acquire) a driver and a port
    pub const ACTIVE_RIDE_STATES: &[RideStatus] = &[RideStatus::Pending, RideStatus::Assigned];

    /// Rides that will never change again
    pub const FINAL_RIDE_STATES: &[RideStatus] = &[RideStatus::Completed];

    /// Drivers eligible for a new assignment
    pub const DISPATCHABLE_DRIVER_STATES: &[DriverStatus] = &[DriverStatus::Online];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_groups_partition_ride_states() {
        for status in [
            RideStatus::Pending,
            RideStatus::Assigned,
            RideStatus::Completed,
        ] {
            let active = status_groups::ACTIVE_RIDE_STATES.contains(&status);
            let terminal = status_groups::FINAL_RIDE_STATES.contains(&status);
            assert!(active ^ terminal, "{status} must be exactly one of active/final");
        }
    }

    #[test]
    fn test_default_port_range_fits_in_u16() {
        assert!(defaults::BASE_PORT.checked_add(defaults::MAX_PORTS - 1).is_some());
    }
}
