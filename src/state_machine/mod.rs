// State machine module for ride and driver lifecycles
//
// Rides move strictly forward through pending -> assigned -> completed. Driver
// statuses are not ordered; they change through compare-and-set writes in the
// driver repository.

pub mod events;
pub mod states;

// Re-export main types for convenient access
pub use events::RideEvent;
pub use states::{DriverStatus, RideStatus};
