//! Record types shared by the registries, the repositories and the dispatcher.

pub mod driver;
pub mod ride;
pub mod user;

// Re-export core models for easy access
pub use driver::{Driver, NewDriver};
pub use ride::{NewRide, Ride, RideUpdate};
pub use user::User;

pub type DriverId = i64;
pub type RideId = i64;
pub type UserId = i64;

/// A reservable network port, one per active ride session
pub type Port = u16;
