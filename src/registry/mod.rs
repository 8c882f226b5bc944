//! # Record Registries
//!
//! Engine-facing wrappers over the storage collaborators. They stamp
//! timestamps from the injected clock, translate missing records into
//! `NotFound`, publish lifecycle events and log every mutation.

pub mod driver_registry;
pub mod ride_store;
pub mod user_directory;

pub use driver_registry::DriverRegistry;
pub use ride_store::RideStore;
pub use user_directory::UserDirectory;
