#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Ride Dispatch Core
//!
//! Dispatch and lifecycle engine for a ride-hailing backend.
//!
//! ## Overview
//!
//! The engine binds pending ride requests to available drivers, walks each ride
//! through its `pending -> assigned -> completed` lifecycle, and hands out a
//! scarce pool of network ports, one per active ride session. When a trip's
//! scheduled duration elapses the ride is completed, its session is torn down,
//! its port is reclaimed, and any rides still waiting are matched again.
//!
//! ## Module Organization
//!
//! - [`models`] - Driver, ride and rider records
//! - [`state_machine`] - Status vocabularies and the ride transition table
//! - [`repository`] - Storage collaborator traits and in-memory implementations
//! - [`registry`] - Driver registry, ride store and user directory
//! - [`resources`] - Port pool and network probing
//! - [`session`] - Per-ride session collaborators
//! - [`orchestration`] - Dispatcher, completion scheduler and service facade
//! - [`config`] - Configuration loading and validation
//! - [`events`] - Lifecycle event broadcasting
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ride_dispatch::config::DispatchConfig;
//! use ride_dispatch::orchestration::DispatchSystem;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let system = DispatchSystem::builder(DispatchConfig::default()).build()?;
//! let service = system.service();
//!
//! let driver_id = service.register_driver("Asha", "asha@example.com", "Jayanagar").await?;
//! service.go_online(driver_id).await?;
//!
//! let booking = service.book_ride(1, "Koramangala", "MG Road").await?;
//! println!("ride {} is {}", booking.ride_id, booking.status);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod repository;
pub mod resources;
pub mod session;
pub mod state_machine;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigLoader, DispatchConfig, PortExhaustionPolicy};
pub use error::{DispatchError, DispatchResult, EntityKind};
pub use events::{DispatchEvent, EventPublisher};
pub use models::{Driver, DriverId, Port, Ride, RideId, User, UserId};
pub use orchestration::{CompletionScheduler, Dispatcher, DispatchSystem, RideService};
pub use state_machine::{DriverStatus, RideEvent, RideStatus};
