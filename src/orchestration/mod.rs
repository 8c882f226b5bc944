//! # Orchestration
//!
//! The dispatch engine proper.
//!
//! - [`Dispatcher`] binds pending rides to drivers, reclaims resources on
//!   completion and rematches the pending queue
//! - [`CompletionScheduler`] owns one trip timer per assigned ride
//! - [`RideService`] is the facade a transport layer calls into
//! - [`DispatchSystem`] wires configuration and collaborators together

pub mod bootstrap;
pub mod completion_scheduler;
pub mod dispatcher;
pub mod service;
pub mod types;

pub use bootstrap::{DispatchSystem, DispatchSystemBuilder};
pub use completion_scheduler::CompletionScheduler;
pub use dispatcher::Dispatcher;
pub use service::RideService;
pub use types::{
    BookRideResponse, BookingOutcome, DispatchAttempt, DriverStatusResponse, DriverUpdate,
    RematchSummary,
};
