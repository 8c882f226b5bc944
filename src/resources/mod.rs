//! # Resource Pools
//!
//! The port pool hands out one network port per active ride session and
//! reclaims it when the ride completes.

pub mod port_pool;
pub mod probe;

pub use port_pool::PortPool;
pub use probe::{AssumeFreeProbe, PortProbe, TcpBindProbe};
