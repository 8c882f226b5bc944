//! # Dispatch Configuration
//!
//! Configuration for the port pool, driver liveness, trip timing and dispatch
//! policy. Every section has serde defaults carrying the reference values, so a
//! partial file (or no file at all) yields a complete, validated configuration.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ride_dispatch::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().with_file("config/dispatch.toml").load()?;
//! let trip = config.trip_duration();
//! let first_port = config.ports.base_port;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::defaults;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Port slot range and probing
    pub ports: PortPoolConfig,

    /// Driver liveness settings
    pub drivers: DriverConfig,

    /// Simulated trip timing
    pub trips: TripConfig,

    /// Matching policy knobs
    pub dispatch: DispatchPolicyConfig,

    /// Lifecycle event channel
    pub events: EventsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PortPoolConfig {
    /// First port handed out; the scan ascends from here
    pub base_port: u16,
    /// Upper bound on the number of ports scanned before reporting exhaustion
    pub max_ports: u16,
    /// Address used to probe for external binds and to bind sessions
    pub bind_address: String,
    /// Probe the network before committing a port
    pub probe_network: bool,
}

impl Default for PortPoolConfig {
    fn default() -> Self {
        Self {
            base_port: defaults::BASE_PORT,
            max_ports: defaults::MAX_PORTS,
            bind_address: defaults::BIND_ADDRESS.to_string(),
            probe_network: true,
        }
    }
}

impl PortPoolConfig {
    /// Last port the pool may hand out
    pub fn last_port(&self) -> Option<u16> {
        self.max_ports
            .checked_sub(1)
            .and_then(|span| self.base_port.checked_add(span))
    }

    pub fn bind_ip(&self) -> ConfigResult<IpAddr> {
        self.bind_address.parse().map_err(|_| {
            ConfigurationError::invalid_value(
                "ports.bind_address",
                &self.bind_address,
                "must be an IP address",
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Online drivers silent for longer than this are demoted to offline
    pub liveness_window_seconds: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            liveness_window_seconds: defaults::LIVENESS_WINDOW_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TripConfig {
    pub duration_seconds: u64,
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            duration_seconds: defaults::TRIP_DURATION_SECONDS,
        }
    }
}

/// What to do with a matchable ride when no port is free
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortExhaustionPolicy {
    /// Leave the ride pending until a port frees up
    #[default]
    HoldPending,
    /// Assign the driver anyway; the ride runs without a port or session
    AssignWithoutPort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchPolicyConfig {
    pub port_exhaustion_policy: PortExhaustionPolicy,
    /// Reject bookings from requesters that never registered
    pub require_registered_riders: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: defaults::EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl DispatchConfig {
    pub fn trip_duration(&self) -> Duration {
        Duration::from_secs(self.trips.duration_seconds)
    }

    pub fn liveness_window(&self) -> Duration {
        Duration::from_secs(self.drivers.liveness_window_seconds)
    }

    /// Validate configuration for consistency and required fields
    pub fn validate(&self) -> ConfigResult<()> {
        if self.ports.base_port == 0 {
            return Err(ConfigurationError::invalid_value(
                "ports.base_port",
                "0",
                "base port must be greater than 0",
            ));
        }

        if self.ports.max_ports == 0 {
            return Err(ConfigurationError::invalid_value(
                "ports.max_ports",
                "0",
                "the pool must contain at least one port",
            ));
        }

        if self.ports.last_port().is_none() {
            return Err(ConfigurationError::invalid_value(
                "ports.max_ports",
                self.ports.max_ports,
                format!(
                    "range starting at {} runs past port 65535",
                    self.ports.base_port
                ),
            ));
        }

        if self.ports.bind_address.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "ports.bind_address",
                "port pool configuration",
            ));
        }
        self.ports.bind_ip()?;

        if self.drivers.liveness_window_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "drivers.liveness_window_seconds",
                "0",
                "liveness window must be greater than 0",
            ));
        }

        if self.drivers.liveness_window_seconds > defaults::MAX_LIVENESS_WINDOW_SECONDS {
            return Err(ConfigurationError::invalid_value(
                "drivers.liveness_window_seconds",
                self.drivers.liveness_window_seconds,
                format!(
                    "liveness window must not exceed {} seconds",
                    defaults::MAX_LIVENESS_WINDOW_SECONDS
                ),
            ));
        }

        if self.trips.duration_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "trips.duration_seconds",
                "0",
                "trip duration must be greater than 0",
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                "0",
                "channel capacity must be greater than 0",
            ));
        }

        Ok(())
    }
}
