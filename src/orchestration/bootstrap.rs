//! # Dispatch System Bootstrap
//!
//! Wires configuration, collaborators and the engine into one
//! [`DispatchSystem`]. Every collaborator has a production default and can be
//! overridden through the builder, which is how tests swap in scripted
//! sessions, probes and clocks.
//!
//! ```rust,no_run
//! use ride_dispatch::orchestration::DispatchSystem;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let system = DispatchSystem::from_env()?;
//! let queue = system.service().queue().await?;
//! # Ok(())
//! # }
//! ```

use super::completion_scheduler::CompletionScheduler;
use super::dispatcher::Dispatcher;
use super::service::RideService;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigLoader, DispatchConfig};
use crate::error::DispatchResult;
use crate::events::{EventPublisher, PublishedEvent};
use crate::logging::init_structured_logging;
use crate::registry::{DriverRegistry, RideStore, UserDirectory};
use crate::repository::{
    DriverRepository, InMemoryDriverRepository, InMemoryRideRepository, RideRepository,
};
use crate::resources::{PortPool, PortProbe};
use crate::session::{ListenerSessionManager, SessionManager};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// A fully wired dispatch engine
pub struct DispatchSystem {
    config: DispatchConfig,
    dispatcher: Dispatcher,
    service: RideService,
    events: EventPublisher,
}

impl DispatchSystem {
    pub fn builder(config: DispatchConfig) -> DispatchSystemBuilder {
        DispatchSystemBuilder::new(config)
    }

    /// Initialize logging, load configuration from the environment and build
    /// with default collaborators
    pub fn from_env() -> DispatchResult<Self> {
        init_structured_logging();
        let config = ConfigLoader::from_env().load()?;
        Self::builder(config).build()
    }

    pub fn service(&self) -> &RideService {
        &self.service
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.events.subscribe()
    }

    /// Abort outstanding trip timers. Rides in flight stay assigned.
    pub fn shutdown(&self) -> usize {
        let aborted = self.dispatcher.shutdown();
        info!(aborted, "🛑 SYSTEM: dispatch system shut down");
        aborted
    }
}

pub struct DispatchSystemBuilder {
    config: DispatchConfig,
    clock: Option<Arc<dyn Clock>>,
    session_manager: Option<Arc<dyn SessionManager>>,
    port_probe: Option<Arc<dyn PortProbe>>,
    driver_repository: Option<Arc<dyn DriverRepository>>,
    ride_repository: Option<Arc<dyn RideRepository>>,
}

impl DispatchSystemBuilder {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            clock: None,
            session_manager: None,
            port_probe: None,
            driver_repository: None,
            ride_repository: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_session_manager(mut self, sessions: Arc<dyn SessionManager>) -> Self {
        self.session_manager = Some(sessions);
        self
    }

    /// Replace the probe chosen by `ports.probe_network`
    pub fn with_port_probe(mut self, probe: Arc<dyn PortProbe>) -> Self {
        self.port_probe = Some(probe);
        self
    }

    pub fn with_driver_repository(mut self, repository: Arc<dyn DriverRepository>) -> Self {
        self.driver_repository = Some(repository);
        self
    }

    pub fn with_ride_repository(mut self, repository: Arc<dyn RideRepository>) -> Self {
        self.ride_repository = Some(repository);
        self
    }

    pub fn build(self) -> DispatchResult<DispatchSystem> {
        let config = self.config;
        config.validate()?;

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let events = EventPublisher::new(config.events.channel_capacity);

        let ports = match self.port_probe {
            Some(probe) => PortPool::new(config.ports.base_port, config.ports.max_ports, probe),
            None => PortPool::from_config(&config.ports)?,
        };

        let sessions: Arc<dyn SessionManager> = match self.session_manager {
            Some(sessions) => sessions,
            None => Arc::new(ListenerSessionManager::new(
                config.ports.bind_ip()?,
                Arc::clone(&clock),
            )),
        };

        let driver_repository: Arc<dyn DriverRepository> = match self.driver_repository {
            Some(repository) => repository,
            None => Arc::new(InMemoryDriverRepository::new()),
        };
        let ride_repository: Arc<dyn RideRepository> = match self.ride_repository {
            Some(repository) => repository,
            None => Arc::new(InMemoryRideRepository::new()),
        };

        let drivers = Arc::new(DriverRegistry::new(
            driver_repository,
            Arc::clone(&clock),
            config.liveness_window(),
            events.clone(),
        ));
        let rides = Arc::new(RideStore::new(ride_repository, Arc::clone(&clock)));
        let users = Arc::new(UserDirectory::new(clock));

        let dispatcher = Dispatcher::new(
            drivers,
            rides,
            Arc::new(ports),
            sessions,
            CompletionScheduler::new(config.trip_duration()),
            events.clone(),
            config.dispatch.port_exhaustion_policy,
        );
        let service = RideService::new(
            dispatcher.clone(),
            users,
            config.dispatch.require_registered_riders,
        );

        info!(
            base_port = config.ports.base_port,
            max_ports = config.ports.max_ports,
            trip_seconds = config.trips.duration_seconds,
            liveness_seconds = config.drivers.liveness_window_seconds,
            "🚀 SYSTEM: dispatch system ready"
        );

        Ok(DispatchSystem {
            config,
            dispatcher,
            service,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::test_helpers::{RecordingSessionManager, ScriptedProbe};

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = DispatchConfig::default();
        config.trips.duration_seconds = 0;

        let err = DispatchSystem::builder(config).build().err().unwrap();
        assert_eq!(err.error_code(), "configuration_error");
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrides_are_wired_through() {
        let clock = ManualClock::default();
        let probe = Arc::new(ScriptedProbe::with_busy([8100]));
        let system = DispatchSystem::builder(DispatchConfig::default())
            .with_clock(Arc::new(clock.clone()))
            .with_port_probe(probe)
            .with_session_manager(Arc::new(RecordingSessionManager::new()))
            .build()
            .unwrap();
        let service = system.service();

        let driver = service.register_driver("A", "a@x", "X").await.unwrap();
        service.go_online(driver).await.unwrap();
        let booking = service.book_ride(1, "A", "B").await.unwrap();

        // 8100 is bound elsewhere, so the scan moves on
        assert_eq!(booking.port, Some(8101));
        assert_eq!(service.ride(booking.ride_id).await.unwrap().created_at, clock.now());
        assert_eq!(system.shutdown(), 1);
    }
}
