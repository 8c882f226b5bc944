use super::mocks::{MockPortProbe, MockSessionManager};
use ride_dispatch::config::{DispatchConfig, PortExhaustionPolicy};
use ride_dispatch::orchestration::{DispatchSystem, RideService};
use ride_dispatch::{DriverId, DriverStatus, ManualClock, Port, Ride, RideStatus};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_BASE_PORT: Port = 9100;
pub const TRIP: Duration = Duration::from_secs(60);

/// Sleep just past one trip on tokio's (usually paused) clock
pub async fn finish_trip() {
    tokio::time::sleep(TRIP + Duration::from_secs(1)).await;
}

/// A dispatch system wired to mocks, with handles to steer them
pub struct TestEngine {
    pub system: DispatchSystem,
    pub sessions: Arc<MockSessionManager>,
    pub probe: Arc<MockPortProbe>,
    pub clock: ManualClock,
}

impl TestEngine {
    pub fn service(&self) -> &RideService {
        self.system.service()
    }

    /// Register a driver and bring it online
    pub async fn online_driver(&self, name: &str) -> DriverId {
        let driver_id = self.register_driver(name).await;
        self.service()
            .go_online(driver_id)
            .await
            .expect("driver should go online");
        driver_id
    }

    pub async fn register_driver(&self, name: &str) -> DriverId {
        self.service()
            .register_driver(name, &format!("{name}@drivers.test"), "Koramangala")
            .await
            .expect("driver registration should succeed")
    }

    pub async fn driver_status(&self, driver_id: DriverId) -> DriverStatus {
        self.service().driver(driver_id).await.unwrap().status
    }

    pub async fn ride(&self, ride_id: i64) -> Ride {
        self.service().ride(ride_id).await.unwrap()
    }

    /// Check the engine-wide invariants against the current state
    pub async fn assert_invariants(&self) {
        let rides = self.service().queue().await.unwrap();

        let mut drivers_on_assigned = HashSet::new();
        let mut active_ports = HashSet::new();
        for ride in &rides {
            match ride.status {
                RideStatus::Pending => {
                    assert!(ride.driver_id.is_none(), "pending ride {} has a driver", ride.ride_id);
                    assert!(ride.port.is_none(), "pending ride {} holds a port", ride.ride_id);
                }
                RideStatus::Assigned => {
                    let driver_id = ride.driver_id.expect("assigned ride must have a driver");
                    assert!(
                        drivers_on_assigned.insert(driver_id),
                        "driver {driver_id} bound to two assigned rides"
                    );
                    if let Some(port) = ride.port {
                        assert!(active_ports.insert(port), "port {port} held by two active rides");
                    }
                }
                RideStatus::Completed => {}
            }
        }

        let pool = self.system.dispatcher().ports();
        let mut held: Vec<Port> = active_ports.into_iter().collect();
        held.sort_unstable();
        assert_eq!(pool.allocated_ports(), held, "pool bookkeeping drifted from rides");

        let ids: Vec<i64> = rides.iter().map(|r| r.ride_id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ride ids not strictly increasing");

        // Driver bindings and assigned rides describe the same pairs
        let drivers = self.system.dispatcher().drivers().list().await.unwrap();
        for driver in &drivers {
            match driver.current_ride {
                Some(ride_id) => {
                    let ride = rides
                        .iter()
                        .find(|r| r.ride_id == ride_id)
                        .expect("bound ride must exist");
                    assert_eq!(
                        ride.status,
                        RideStatus::Assigned,
                        "driver {} bound to a {} ride",
                        driver.driver_id,
                        ride.status
                    );
                    assert_eq!(ride.driver_id, Some(driver.driver_id));
                    assert_ne!(
                        driver.status,
                        DriverStatus::Online,
                        "driver {} online while bound",
                        driver.driver_id
                    );
                }
                None => assert_ne!(
                    driver.status,
                    DriverStatus::OnTrip,
                    "driver {} on_trip without a ride",
                    driver.driver_id
                ),
            }
        }
        for driver_id in drivers_on_assigned {
            let driver = drivers.iter().find(|d| d.driver_id == driver_id).unwrap();
            assert!(driver.current_ride.is_some(), "driver {driver_id} lost its binding");
        }
    }
}

pub struct TestEngineBuilder {
    config: DispatchConfig,
    busy_ports: Vec<Port>,
}

impl TestEngineBuilder {
    pub fn new() -> Self {
        let mut config = DispatchConfig::default();
        config.ports.base_port = TEST_BASE_PORT;
        config.ports.max_ports = 16;
        config.ports.probe_network = false;
        config.trips.duration_seconds = TRIP.as_secs();
        config.drivers.liveness_window_seconds = 10;

        Self {
            config,
            busy_ports: Vec::new(),
        }
    }

    pub fn max_ports(mut self, max_ports: u16) -> Self {
        self.config.ports.max_ports = max_ports;
        self
    }

    pub fn trip_seconds(mut self, seconds: u64) -> Self {
        self.config.trips.duration_seconds = seconds;
        self
    }

    pub fn policy(mut self, policy: PortExhaustionPolicy) -> Self {
        self.config.dispatch.port_exhaustion_policy = policy;
        self
    }

    pub fn require_registered_riders(mut self) -> Self {
        self.config.dispatch.require_registered_riders = true;
        self
    }

    pub fn busy_ports(mut self, ports: impl IntoIterator<Item = Port>) -> Self {
        self.busy_ports.extend(ports);
        self
    }

    pub fn build(self) -> TestEngine {
        let sessions = Arc::new(MockSessionManager::new());
        let probe = Arc::new(MockPortProbe::with_busy(self.busy_ports));
        let clock = ManualClock::default();

        let system = DispatchSystem::builder(self.config)
            .with_session_manager(sessions.clone())
            .with_port_probe(probe.clone())
            .with_clock(Arc::new(clock.clone()))
            .build()
            .expect("test configuration should be valid");

        TestEngine {
            system,
            sessions,
            probe,
            clock,
        }
    }
}

impl Default for TestEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn engine() -> TestEngine {
    TestEngineBuilder::new().build()
}
