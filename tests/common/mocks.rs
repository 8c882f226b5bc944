use async_trait::async_trait;
use parking_lot::Mutex;
use ride_dispatch::resources::PortProbe;
use ride_dispatch::session::{SessionError, SessionHandle, SessionManager};
use ride_dispatch::{Port, RideId};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Session manager that records every start/stop and fails on demand
#[derive(Debug, Default)]
pub struct MockSessionManager {
    started: Mutex<Vec<SessionHandle>>,
    stopped: Mutex<Vec<SessionHandle>>,
    failing_ports: Mutex<HashSet<Port>>,
    fail_all: AtomicBool,
    start_delay: Mutex<Option<Duration>>,
}

impl MockSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, port: Port) {
        self.failing_ports.lock().insert(port);
    }

    pub fn recover(&self, port: Port) {
        self.failing_ports.lock().remove(&port);
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Make every later `start` take `delay` on tokio's clock
    pub fn delay_starts(&self, delay: Duration) {
        *self.start_delay.lock() = Some(delay);
    }

    pub fn started(&self) -> Vec<SessionHandle> {
        self.started.lock().clone()
    }

    pub fn stopped(&self) -> Vec<SessionHandle> {
        self.stopped.lock().clone()
    }

    /// Ports of sessions started and not yet stopped
    pub fn running_ports(&self) -> Vec<Port> {
        let stopped = self.stopped.lock();
        self.started
            .lock()
            .iter()
            .filter(|handle| !stopped.contains(handle))
            .map(|handle| handle.port)
            .collect()
    }
}

#[async_trait]
impl SessionManager for MockSessionManager {
    async fn start(&self, ride_id: RideId, port: Port) -> Result<SessionHandle, SessionError> {
        let delay = *self.start_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_all.load(Ordering::SeqCst) || self.failing_ports.lock().contains(&port) {
            return Err(SessionError::Unavailable(format!(
                "mock refused ride {ride_id} on port {port}"
            )));
        }

        let handle = SessionHandle::new(ride_id, port, chrono::Utc::now());
        self.started.lock().push(handle.clone());
        Ok(handle)
    }

    async fn stop(&self, handle: &SessionHandle) -> Result<(), SessionError> {
        self.stopped.lock().push(handle.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// Probe reporting a scripted set of ports as bound elsewhere
#[derive(Debug, Default)]
pub struct MockPortProbe {
    busy: Mutex<BTreeSet<Port>>,
}

impl MockPortProbe {
    pub fn with_busy(ports: impl IntoIterator<Item = Port>) -> Self {
        Self {
            busy: Mutex::new(ports.into_iter().collect()),
        }
    }

    pub fn set_free(&self, port: Port) {
        self.busy.lock().remove(&port);
    }
}

impl PortProbe for MockPortProbe {
    fn is_free(&self, port: Port) -> bool {
        !self.busy.lock().contains(&port)
    }
}
