//! Test doubles shared by the unit tests.

use crate::clock::{Clock, SystemClock};
use crate::models::{Port, RideId};
use crate::resources::PortProbe;
use crate::session::{SessionError, SessionHandle, SessionManager};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Probe whose answers are set by the test
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    busy: Mutex<BTreeSet<Port>>,
}

impl ScriptedProbe {
    pub fn with_busy(ports: impl IntoIterator<Item = Port>) -> Self {
        Self {
            busy: Mutex::new(ports.into_iter().collect()),
        }
    }

    pub fn set_busy(&self, port: Port) {
        self.busy.lock().insert(port);
    }

    pub fn set_free(&self, port: Port) {
        self.busy.lock().remove(&port);
    }
}

impl PortProbe for ScriptedProbe {
    fn is_free(&self, port: Port) -> bool {
        !self.busy.lock().contains(&port)
    }
}

/// Session manager that records calls and fails on demand
#[derive(Debug, Default)]
pub struct RecordingSessionManager {
    started: Mutex<Vec<SessionHandle>>,
    stopped: Mutex<Vec<SessionHandle>>,
    failing_ports: Mutex<HashSet<Port>>,
    fail_all: AtomicBool,
    start_delay: Mutex<Option<Duration>>,
}

impl RecordingSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, port: Port) {
        self.failing_ports.lock().insert(port);
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

    /// Sessions started and not yet stopped
    pub fn running(&self) -> usize {
        let stopped = self.stopped.lock();
        self.started
            .lock()
            .iter()
            .filter(|h| !stopped.contains(h))
            .count()
    }
}

#[async_trait]
impl SessionManager for RecordingSessionManager {
    async fn start(&self, ride_id: RideId, port: Port) -> Result<SessionHandle, SessionError> {
        let delay = *self.start_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_all.load(Ordering::SeqCst) || self.failing_ports.lock().contains(&port) {
            return Err(SessionError::Bind {
                port,
                reason: "scripted failure".to_string(),
            });
        }

        let handle = SessionHandle::new(ride_id, port, SystemClock.now());
        self.started.lock().push(handle.clone());
        Ok(handle)
    }

    async fn stop(&self, handle: &SessionHandle) -> Result<(), SessionError> {
        self.stopped.lock().push(handle.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}
