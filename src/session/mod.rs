//! # Ride Sessions
//!
//! A session is the external serving context bound to a ride's port for the
//! duration of its trip. The engine only needs start/stop with success or
//! failure signalling; [`ListenerSessionManager`] is the in-process realisation.

pub mod listener;

use crate::models::{Port, RideId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use listener::ListenerSessionManager;

/// Opaque handle to a running session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub ride_id: RideId,
    pub port: Port,
    pub started_at: DateTime<Utc>,
}

impl SessionHandle {
    pub fn new(ride_id: RideId, port: Port, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            ride_id,
            port,
            started_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Failed to bind session port {port}: {reason}")]
    Bind { port: Port, reason: String },

    #[error("Session backend unavailable: {0}")]
    Unavailable(String),
}

/// Start/stop contract for per-ride sessions
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Bring up a session for `ride_id` bound to `port`
    async fn start(&self, ride_id: RideId, port: Port) -> Result<SessionHandle, SessionError>;

    /// Tear a session down. Stopping an unknown or already-stopped session is a no-op.
    async fn stop(&self, handle: &SessionHandle) -> Result<(), SessionError>;

    /// Name used in logs
    fn backend_name(&self) -> &'static str;
}
