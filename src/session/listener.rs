//! TCP listener sessions.
//!
//! Each session binds a tokio `TcpListener` on the ride's port and answers every
//! connection with a one-line JSON descriptor of the ride. Stopping a session
//! aborts its accept loop, which drops the listener and frees the port.

use super::{SessionError, SessionHandle, SessionManager};
use crate::clock::Clock;
use crate::models::{Port, RideId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct ListenerSessionManager {
    bind_address: IpAddr,
    clock: Arc<dyn Clock>,
    sessions: DashMap<Uuid, JoinHandle<()>>,
}

impl ListenerSessionManager {
    pub fn new(bind_address: IpAddr, clock: Arc<dyn Clock>) -> Self {
        Self {
            bind_address,
            clock,
            sessions: DashMap::new(),
        }
    }

    /// Number of sessions currently serving
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_running(&self, handle: &SessionHandle) -> bool {
        self.sessions.contains_key(&handle.session_id)
    }
}

#[async_trait]
impl SessionManager for ListenerSessionManager {
    async fn start(&self, ride_id: RideId, port: Port) -> Result<SessionHandle, SessionError> {
        let listener = TcpListener::bind((self.bind_address, port))
            .await
            .map_err(|e| SessionError::Bind {
                port,
                reason: e.to_string(),
            })?;

        let handle = SessionHandle::new(ride_id, port, self.clock.now());
        let descriptor = serde_json::json!({
            "ride_id": ride_id,
            "session_id": handle.session_id,
            "port": port,
        });
        let banner = format!("{descriptor}\n").into_bytes();

        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((mut stream, peer)) => {
                        debug!(ride_id, %peer, "🛰️ SESSION: connection accepted");
                        if let Err(e) = stream.write_all(&banner).await {
                            debug!(ride_id, %peer, error = %e, "SESSION: client went away");
                        }
                    }
                    Err(e) => {
                        warn!(ride_id, port, error = %e, "⚠️ SESSION: accept failed, closing listener");
                        break;
                    }
                }
            }
        });

        self.sessions.insert(handle.session_id, task);

        info!(
            ride_id,
            port,
            session_id = %handle.session_id,
            "🛰️ SESSION: listener started"
        );

        Ok(handle)
    }

    async fn stop(&self, handle: &SessionHandle) -> Result<(), SessionError> {
        match self.sessions.remove(&handle.session_id) {
            Some((_, task)) => {
                task.abort();
                // Wait for the listener to be dropped so the port is actually free
                let _ = task.await;
                info!(
                    ride_id = handle.ride_id,
                    port = handle.port,
                    session_id = %handle.session_id,
                    "🛑 SESSION: listener stopped"
                );
            }
            None => {
                debug!(
                    session_id = %handle.session_id,
                    "SESSION: stop requested for unknown session"
                );
            }
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "tcp_listener"
    }
}

impl Drop for ListenerSessionManager {
    fn drop(&mut self) {
        for entry in self.sessions.iter() {
            entry.value().abort();
        }
    }
}
