//! # Port Pool
//!
//! Thread-safe allocation of port slots from a bounded ascending range.
//!
//! Allocation scans upward from the base port, skipping ports the pool already
//! handed out and ports the probe reports as bound elsewhere. The scan is
//! bounded by `max_ports`; past that the pool fails closed with
//! `ResourceExhausted`. Release is idempotent.

use super::probe::{AssumeFreeProbe, PortProbe, TcpBindProbe};
use crate::config::{ConfigResult, PortPoolConfig};
use crate::error::{DispatchError, DispatchResult};
use crate::logging::log_port_operation;
use crate::models::Port;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct PortPool {
    base_port: Port,
    max_ports: u16,
    /// Held across the whole scan so two allocations never pick the same candidate
    in_use: Mutex<BTreeSet<Port>>,
    probe: Arc<dyn PortProbe>,
}

impl PortPool {
    pub fn new(base_port: Port, max_ports: u16, probe: Arc<dyn PortProbe>) -> Self {
        info!(
            base_port,
            max_ports,
            probe = ?probe,
            "🏊 POOL: Port pool created"
        );

        Self {
            base_port,
            max_ports,
            in_use: Mutex::new(BTreeSet::new()),
            probe,
        }
    }

    /// Build a pool from configuration, probing the network when enabled
    pub fn from_config(config: &PortPoolConfig) -> ConfigResult<Self> {
        let probe: Arc<dyn PortProbe> = if config.probe_network {
            Arc::new(TcpBindProbe::new(config.bind_ip()?))
        } else {
            Arc::new(AssumeFreeProbe)
        };
        Ok(Self::new(config.base_port, config.max_ports, probe))
    }

    /// Reserve the lowest free port in range
    pub fn allocate(&self) -> DispatchResult<Port> {
        let mut in_use = self.in_use.lock();

        for offset in 0..self.max_ports {
            let Some(candidate) = self.base_port.checked_add(offset) else {
                break;
            };

            if in_use.contains(&candidate) {
                continue;
            }

            if !self.probe.is_free(candidate) {
                debug!(port = candidate, "POOL: port bound externally, skipping");
                continue;
            }

            in_use.insert(candidate);
            log_port_operation("allocate", Some(candidate), in_use.len(), None);
            return Ok(candidate);
        }

        warn!(
            base_port = self.base_port,
            max_ports = self.max_ports,
            in_use = in_use.len(),
            "⚠️ POOL: Port range exhausted"
        );
        Err(DispatchError::ports_exhausted(self.base_port, self.max_ports))
    }

    /// Return `port` to the free set. Returns false when it was not held.
    pub fn release(&self, port: Port) -> bool {
        let mut in_use = self.in_use.lock();
        let released = in_use.remove(&port);

        if released {
            log_port_operation("release", Some(port), in_use.len(), None);
        } else {
            log_port_operation("release", Some(port), in_use.len(), Some("already free"));
        }

        released
    }

    pub fn is_in_use(&self, port: Port) -> bool {
        self.in_use.lock().contains(&port)
    }

    pub fn in_use_count(&self) -> usize {
        self.in_use.lock().len()
    }

    /// Ports currently held, ascending
    pub fn allocated_ports(&self) -> Vec<Port> {
        self.in_use.lock().iter().copied().collect()
    }

    pub fn base_port(&self) -> Port {
        self.base_port
    }

    pub fn capacity(&self) -> u16 {
        self.max_ports
    }
}
