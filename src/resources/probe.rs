//! Network probes used by the port pool to skip ports bound outside the engine.

use crate::models::Port;
use std::fmt;
use std::net::{IpAddr, TcpListener};

pub trait PortProbe: Send + Sync + fmt::Debug {
    /// True when nothing outside the pool currently holds `port`
    fn is_free(&self, port: Port) -> bool;
}

/// Probes by binding and immediately dropping a TCP listener.
/// Any bind failure counts as busy.
#[derive(Debug, Clone, Copy)]
pub struct TcpBindProbe {
    bind_address: IpAddr,
}

impl TcpBindProbe {
    pub fn new(bind_address: IpAddr) -> Self {
        Self { bind_address }
    }
}

impl PortProbe for TcpBindProbe {
    fn is_free(&self, port: Port) -> bool {
        TcpListener::bind((self.bind_address, port)).is_ok()
    }
}

/// Trusts the pool's own bookkeeping without touching the network
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeFreeProbe;

impl PortProbe for AssumeFreeProbe {
    fn is_free(&self, _port: Port) -> bool {
        true
    }
}
