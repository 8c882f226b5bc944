//! Error types for the dispatch engine.
//!
//! Every variant is recoverable at the API boundary: callers surface them as
//! structured responses and nothing in the engine panics on them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Driver,
    Ride,
    User,
    Port,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver => write!(f, "driver"),
            Self::Ride => write!(f, "ride"),
            Self::User => write!(f, "user"),
            Self::Port => write!(f, "port"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: i64 },

    #[error("Invalid {entity} transition for {id}: {from} -> {to}")]
    InvalidTransition {
        entity: EntityKind,
        id: i64,
        from: String,
        to: String,
    },

    #[error("Resource exhausted: {resource} ({detail})")]
    ResourceExhausted { resource: String, detail: String },

    #[error("Session start failed for ride {ride_id} on port {port}: {reason}")]
    SessionStartFailed {
        ride_id: i64,
        port: u16,
        reason: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DispatchError {
    pub fn not_found(entity: EntityKind, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn invalid_transition(
        entity: EntityKind,
        id: i64,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            id,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn ports_exhausted(base_port: u16, scanned: u16) -> Self {
        Self::ResourceExhausted {
            resource: "port".to_string(),
            detail: format!("no free port in {scanned} slots starting at {base_port}"),
        }
    }

    /// Stable machine-readable code for boundary responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ResourceExhausted { .. } => "resource_exhausted",
            Self::SessionStartFailed { .. } => "session_start_failed",
            Self::Validation(_) => "validation_failed",
            Self::Repository(_) => "repository_error",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// All engine errors leave shared state consistent, so callers may retry or report.
    pub fn is_recoverable(&self) -> bool {
        true
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}

impl From<crate::config::ConfigurationError> for DispatchError {
    fn from(error: crate::config::ConfigurationError) -> Self {
        DispatchError::Configuration(error.to_string())
    }
}

pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
