//! Unified error types for the moderation engine
//!
//! This module defines error types for each layer:
//! - `ModerationError`: Engine-level errors surfaced to the operator
//! - `CollaboratorError`: Admin backend client errors
//! - `ConfigError`: Environment configuration errors

use thiserror::Error;

/// Engine errors - every failed operation maps to exactly one of these
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Transition rejected: {0}")]
    TransitionRejected(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid refund amount: {amount} (order total {total})")]
    InvalidRefundAmount { amount: f64, total: f64 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Backend error: {0}")]
    Collaborator(String),
}

impl ModerationError {
    /// Whether retrying the same call later could succeed.
    ///
    /// The engine itself never retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, ModerationError::Collaborator(_))
    }
}

/// Admin backend client errors
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected by backend: {0}")]
    Rejected(String),

    #[error("Unauthorized - invalid or expired token")]
    Unauthorized,

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl From<CollaboratorError> for ModerationError {
    fn from(e: CollaboratorError) -> Self {
        match e {
            CollaboratorError::NotFound(msg) => ModerationError::NotFound(msg),
            CollaboratorError::Rejected(msg) => ModerationError::TransitionRejected(msg),
            CollaboratorError::Unauthorized => {
                ModerationError::Unauthorized("backend refused the credential".to_string())
            }
            other => ModerationError::Collaborator(other.to_string()),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
