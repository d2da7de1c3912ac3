//! Error types for the sweep bulk deletion system.

use crate::types::{RecordId, RecordType};
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {record_type} {id}")]
    RecordNotFound { record_type: RecordType, id: RecordId },

    #[error("Corrupt record data: {0}")]
    Corrupt(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::IoError(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
    }
}

/// Service, transport and orchestration errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Insufficient permissions")]
    Unauthorized(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(
        "A {record_type} deletion run is already in progress (held by {holder} until {expires_at})"
    )]
    RunInProgress {
        record_type: RecordType,
        holder: String,
        expires_at: String,
    },

    /// `RunInProgress` as decoded from a wire envelope.
    #[error("{0}")]
    RunRejected(String),

    #[error("Run lease is not valid: {0}")]
    LeaseInvalid(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Server error: {0}")]
    Remote(String),

    #[error(
        "{remaining} {noun} remain after deletion but only {expected} were skipped",
        noun = .record_type.plural()
    )]
    VerificationMismatch {
        record_type: RecordType,
        remaining: u64,
        expected: u64,
    },

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ApiError {
    /// Stable machine-readable code carried on the wire next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::RunInProgress { .. } | ApiError::RunRejected(_) => "run_in_progress",
            ApiError::LeaseInvalid(_) => "lease_invalid",
            ApiError::InvalidRequest(_) => "bad_request",
            ApiError::Transport(_) => "transport",
            ApiError::VerificationMismatch { .. } => "verification_mismatch",
            ApiError::ConfigError(_) => "config",
            ApiError::Remote(_) | ApiError::StorageError(_) => "internal",
        }
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Transport(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            ApiError::Transport(format!("Connection error: {}", err))
        } else if err.is_decode() {
            ApiError::Transport(format!("Malformed response: {}", err))
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}
