//! Error types for Therapy Flux

use thiserror::Error;

use crate::media::MediaKind;

/// Errors that can occur while running an exercise session
#[derive(Debug, Error)]
pub enum TherapyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Permission denied for {0}")]
    PermissionDenied(MediaKind),

    #[error("{0} is already held by another session")]
    StreamBusy(MediaKind),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Metrics persistence failed: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
