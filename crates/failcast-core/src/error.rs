//! Error taxonomy for failcast.
//!
//! None of these ever reach the host test runner from the reporter callbacks;
//! they surface from configuration loading and client construction, and are
//! downgraded to log lines inside the pipeline.

use crate::transport::TransportError;

/// failcast errors.
#[derive(Debug, thiserror::Error)]
pub enum FailcastError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid DSN: {0}")]
    InvalidDsn(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for failcast operations.
pub type Result<T> = std::result::Result<T, FailcastError>;
