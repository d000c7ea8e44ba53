//! Delivery of envelopes to the backend.
//!
//! `HttpTransport` posts to the ingestion endpoint; `DryRunTransport` only
//! logs a human-readable summary of what would have been sent.

pub mod dry_run;
pub mod http;

pub use dry_run::{render_envelope, DryRunTransport, LogSink, MemorySink, RenderError, TracingSink};
pub use http::HttpTransport;

use crate::envelope::Envelope;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Acknowledgement of a delivered envelope. Empty unless the transport has
/// something to report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransportAck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Errors raised while delivering an envelope.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("backend rejected envelope with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("envelope encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid DSN: {0}")]
    InvalidDsn(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err.to_string())
    }
}

/// Envelope delivery.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one envelope.
    async fn send(&self, envelope: &Envelope) -> Result<TransportAck, TransportError>;

    /// Wait for pending deliveries, up to `timeout`. Returns whether
    /// everything was delivered.
    async fn flush(&self, timeout: Duration) -> bool;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str;
}
