//! In-memory transport fake (testing only)
//!
//! `RecordingTransport` keeps every envelope it is handed, counts flushes,
//! and can be told to reject its first N sends or to never finish a flush.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::event::Event;
use crate::transport::{Transport, TransportAck, TransportError};

#[derive(Debug, Default)]
pub struct RecordingTransport {
    envelopes: Mutex<Vec<Envelope>>,
    flushes: AtomicU64,
    failures_left: AtomicU64,
    flush_result: Option<bool>,
    stall_flush: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the first `count` sends with a 503.
    pub fn failing_first(count: u64) -> Self {
        Self {
            failures_left: AtomicU64::new(count),
            ..Self::default()
        }
    }

    /// Report `result` from every flush.
    pub fn with_flush_result(mut self, result: bool) -> Self {
        self.flush_result = Some(result);
        self
    }

    /// Never complete a flush.
    pub fn with_stalled_flush(mut self) -> Self {
        self.stall_flush = true;
        self
    }

    /// Envelopes accepted so far, in send order.
    pub fn envelopes(&self) -> Vec<Envelope> {
        lock(&self.envelopes).clone()
    }

    /// Event payloads of all accepted envelopes, decoded.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.envelopes)
            .iter()
            .flat_map(|envelope| envelope.event_payloads().cloned().collect::<Vec<_>>())
            .filter_map(|payload| serde_json::from_value(payload).ok())
            .collect()
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, envelope: &Envelope) -> Result<TransportAck, TransportError> {
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(TransportError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        lock(&self.envelopes).push(envelope.clone());
        Ok(TransportAck::default())
    }

    async fn flush(&self, _timeout: Duration) -> bool {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        if self.stall_flush {
            return std::future::pending().await;
        }
        self.flush_result.unwrap_or(true)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
