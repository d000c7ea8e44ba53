//! Per-reporter atomic counters.
//!
//! Counters are incremented silently at the call site. Call
//! [`RunMetrics::flush`] to emit current values as a single
//! `tracing::info!` event (the reporter does so at the end of each run).

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight atomic counters, no allocations, no locking.
#[derive(Debug, Default)]
pub struct RunMetrics {
    failures_seen: AtomicU64,
    duplicates: AtomicU64,
    skipped: AtomicU64,
    queued: AtomicU64,
    captured: AtomicU64,
    dropped: AtomicU64,
    capture_failures: AtomicU64,
    capped: AtomicU64,
}

/// Point-in-time copy of [`RunMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub failures_seen: u64,
    pub duplicates: u64,
    pub skipped: u64,
    pub queued: u64,
    pub captured: u64,
    pub dropped: u64,
    pub capture_failures: u64,
    pub capped: u64,
}

impl MetricsSnapshot {
    /// Emissions attempted while enabled (what the per-run cap counts).
    pub fn attempted(&self) -> u64 {
        self.captured + self.dropped + self.capture_failures
    }
}

fn bump(counter: &AtomicU64, by: u64, metric: &'static str) {
    counter.fetch_add(by, Ordering::Relaxed);
    tracing::trace!(metric = metric, "counter incremented");
}

impl RunMetrics {
    pub const fn new() -> Self {
        Self {
            failures_seen: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            queued: AtomicU64::new(0),
            captured: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            capture_failures: AtomicU64::new(0),
            capped: AtomicU64::new(0),
        }
    }

    /// A failed task was observed in an update batch.
    pub fn inc_failures_seen(&self) {
        bump(&self.failures_seen, 1, "failures_seen");
    }

    pub fn inc_duplicates(&self) {
        bump(&self.duplicates, 1, "duplicates");
    }

    pub fn inc_skipped(&self) {
        bump(&self.skipped, 1, "skipped");
    }

    pub fn inc_queued(&self) {
        bump(&self.queued, 1, "queued");
    }

    pub fn inc_captured(&self) {
        bump(&self.captured, 1, "captured");
    }

    /// `before_send` returned nothing.
    pub fn inc_dropped(&self) {
        bump(&self.dropped, 1, "dropped");
    }

    pub fn inc_capture_failures(&self) {
        bump(&self.capture_failures, 1, "capture_failures");
    }

    /// Failures left unsent because the cap was reached.
    pub fn add_capped(&self, count: u64) {
        bump(&self.capped, count, "capped");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            failures_seen: self.failures_seen.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            captured: self.captured.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
            capped: self.capped.load(Ordering::Relaxed),
        }
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            failures_seen = s.failures_seen,
            duplicates = s.duplicates,
            skipped = s.skipped,
            queued = s.queued,
            captured = s.captured,
            dropped = s.dropped,
            capture_failures = s.capture_failures,
            capped = s.capped,
        );
    }
}
