//! Structured observability hooks for the reporting lifecycle.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `RunSpan` RAII guard and [`run_span`]
//! - Emission functions for lifecycle events: run start/finish, failure
//!   admission, capture outcome, client setup, flush
//!
//! Every event carries an `event = "..."` field so log pipelines can filter
//! on it. Events are emitted at `info!`, except the ones that signal lost
//! reports, which use `warn!`.

use tracing::{debug, info, warn};

/// RAII guard that enters a run-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = RunSpan::enter("run-12345");
/// // tracing calls on this thread now carry run_id = "run-12345"
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run id.
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: run_span(run_id).entered(),
        }
    }
}

/// The span [`RunSpan`] enters. Async code attaches it with
/// `tracing::Instrument` instead of entering it.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("failcast.run", run_id = %run_id)
}

/// Emit event: reporter attached to a test run.
pub fn emit_run_started(run_id: &str, enabled: bool, ci_provider: Option<&str>) {
    info!(
        event = "run.started",
        run_id = %run_id,
        enabled = enabled,
        ci_provider = ci_provider.unwrap_or("none"),
    );
}

/// Emit event: failure admitted to the queue.
pub fn emit_failure_queued(test_id: &str, test_name: &str, queued: usize) {
    debug!(event = "failure.queued", test_id = %test_id, test_name = %test_name, queued = queued);
}

/// Emit event: failure rejected by the admission predicate.
pub fn emit_failure_skipped(test_id: &str) {
    debug!(event = "failure.skipped", test_id = %test_id);
}

/// Emit event: failure already seen this run.
pub fn emit_failure_duplicate(test_id: &str) {
    debug!(event = "failure.duplicate", test_id = %test_id);
}

/// Emit event: event handed to the transport.
pub fn emit_event_captured(test_id: &str, event_id: &str) {
    info!(event = "event.captured", test_id = %test_id, event_id = %event_id);
}

/// Emit event: `before_send` discarded the event.
pub fn emit_event_dropped(test_id: &str) {
    info!(event = "event.dropped", test_id = %test_id);
}

/// Emit event: building or sending one event failed (warning level).
pub fn emit_capture_failed(test_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "event.capture_failed", test_id = %test_id, error = %error);
}

/// Emit event: per-run cap reached; the rest of the queue is not sent.
pub fn emit_cap_reached(max_events: u64, remaining: usize) {
    warn!(event = "run.cap_reached", max_events = max_events, remaining = remaining);
}

/// Emit event: client created on first use.
pub fn emit_client_initialized(transport: &str, environment: Option<&str>, release: Option<&str>) {
    info!(
        event = "client.initialized",
        transport = %transport,
        environment = environment.unwrap_or(""),
        release = release.unwrap_or(""),
    );
}

/// Emit event: no usable client, reporting disabled (warning level).
pub fn emit_client_disabled(reason: &dyn std::fmt::Display) {
    warn!(event = "client.disabled", reason = %reason);
}

/// Emit event: best-effort flush finished or timed out.
pub fn emit_flush_completed(completed: bool, timeout_ms: u64) {
    info!(event = "flush.completed", completed = completed, timeout_ms = timeout_ms);
}

/// Emit event: run-end processing finished.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, captured: u64, unhandled_errors: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        captured = captured,
        unhandled_errors = unhandled_errors,
    );
}
