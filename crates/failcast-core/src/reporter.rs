//! The reporting pipeline.
//!
//! A [`Reporter`] is driven by the host test runner:
//! - `on_init` once when the run starts
//! - `on_task_update` for every batch of task updates
//! - `on_test_run_end` once the run is over
//!
//! Failing tasks are deduplicated by identity, normalized into a
//! [`FailureContext`], filtered by the admission hook and queued. At run end
//! the queue is drained in insertion order, capped by `max_events_per_run`,
//! and the client is flushed on a best-effort basis. Nothing in here returns
//! an error to the host: every failure degrades to a log line.

use crate::client::{Client, ClientConfig, DSN_ENV};
use crate::domain::{FailureContext, TaskLike, TaskResult, TaskUpdatePack, TestModule};
use crate::event::{CapturedError, Event};
use crate::metrics::{MetricsSnapshot, RunMetrics};
use crate::obs;
use crate::options::ReporterOptions;
use crate::tags::{base_tags, extras, fingerprint, merge_tags, test_context};
use crate::REPORTER_NAME;
use failcast_ci::{CiContext, EnvVars};
use serde_json::Value;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

/// Upper bound for the run-end flush.
pub const FLUSH_TIMEOUT: Duration = Duration::from_millis(3000);

/// Whether a reporter built from `options` reports at all.
///
/// The explicit switch wins; dry-run forces reporting on; otherwise a DSN
/// must be configured, either in the options or in `SENTRY_DSN`.
pub fn resolve_enabled(options: &ReporterOptions, env: &EnvVars) -> bool {
    if let Some(enabled) = options.enabled {
        return enabled;
    }
    if options.dry_run {
        return true;
    }
    options.dsn.as_deref().is_some_and(|dsn| !dsn.is_empty()) || env.is_set(DSN_ENV)
}

pub struct Reporter {
    options: ReporterOptions,
    env: EnvVars,
    ci: CiContext,
    run_id: String,
    started_at: Instant,
    enabled: bool,
    initialized: bool,
    client: Option<Client>,
    reported_ids: HashSet<String>,
    queued: Vec<FailureContext>,
    /// Emissions attempted over the reporter's lifetime; what the cap counts.
    attempted: u64,
    metrics: RunMetrics,
}

impl Reporter {
    /// Reporter reading the process environment.
    pub fn new(options: ReporterOptions) -> Self {
        Self::with_env(options, EnvVars::from_process())
    }

    /// Reporter reading `env` instead of the process environment.
    pub fn with_env(options: ReporterOptions, env: EnvVars) -> Self {
        let ci = CiContext::from_env(&env);
        let enabled = resolve_enabled(&options, &env);
        if !enabled {
            debug!(dry_run = options.dry_run, "failcast reporter disabled");
        }

        Self {
            options,
            env,
            ci,
            run_id: Uuid::new_v4().to_string(),
            started_at: Instant::now(),
            enabled,
            initialized: false,
            client: None,
            reported_ids: HashSet::new(),
            queued: Vec::new(),
            attempted: 0,
            metrics: RunMetrics::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        REPORTER_NAME
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the client has been created.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Failures waiting for the next run end.
    pub fn queued(&self) -> &[FailureContext] {
        &self.queued
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn ci_context(&self) -> &CiContext {
        &self.ci
    }

    /// Host callback: the run starts.
    pub fn on_init(&mut self) {
        self.started_at = Instant::now();
        obs::emit_run_started(&self.run_id, self.enabled, self.ci.provider_name());
    }

    /// Host callback: a batch of task updates.
    pub fn on_task_update(&mut self, packs: &[TaskUpdatePack]) {
        let _span = obs::RunSpan::enter(&self.run_id);
        for pack in packs {
            let (task, result) = pack.parts();
            self.observe(task, result);
        }
    }

    /// Host callback: the run is over.
    ///
    /// Picks up failures the update stream missed, drains the queue and
    /// flushes. Never fails.
    pub async fn on_test_run_end(&mut self, files: &[TestModule], unhandled_errors: &[Value]) {
        let span = obs::run_span(&self.run_id);
        self.finish_run(files, unhandled_errors)
            .instrument(span)
            .await
    }

    async fn finish_run(&mut self, files: &[TestModule], unhandled_errors: &[Value]) {
        for task in files.iter().flat_map(|file| file.tasks.iter()) {
            self.observe(task, None);
        }

        if !unhandled_errors.is_empty() {
            warn!(
                count = unhandled_errors.len(),
                "test run reported unhandled errors; they are not forwarded"
            );
        }

        self.drain().await;

        if self.enabled && self.initialized {
            if let Some(client) = &self.client {
                // Outcome is informational only; a slow or failed flush must
                // not hold up or fail the run.
                let completed = tokio::time::timeout(FLUSH_TIMEOUT, client.flush(FLUSH_TIMEOUT))
                    .await
                    .unwrap_or(false);
                obs::emit_flush_completed(completed, FLUSH_TIMEOUT.as_millis() as u64);
            }
        }

        self.metrics.flush();
        obs::emit_run_finished(
            &self.run_id,
            self.started_at.elapsed().as_millis() as u64,
            self.metrics.snapshot().captured,
            unhandled_errors.len(),
        );
    }

    /// Dedup, build, admit and queue one task if it failed.
    fn observe(&mut self, task: &TaskLike, result: Option<&TaskResult>) {
        let result = result.or(task.result.as_ref());
        if !task.is_failed(result) {
            return;
        }
        self.metrics.inc_failures_seen();

        let identity = task.identity();
        if !self.reported_ids.insert(identity.clone()) {
            self.metrics.inc_duplicates();
            obs::emit_failure_duplicate(&identity);
            return;
        }

        let ctx = FailureContext::build(task, result);
        let admitted = self
            .options
            .should_report
            .as_ref()
            .map_or(true, |should_report| should_report(&ctx));
        if !admitted {
            self.metrics.inc_skipped();
            obs::emit_failure_skipped(&identity);
            return;
        }

        self.metrics.inc_queued();
        obs::emit_failure_queued(&identity, &ctx.test_name, self.queued.len() + 1);
        self.queued.push(ctx);
    }

    async fn drain(&mut self) {
        let queue = std::mem::take(&mut self.queued);
        for (index, ctx) in queue.iter().enumerate() {
            if !self.enabled {
                continue;
            }
            if let Some(max) = self.options.max_events_per_run {
                if self.attempted >= max {
                    let remaining = queue.len() - index;
                    self.metrics.add_capped(remaining as u64);
                    obs::emit_cap_reached(max, remaining);
                    break;
                }
            }
            self.emit(ctx).await;
        }
    }

    /// Send one failure. Errors are logged and counted, never propagated,
    /// so one bad event cannot stop the rest of the queue.
    async fn emit(&mut self, ctx: &FailureContext) {
        if !self.ensure_client() {
            return;
        }
        self.attempted += 1;

        let test_id = ctx.id.as_deref().unwrap_or(&ctx.test_name);
        let Some(event) = self.build_event(ctx) else {
            self.metrics.inc_dropped();
            obs::emit_event_dropped(test_id);
            return;
        };
        let Some(client) = &self.client else {
            return;
        };

        match client.capture(event).await {
            Ok(event_id) => {
                self.metrics.inc_captured();
                obs::emit_event_captured(test_id, &event_id.to_string());
            }
            Err(e) => {
                self.metrics.inc_capture_failures();
                obs::emit_capture_failed(test_id, &e);
            }
        }
    }

    /// Create the client on first use. On failure the reporter disables
    /// itself for the rest of its lifetime.
    fn ensure_client(&mut self) -> bool {
        if self.initialized {
            return self.client.is_some();
        }

        let Some(config) = ClientConfig::resolve(&self.options, &self.env, &self.ci) else {
            self.disable(&"no DSN configured");
            return false;
        };

        match Client::new(config, self.options.transport.clone()) {
            Ok(client) => {
                let config = client.config();
                obs::emit_client_initialized(
                    client.transport_name(),
                    Some(config.environment.as_str()),
                    config.release.as_deref(),
                );
                self.client = Some(client);
                self.initialized = true;
                true
            }
            Err(e) => {
                self.disable(&e);
                false
            }
        }
    }

    fn disable(&mut self, reason: &dyn std::fmt::Display) {
        self.enabled = false;
        obs::emit_client_disabled(reason);
    }

    /// Assemble the event for one failure; `None` when `before_send` drops it.
    pub fn build_event(&self, ctx: &FailureContext) -> Option<Event> {
        let dynamic_tags = self.options.get_tags.as_ref().and_then(|hook| hook(ctx));
        let custom_fingerprint = self
            .options
            .get_fingerprint
            .as_ref()
            .and_then(|hook| hook(ctx));

        let mut event = Event::from_error(&CapturedError::from_failure(ctx));
        event.tags = merge_tags(
            &self.options.tags,
            dynamic_tags.as_ref(),
            &base_tags(ctx, &self.ci),
        );
        event.extra = extras(ctx, &self.ci, self.options.framework_version.as_deref());
        event.contexts.insert("test".to_string(), test_context(ctx));
        event.fingerprint = fingerprint(ctx, custom_fingerprint);
        event.user = self.options.get_user.as_ref().and_then(|hook| hook(ctx));

        match &self.options.before_send {
            Some(before_send) => before_send(event, ctx),
            None => Some(event),
        }
    }
}
