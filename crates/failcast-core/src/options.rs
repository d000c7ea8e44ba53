//! Programmatic reporter configuration.
//!
//! Every field is optional. Hooks are shared closures so options can be
//! cloned and handed to several reporters.

use crate::domain::FailureContext;
use crate::event::{Event, User};
use crate::tags::RawTags;
use crate::transport::Transport;
use std::fmt;
use std::sync::Arc;

/// Admission predicate; `false` keeps a failure out of the queue.
pub type ShouldReportHook = Arc<dyn Fn(&FailureContext) -> bool + Send + Sync>;
/// Extra per-failure tags, merged under the base tags.
pub type TagsHook = Arc<dyn Fn(&FailureContext) -> Option<RawTags> + Send + Sync>;
/// Fingerprint override.
pub type FingerprintHook = Arc<dyn Fn(&FailureContext) -> Option<Vec<String>> + Send + Sync>;
pub type UserHook = Arc<dyn Fn(&FailureContext) -> Option<User> + Send + Sync>;
/// Last mutation before sending; `None` drops the event.
pub type BeforeSendHook = Arc<dyn Fn(Event, &FailureContext) -> Option<Event> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ReporterOptions {
    pub dsn: Option<String>,
    /// Explicit switch; wins over every other signal.
    pub enabled: Option<bool>,
    pub environment: Option<String>,
    pub release: Option<String>,
    pub server_name: Option<String>,
    /// Defaults to the release.
    pub dist: Option<String>,
    /// Static tags, lowest merge precedence.
    pub tags: RawTags,
    pub max_events_per_run: Option<u64>,
    /// Log events instead of sending them. Implies enabled.
    pub dry_run: bool,
    /// Reported in the `framework_version` extra.
    pub framework_version: Option<String>,
    /// Custom delivery; ignored in dry-run mode.
    pub transport: Option<Arc<dyn Transport>>,
    pub should_report: Option<ShouldReportHook>,
    pub get_tags: Option<TagsHook>,
    pub get_fingerprint: Option<FingerprintHook>,
    pub get_user: Option<UserHook>,
    pub before_send: Option<BeforeSendHook>,
}

impl ReporterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dsn(mut self, dsn: impl Into<String>) -> Self {
        self.dsn = Some(dsn.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_max_events_per_run(mut self, max: u64) -> Self {
        self.max_events_per_run = Some(max);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_framework_version(mut self, version: impl Into<String>) -> Self {
        self.framework_version = Some(version.into());
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_should_report(
        mut self,
        hook: impl Fn(&FailureContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_report = Some(Arc::new(hook));
        self
    }

    pub fn with_get_tags(
        mut self,
        hook: impl Fn(&FailureContext) -> Option<RawTags> + Send + Sync + 'static,
    ) -> Self {
        self.get_tags = Some(Arc::new(hook));
        self
    }

    pub fn with_get_fingerprint(
        mut self,
        hook: impl Fn(&FailureContext) -> Option<Vec<String>> + Send + Sync + 'static,
    ) -> Self {
        self.get_fingerprint = Some(Arc::new(hook));
        self
    }

    pub fn with_get_user(
        mut self,
        hook: impl Fn(&FailureContext) -> Option<User> + Send + Sync + 'static,
    ) -> Self {
        self.get_user = Some(Arc::new(hook));
        self
    }

    pub fn with_before_send(
        mut self,
        hook: impl Fn(Event, &FailureContext) -> Option<Event> + Send + Sync + 'static,
    ) -> Self {
        self.before_send = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for ReporterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterOptions")
            .field("dsn", &self.dsn.as_ref().map(|_| "<redacted>"))
            .field("enabled", &self.enabled)
            .field("environment", &self.environment)
            .field("release", &self.release)
            .field("server_name", &self.server_name)
            .field("dist", &self.dist)
            .field("tags", &self.tags)
            .field("max_events_per_run", &self.max_events_per_run)
            .field("dry_run", &self.dry_run)
            .field("framework_version", &self.framework_version)
            .field("transport", &self.transport.as_ref().map(|t| t.name()))
            .field("should_report", &self.should_report.is_some())
            .field("get_tags", &self.get_tags.is_some())
            .field("get_fingerprint", &self.get_fingerprint.is_some())
            .field("get_user", &self.get_user.is_some())
            .field("before_send", &self.before_send.is_some())
            .finish()
    }
}
