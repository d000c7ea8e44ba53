//! Reporting client: resolved identity plus a transport.

use crate::dsn::Dsn;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::event::Event;
use crate::options::ReporterOptions;
use crate::transport::{DryRunTransport, HttpTransport, Transport, TransportError};
use failcast_ci::{CiContext, EnvVars};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Placeholder endpoint used in dry-run mode. Points at localhost and is
/// never contacted: dry-run always uses the logging transport.
pub const DRY_RUN_DSN: &str = "http://dry-run@localhost/0";

pub const DSN_ENV: &str = "SENTRY_DSN";
pub const ENVIRONMENT_ENV: &str = "SENTRY_ENVIRONMENT";
pub const RELEASE_ENV: &str = "SENTRY_RELEASE";

/// Identity every event is stamped with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub dsn: String,
    pub environment: String,
    pub release: Option<String>,
    pub dist: Option<String>,
    pub server_name: Option<String>,
    pub dry_run: bool,
}

impl ClientConfig {
    /// Resolve option, then environment variable, then inferred default.
    ///
    /// `None` when no endpoint is configured and dry-run is off.
    pub fn resolve(options: &ReporterOptions, env: &EnvVars, ci: &CiContext) -> Option<Self> {
        let dsn = options
            .dsn
            .clone()
            .filter(|dsn| !dsn.is_empty())
            .or_else(|| env.get_owned(DSN_ENV))
            .or_else(|| options.dry_run.then(|| DRY_RUN_DSN.to_string()))?;

        let environment = options
            .environment
            .clone()
            .or_else(|| env.get_owned(ENVIRONMENT_ENV))
            .unwrap_or_else(|| ci.infer_environment(env));

        let release = options
            .release
            .clone()
            .or_else(|| env.get_owned(RELEASE_ENV))
            .or_else(|| ci.commit_sha.clone());

        let dist = options.dist.clone().or_else(|| release.clone());

        Some(Self {
            dsn,
            environment,
            release,
            dist,
            server_name: options.server_name.clone(),
            dry_run: options.dry_run,
        })
    }
}

pub struct Client {
    config: ClientConfig,
    dsn: Dsn,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Build a client. Dry-run always gets the logging transport, otherwise
    /// `custom` wins over HTTP delivery.
    pub fn new(config: ClientConfig, custom: Option<Arc<dyn Transport>>) -> Result<Self> {
        let dsn = Dsn::parse(&config.dsn)?;
        let transport: Arc<dyn Transport> = match custom {
            _ if config.dry_run => Arc::new(DryRunTransport::new()),
            Some(custom) => custom,
            None => Arc::new(HttpTransport::new(&dsn)?),
        };

        Ok(Self {
            config,
            dsn,
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Stamp the event with the client's identity and send it.
    pub async fn capture(&self, mut event: Event) -> std::result::Result<Uuid, TransportError> {
        event
            .environment
            .get_or_insert_with(|| self.config.environment.clone());
        if event.release.is_none() {
            event.release = self.config.release.clone();
        }
        if event.dist.is_none() {
            event.dist = self.config.dist.clone();
        }
        if event.server_name.is_none() {
            event.server_name = self.config.server_name.clone();
        }

        let envelope = Envelope::from_event(&event, Some(self.dsn.as_str()))?;
        self.transport.send(&envelope).await?;
        Ok(event.event_id)
    }

    pub async fn flush(&self, timeout: Duration) -> bool {
        self.transport.flush(timeout).await
    }
}
