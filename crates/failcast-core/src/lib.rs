//! failcast Core Library
//!
//! Watches a test-suite run and forwards each failing test, once, to an
//! error-tracking backend:
//! - `domain`: host task shapes and the canonical `FailureContext`
//! - `tags`: tag / extra / fingerprint synthesis
//! - `reporter`: dedup, admission, queueing, capped draining, flush
//! - `client` + `transport`: lazy client with HTTP or dry-run delivery
//! - `config`: TOML-backed reporter configuration

pub mod client;
pub mod config;
pub mod domain;
pub mod dsn;
pub mod envelope;
pub mod error;
pub mod event;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod options;
pub mod reporter;
pub mod tags;
pub mod telemetry;
pub mod transport;

pub use failcast_ci::{CiContext, CiProvider, EnvVars};

pub use client::{Client, ClientConfig, DRY_RUN_DSN};
pub use config::ReporterConfig;
pub use domain::{
    build_full_title, collect_suite_path, extract_logs, to_error_message, to_stack,
    FailureContext, TaskId, TaskLike, TaskResult, TaskState, TaskUpdatePack, TestModule,
};
pub use dsn::Dsn;
pub use envelope::{Envelope, EnvelopeHeader, ItemHeader};
pub use error::{FailcastError, Result};
pub use event::{CapturedError, Event, Level, User};
pub use metrics::{MetricsSnapshot, RunMetrics};
pub use obs::RunSpan;
pub use options::ReporterOptions;
pub use reporter::{resolve_enabled, Reporter, FLUSH_TIMEOUT};
pub use tags::{
    base_tags, clean_record, extras, fingerprint, merge_tags, test_context, RawTags, TagValue,
    Tags, DEFAULT_FINGERPRINT_TAG,
};
pub use telemetry::init_tracing;
pub use transport::{
    DryRunTransport, HttpTransport, LogSink, MemorySink, TracingSink, Transport, TransportAck,
    TransportError,
};

/// Reporter identity, used as the `reporter` tag and the HTTP user agent.
pub const REPORTER_NAME: &str = "failcast";

/// failcast version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
