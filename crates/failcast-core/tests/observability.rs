//! Structured lifecycle events emitted by the reporter.

use std::sync::Arc;

use failcast_core::fakes::RecordingTransport;
use failcast_core::obs::{emit_cap_reached, emit_capture_failed, emit_run_started};
use failcast_core::{
    EnvVars, Reporter, ReporterOptions, RunSpan, TaskId, TaskLike, TaskState, TaskUpdatePack,
};
use tracing_test::traced_test;

fn failing(id: &str) -> TaskUpdatePack {
    TaskUpdatePack::new(
        TaskLike {
            id: Some(TaskId::from(id)),
            name: Some(id.to_string()),
            state: Some(TaskState::Fail),
            ..TaskLike::default()
        },
        None,
    )
}

#[traced_test]
#[test]
fn test_emitters_write_event_field() {
    let _span = RunSpan::enter("run-obs");
    emit_run_started("run-obs", true, Some("github"));
    emit_cap_reached(2, 3);
    emit_capture_failed("t-1", &"503 unavailable");

    assert!(logs_contain("run.started"));
    assert!(logs_contain("run.cap_reached"));
    assert!(logs_contain("event.capture_failed"));
}

#[traced_test]
#[tokio::test]
async fn test_reporter_run_emits_lifecycle() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(
        ReporterOptions::new()
            .with_dsn("https://key@errors.example.com/1")
            .with_transport(recorder.clone()),
        EnvVars::new(),
    );

    reporter.on_init();
    reporter.on_task_update(&[failing("a"), failing("a")]);
    reporter.on_test_run_end(&[], &[]).await;

    assert!(logs_contain("run.started"));
    assert!(logs_contain("failure.queued"));
    assert!(logs_contain("failure.duplicate"));
    assert!(logs_contain("client.initialized"));
    assert!(logs_contain("event.captured"));
    assert!(logs_contain("flush.completed"));
    assert!(logs_contain("run.finished"));
    assert!(logs_contain(reporter.run_id()));
}

#[traced_test]
#[tokio::test]
async fn test_missing_dsn_logs_single_warning() {
    let mut reporter = Reporter::with_env(
        ReporterOptions::new().with_enabled(true),
        EnvVars::new(),
    );

    reporter.on_task_update(&[failing("a"), failing("b")]);
    reporter.on_test_run_end(&[], &[]).await;

    assert!(!reporter.is_enabled());
    logs_assert(|lines: &[&str]| {
        match lines.iter().filter(|line| line.contains("client.disabled")).count() {
            1 => Ok(()),
            n => Err(format!("expected one client.disabled line, got {}", n)),
        }
    });
}
