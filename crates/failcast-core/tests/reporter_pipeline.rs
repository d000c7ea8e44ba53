//! End-to-end reporter behaviour against an in-memory transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use failcast_core::fakes::RecordingTransport;
use failcast_core::{
    EnvVars, Level, Reporter, ReporterOptions, TagValue, TaskId, TaskLike, TaskResult, TaskState,
    TaskUpdatePack, TestModule, User, FLUSH_TIMEOUT,
};
use serde_json::{json, Value};
use tracing_test::traced_test;

const DSN: &str = "https://key@errors.example.com/1";

fn failing(id: &str) -> TaskLike {
    TaskLike {
        id: Some(TaskId::from(id)),
        name: Some(format!("test {}", id)),
        state: Some(TaskState::Fail),
        ..TaskLike::default()
    }
}

fn updates(ids: &[&str]) -> Vec<TaskUpdatePack> {
    ids.iter()
        .map(|id| TaskUpdatePack::new(failing(id), None))
        .collect()
}

fn options(recorder: &Arc<RecordingTransport>) -> ReporterOptions {
    ReporterOptions::new()
        .with_dsn(DSN)
        .with_transport(recorder.clone())
}

async fn run(reporter: &mut Reporter, ids: &[&str]) {
    reporter.on_init();
    reporter.on_task_update(&updates(ids));
    reporter.on_test_run_end(&[], &[]).await;
}

#[tokio::test]
async fn test_disabled_without_dsn() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(
        ReporterOptions::new().with_transport(recorder.clone()),
        EnvVars::new(),
    );
    assert!(!reporter.is_enabled());

    run(&mut reporter, &["a"]).await;

    assert!(recorder.envelopes().is_empty());
    assert!(!reporter.is_initialized());
    assert_eq!(recorder.flush_count(), 0);
    assert!(reporter.queued().is_empty());
}

#[tokio::test]
async fn test_explicit_disable_beats_dsn() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter =
        Reporter::with_env(options(&recorder).with_enabled(false), EnvVars::new());

    run(&mut reporter, &["a"]).await;

    assert!(recorder.envelopes().is_empty());
}

#[tokio::test]
async fn test_dsn_from_environment_enables() {
    let recorder = Arc::new(RecordingTransport::new());
    let env = EnvVars::new().with("SENTRY_DSN", DSN);
    let mut reporter =
        Reporter::with_env(ReporterOptions::new().with_transport(recorder.clone()), env);
    assert!(reporter.is_enabled());

    run(&mut reporter, &["a"]).await;

    assert_eq!(recorder.events().len(), 1);
}

#[tokio::test]
async fn test_same_identity_reported_once() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(options(&recorder), EnvVars::new());

    reporter.on_task_update(&updates(&["a", "a"]));
    reporter.on_task_update(&updates(&["a"]));
    let files = vec![TestModule {
        tasks: vec![failing("a")],
    }];
    reporter.on_test_run_end(&files, &[]).await;

    assert_eq!(recorder.events().len(), 1);
    assert_eq!(reporter.metrics().duplicates, 3);
}

#[tokio::test]
async fn test_run_end_picks_up_missed_failures() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(options(&recorder), EnvVars::new());

    let mut late = TaskLike {
        id: Some(TaskId::from("late")),
        name: Some("late".into()),
        ..TaskLike::default()
    };
    late.result = Some(TaskResult {
        state: Some(TaskState::Fail),
        ..TaskResult::default()
    });
    let passing = TaskLike {
        id: Some(TaskId::from("ok")),
        state: Some(TaskState::Pass),
        ..TaskLike::default()
    };

    reporter
        .on_test_run_end(&[TestModule { tasks: vec![late, passing] }], &[])
        .await;

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tags["test_name"], TagValue::from("late"));
}

#[tokio::test]
async fn test_should_report_called_once_per_identity() {
    let recorder = Arc::new(RecordingTransport::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut reporter = Reporter::with_env(
        options(&recorder).with_should_report(move |ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            ctx.test_name != "test skip"
        }),
        EnvVars::new(),
    );

    run(&mut reporter, &["skip", "skip", "keep"]).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tags["test_name"], TagValue::from("test keep"));
    assert_eq!(reporter.metrics().skipped, 1);
}

#[tokio::test]
async fn test_cap_limits_emissions() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(
        options(&recorder).with_max_events_per_run(2),
        EnvVars::new(),
    );

    run(&mut reporter, &["1", "2", "3", "4", "5"]).await;

    let names: Vec<String> = recorder
        .events()
        .iter()
        .map(|event| event.tags["test_name"].to_string())
        .collect();
    assert_eq!(names, vec!["test 1", "test 2"]);
    assert_eq!(reporter.metrics().capped, 3);
}

#[tokio::test]
async fn test_zero_cap_sends_nothing() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(
        options(&recorder).with_max_events_per_run(0),
        EnvVars::new(),
    );

    run(&mut reporter, &["1", "2"]).await;

    assert!(recorder.envelopes().is_empty());
    assert!(!reporter.is_initialized());
    assert_eq!(recorder.flush_count(), 0);
}

#[tokio::test]
async fn test_base_tags_win_over_static_and_dynamic() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(
        options(&recorder)
            .with_tag("test_name", "static")
            .with_tag("team", "core")
            .with_tag("owner", Value::Null)
            .with_get_tags(|_| {
                let mut tags = serde_json::Map::new();
                tags.insert("ci".into(), json!("dynamic"));
                tags.insert("team".into(), json!("platform"));
                tags.insert("shard".into(), json!(3));
                Some(tags)
            }),
        EnvVars::new(),
    );

    run(&mut reporter, &["a"]).await;

    let tags = &recorder.events()[0].tags;
    assert_eq!(tags["test_name"], TagValue::from("test a"));
    assert_eq!(tags["ci"], TagValue::from("local"));
    assert_eq!(tags["team"], TagValue::from("platform"));
    assert_eq!(tags["shard"], TagValue::Int(3));
    assert!(!tags.contains_key("owner"));
}

#[tokio::test]
async fn test_before_send_can_drop() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(
        options(&recorder).with_before_send(|event, ctx| {
            if ctx.test_name == "test drop" {
                None
            } else {
                Some(event)
            }
        }),
        EnvVars::new(),
    );

    run(&mut reporter, &["drop", "keep"]).await;

    assert_eq!(recorder.events().len(), 1);
    let metrics = reporter.metrics();
    assert_eq!(metrics.dropped, 1);
    assert_eq!(metrics.captured, 1);
}

#[tokio::test]
async fn test_before_send_sees_final_event() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(
        options(&recorder)
            .with_get_user(|_| {
                Some(User {
                    id: Some("u-1".into()),
                    ..User::default()
                })
            })
            .with_before_send(|mut event, _| {
                assert_eq!(event.user.as_ref().and_then(|u| u.id.as_deref()), Some("u-1"));
                event.level = Level::Warning;
                event.tags.insert("mutated".into(), TagValue::Bool(true));
                Some(event)
            }),
        EnvVars::new(),
    );

    run(&mut reporter, &["a"]).await;

    let event = &recorder.events()[0];
    assert_eq!(event.level, Level::Warning);
    assert_eq!(event.tags["mutated"], TagValue::Bool(true));
}

#[tokio::test]
async fn test_fingerprint_default_and_override() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(options(&recorder), EnvVars::new());
    run(&mut reporter, &["a"]).await;
    assert_eq!(
        recorder.events()[0].fingerprint,
        vec!["test-failure", "unknown-file", "test a"]
    );

    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(
        options(&recorder).with_get_fingerprint(|ctx| Some(vec![ctx.test_name.to_uppercase()])),
        EnvVars::new(),
    );
    run(&mut reporter, &["a"]).await;
    assert_eq!(recorder.events()[0].fingerprint, vec!["TEST A"]);
}

#[tokio::test]
async fn test_error_object_reused_or_synthesized() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(options(&recorder), EnvVars::new());

    let mut real = failing("real");
    real.errors = Some(vec![json!({
        "name": "AssertionError",
        "message": "expected 1 to be 2",
        "stack": "AssertionError: expected 1 to be 2\n    at real.test.ts:4"
    })]);
    let synthesized = failing("bare");

    reporter.on_task_update(&[
        TaskUpdatePack::new(real, None),
        TaskUpdatePack::new(synthesized, None),
    ]);
    reporter.on_test_run_end(&[], &[]).await;

    let events = recorder.events();
    let real = events[0].error_record().expect("exception");
    assert_eq!(real.ty, "AssertionError");
    assert_eq!(real.value, "expected 1 to be 2");
    assert!(real.stack.as_deref().unwrap_or_default().contains("real.test.ts:4"));

    let bare = events[1].error_record().expect("exception");
    assert_eq!(bare.ty, "Error");
    assert_eq!(bare.value, "test bare");
    assert_eq!(bare.stack, None);
}

#[tokio::test]
async fn test_flush_only_after_client_initialized() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(options(&recorder), EnvVars::new());
    run(&mut reporter, &[]).await;
    assert!(!reporter.is_initialized());
    assert_eq!(recorder.flush_count(), 0);

    run(&mut reporter, &["a"]).await;
    assert!(reporter.is_initialized());
    assert_eq!(recorder.flush_count(), 1);
}

#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_stalled_flush_gives_up_after_timeout() {
    let recorder = Arc::new(RecordingTransport::new().with_stalled_flush());
    let mut reporter = Reporter::with_env(options(&recorder), EnvVars::new());
    let started = tokio::time::Instant::now();

    tokio::time::timeout(Duration::from_secs(60), run(&mut reporter, &["a"]))
        .await
        .expect("run end returns despite a stalled flush");

    assert!(started.elapsed() >= FLUSH_TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(recorder.flush_count(), 1);
    assert_eq!(reporter.metrics().captured, 1);
    assert!(logs_contain("flush.completed"));
    assert!(logs_contain("completed=false"));
}

#[tokio::test]
async fn test_failed_flush_is_swallowed() {
    let recorder = Arc::new(RecordingTransport::new().with_flush_result(false));
    let mut reporter = Reporter::with_env(options(&recorder), EnvVars::new());

    run(&mut reporter, &["a"]).await;

    assert_eq!(recorder.flush_count(), 1);
    assert_eq!(reporter.metrics().captured, 1);
}

#[tokio::test]
async fn test_capture_failure_does_not_stop_draining() {
    let recorder = Arc::new(RecordingTransport::failing_first(1));
    let mut reporter = Reporter::with_env(options(&recorder), EnvVars::new());

    run(&mut reporter, &["1", "2", "3"]).await;

    assert_eq!(recorder.events().len(), 2);
    let metrics = reporter.metrics();
    assert_eq!(metrics.capture_failures, 1);
    assert_eq!(metrics.captured, 2);
}

#[tokio::test]
async fn test_ci_identity_flows_into_event() {
    let recorder = Arc::new(RecordingTransport::new());
    let env = EnvVars::new()
        .with("CI", "true")
        .with("GITHUB_ACTIONS", "true")
        .with("GITHUB_REPOSITORY", "acme/widgets")
        .with("GITHUB_REF_NAME", "main")
        .with("GITHUB_SHA", "abc123");
    let mut reporter = Reporter::with_env(options(&recorder), env);

    run(&mut reporter, &["a"]).await;

    let event = &recorder.events()[0];
    assert_eq!(event.environment.as_deref(), Some("ci"));
    assert_eq!(event.release.as_deref(), Some("abc123"));
    assert_eq!(event.tags["ci"], TagValue::from("github"));
    assert_eq!(event.tags["repository"], TagValue::from("acme/widgets"));
    assert_eq!(event.tags["branch"], TagValue::from("main"));
    assert_eq!(event.tags["commit_sha"], TagValue::from("abc123"));
    assert_eq!(event.extra["env"]["GITHUB_SHA"], "abc123");
}

#[tokio::test]
async fn test_explicit_environment_and_release_win() {
    let recorder = Arc::new(RecordingTransport::new());
    let env = EnvVars::new()
        .with("GITHUB_ACTIONS", "true")
        .with("GITHUB_SHA", "abc123")
        .with("SENTRY_RELEASE", "from-env");
    let mut reporter = Reporter::with_env(
        options(&recorder).with_environment("staging"),
        env,
    );

    run(&mut reporter, &["a"]).await;

    let event = &recorder.events()[0];
    assert_eq!(event.environment.as_deref(), Some("staging"));
    assert_eq!(event.release.as_deref(), Some("from-env"));
}

#[tokio::test]
async fn test_invalid_dsn_disables_reporter() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(
        ReporterOptions::new()
            .with_dsn("not a dsn")
            .with_transport(recorder.clone()),
        EnvVars::new(),
    );
    assert!(reporter.is_enabled());

    run(&mut reporter, &["a", "b"]).await;

    assert!(!reporter.is_enabled());
    assert!(!reporter.is_initialized());
    assert!(recorder.envelopes().is_empty());
}

#[tokio::test]
async fn test_drained_failures_not_resent() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(options(&recorder), EnvVars::new());

    run(&mut reporter, &["a"]).await;
    reporter.on_test_run_end(&[], &[]).await;

    assert_eq!(recorder.events().len(), 1);
    assert!(reporter.queued().is_empty());
}

#[tokio::test]
async fn test_dry_run_bypasses_custom_transport() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(
        ReporterOptions::new()
            .with_dry_run(true)
            .with_transport(recorder.clone()),
        EnvVars::new(),
    );
    assert!(reporter.is_enabled());

    run(&mut reporter, &["a"]).await;

    assert!(reporter.is_initialized());
    assert!(recorder.envelopes().is_empty());
    assert_eq!(reporter.metrics().captured, 1);
}

#[tokio::test]
async fn test_unhandled_errors_do_not_fail_the_run() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(options(&recorder), EnvVars::new());

    reporter
        .on_test_run_end(&[], &[json!({ "message": "unhandled rejection" })])
        .await;

    assert!(recorder.envelopes().is_empty());
}

#[tokio::test]
async fn test_event_extras_and_context() {
    let recorder = Arc::new(RecordingTransport::new());
    let mut reporter = Reporter::with_env(
        options(&recorder).with_framework_version("1.6.0"),
        EnvVars::new(),
    );

    let mut task = failing("a");
    task.duration = Some(42.0);
    task.logs = Some(vec![json!("stdout line")]);
    reporter.on_task_update(&[TaskUpdatePack::new(task, None)]);
    reporter.on_test_run_end(&[], &[]).await;

    let event = &recorder.events()[0];
    assert_eq!(event.extra["duration_ms"], 42.0);
    assert_eq!(event.extra["logs"], json!(["stdout line"]));
    assert_eq!(event.extra["framework_version"], "1.6.0");
    assert_eq!(event.extra["env"], json!({}));
    assert_eq!(event.contexts["test"]["name"], "test a");
    assert_eq!(event.contexts["test"]["flaky"], false);
}
