//! Domain types: host-supplied task shapes and the canonical failure record.

pub mod failure;
pub mod task;

pub use failure::{
    build_full_title, collect_suite_path, extract_logs, to_error_message, to_stack,
    FailureContext,
};
pub use task::{
    FileRef, Location, SuiteNode, TaskId, TaskLike, TaskMeta, TaskResult, TaskState,
    TaskUpdatePack, TestModule,
};

/// Render a JSON value as display text: strings verbatim, everything else
/// as compact JSON.
pub(crate) fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
