//! Canonical failure record and the builder that produces it.
//!
//! Building is total: malformed or missing task fields degrade to absent
//! values, never to an error.

use super::task::{TaskLike, TaskResult};
use super::value_to_string;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Separator between suite names and the test name in a full title.
pub const TITLE_SEPARATOR: &str = " > ";

/// Normalized description of one failing test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureContext {
    pub id: Option<String>,
    pub file_path: Option<String>,
    pub test_name: String,
    pub full_title: Option<String>,
    /// Outer-to-inner suite names.
    pub suite_path: Option<Vec<String>>,
    pub message: Option<String>,
    pub stack: Option<String>,
    /// First reported error, exactly as the host sent it.
    pub error: Option<Value>,
    pub duration_ms: Option<f64>,
    pub retry: Option<u32>,
    pub flaky: Option<bool>,
    pub logs: Option<Vec<String>>,
    pub meta: Option<Value>,
}

impl FailureContext {
    /// Minimal record carrying only a test name.
    pub fn named(test_name: &str) -> Self {
        Self {
            id: None,
            file_path: None,
            test_name: test_name.to_string(),
            full_title: None,
            suite_path: None,
            message: None,
            stack: None,
            error: None,
            duration_ms: None,
            retry: None,
            flaky: None,
            logs: None,
            meta: None,
        }
    }

    /// Normalize a task (and its result, when the host supplied one).
    pub fn build(task: &TaskLike, result: Option<&TaskResult>) -> Self {
        let first_error = result
            .and_then(|r| r.errors.as_ref())
            .or(task.errors.as_ref())
            .and_then(|errors| errors.first())
            .cloned();

        let test_name = task
            .name
            .clone()
            .or_else(|| task.full_name.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let file_path = task
            .file
            .as_ref()
            .and_then(|f| f.filepath.clone().or_else(|| f.name.clone()))
            .or_else(|| task.location.as_ref().and_then(|l| l.file.clone()));

        let suite_path = match &task.suite_path {
            Some(explicit) => Some(explicit.clone()),
            None if task.enclosing().is_some() => Some(collect_suite_path(task)),
            None => None,
        };

        let full_title = build_full_title(suite_path.as_deref(), &test_name);
        let message = to_error_message(first_error.as_ref());
        let stack = to_stack(first_error.as_ref());

        let duration_ms = result.and_then(|r| r.duration).or(task.duration);
        let retry = result.and_then(|r| r.retry).or(task.retry);
        let flaky = result
            .and_then(|r| r.flaky)
            .or_else(|| task.meta.as_ref().and_then(|m| m.flaky))
            .unwrap_or(false);

        let logs = result
            .and_then(|r| r.logs.as_deref())
            .or_else(|| task.result.as_ref().and_then(|r| r.logs.as_deref()))
            .or(task.logs.as_deref())
            .map(extract_logs);

        let id = task
            .id
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| task.name.clone())
            .or_else(|| file_path.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let meta = json!({
            "rawTask": serde_json::to_value(task).unwrap_or(Value::Null),
            "rawResult": result
                .and_then(|r| serde_json::to_value(r).ok())
                .unwrap_or(Value::Null),
        });

        Self {
            id: Some(id),
            file_path,
            test_name,
            full_title: Some(full_title),
            suite_path,
            message,
            stack,
            error: first_error,
            duration_ms,
            retry,
            flaky: Some(flaky),
            logs,
            meta: Some(meta),
        }
    }
}

/// Whether a reported error value counts as absent: null, `false`, zero or
/// the empty string.
fn is_blank_error(error: &Value) -> bool {
    match error {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Display message of a reported error.
///
/// Strings are used verbatim; error-like objects yield their `message`, then
/// their `name`, then the literal `"Error"`. Blank values yield `None`.
pub fn to_error_message(error: Option<&Value>) -> Option<String> {
    match error.filter(|e| !is_blank_error(e))? {
        Value::String(s) => Some(s.clone()),
        Value::Object(fields) => Some(
            ["message", "name"]
                .iter()
                .filter_map(|key| fields.get(*key))
                .find(|v| !v.is_null())
                .map(value_to_string)
                .unwrap_or_else(|| "Error".to_string()),
        ),
        _ => Some("Error".to_string()),
    }
}

/// The error's `stack` field when it is a string.
pub fn to_stack(error: Option<&Value>) -> Option<String> {
    error?
        .get("stack")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Walk the suite chain from the innermost node to the root and return the
/// names outer-to-inner. Nameless nodes are skipped but still walked.
pub fn collect_suite_path(task: &TaskLike) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = task.enclosing();
    while let Some(node) = current {
        if let Some(name) = node.name.as_deref().filter(|n| !n.is_empty()) {
            names.push(name.to_string());
        }
        current = node.enclosing();
    }
    names.reverse();
    names
}

/// `suite1 > suite2 > test`, or just the test name without a suite path.
pub fn build_full_title(suite_path: Option<&[String]>, test_name: &str) -> String {
    match suite_path {
        Some(path) if !path.is_empty() => {
            format!("{}{}{}", path.join(TITLE_SEPARATOR), TITLE_SEPARATOR, test_name)
        }
        _ => test_name.to_string(),
    }
}

/// Coerce raw log entries to strings: strings pass through, objects with a
/// `message` or `text` field use that field, anything else is stringified.
pub fn extract_logs(entries: &[Value]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| match entry {
            Value::String(s) => s.clone(),
            Value::Object(fields) => fields
                .get("message")
                .filter(|v| !v.is_null())
                .or_else(|| fields.get("text").filter(|v| !v.is_null()))
                .map(value_to_string)
                .unwrap_or_else(|| entry.to_string()),
            other => other.to_string(),
        })
        .collect()
}
