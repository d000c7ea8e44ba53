//! Task and result shapes as delivered by the host test runner.
//!
//! Every field is optional: hosts differ in what they send, and a missing or
//! ill-typed field must degrade to an absent value rather than a decode
//! error. Error and log entries stay as raw JSON because hosts send strings,
//! error-like objects and scalars interchangeably.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field decoders that never fail on a well-formed JSON value.
mod lenient {
    use serde::de::{DeserializeOwned, Deserializer};
    use serde::Deserialize;
    use serde_json::Value;

    /// A value of the wrong shape decodes as `None`.
    pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(serde_json::from_value(value).ok())
    }

    /// Scalars are stringified; null and containers decode as `None`.
    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        })
    }

    /// Truthiness of any non-null value: `false`, zero and `""` are false.
    pub fn truthy<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            Value::Bool(b) => Some(b),
            Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan())),
            Value::String(s) => Some(!s.is_empty()),
            Value::Array(_) | Value::Object(_) => Some(true),
        })
    }

    /// Array entries that do not decode are dropped; a non-array is empty.
    pub fn entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}

/// Task identifier; hosts send either strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Text(s) => f.write_str(s),
            TaskId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId::Text(s.to_string())
    }
}

/// Task lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Fail,
    Pass,
    Skip,
    Todo,
    Only,
    Run,
    OnlyFail,
    /// Any state this crate does not know about.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRef {
    #[serde(deserialize_with = "lenient::text")]
    pub filepath: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    #[serde(deserialize_with = "lenient::text")]
    pub file: Option<String>,
}

/// One node of a suite chain. Either link may point to the enclosing suite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteNode {
    #[serde(deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::optional")]
    pub suite: Option<Box<SuiteNode>>,
    #[serde(deserialize_with = "lenient::optional")]
    pub parent: Option<Box<SuiteNode>>,
}

impl SuiteNode {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Builder-style: attach the enclosing suite.
    pub fn within(mut self, parent: SuiteNode) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// The enclosing node, `suite` taking precedence over `parent`.
    pub fn enclosing(&self) -> Option<&SuiteNode> {
        self.suite.as_deref().or(self.parent.as_deref())
    }
}

/// Free-form task metadata; only `flaky` is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskMeta {
    #[serde(deserialize_with = "lenient::truthy")]
    pub flaky: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of one task execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskResult {
    #[serde(deserialize_with = "lenient::optional")]
    pub state: Option<TaskState>,
    #[serde(deserialize_with = "lenient::optional")]
    pub duration: Option<f64>,
    #[serde(deserialize_with = "lenient::optional")]
    pub retry: Option<u32>,
    #[serde(deserialize_with = "lenient::truthy")]
    pub flaky: Option<bool>,
    #[serde(deserialize_with = "lenient::optional")]
    pub errors: Option<Vec<Value>>,
    #[serde(deserialize_with = "lenient::optional")]
    pub logs: Option<Vec<Value>>,
}

/// A test task as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskLike {
    #[serde(deserialize_with = "lenient::optional")]
    pub id: Option<TaskId>,
    #[serde(deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub full_name: Option<String>,
    /// Explicit outer-to-inner suite names; wins over the suite chain.
    #[serde(deserialize_with = "lenient::optional")]
    pub suite_path: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient::optional")]
    pub suite: Option<Box<SuiteNode>>,
    #[serde(deserialize_with = "lenient::optional")]
    pub parent: Option<Box<SuiteNode>>,
    #[serde(deserialize_with = "lenient::optional")]
    pub file: Option<FileRef>,
    #[serde(deserialize_with = "lenient::optional")]
    pub location: Option<Location>,
    #[serde(deserialize_with = "lenient::optional")]
    pub result: Option<TaskResult>,
    #[serde(deserialize_with = "lenient::optional")]
    pub errors: Option<Vec<Value>>,
    #[serde(deserialize_with = "lenient::optional")]
    pub duration: Option<f64>,
    #[serde(deserialize_with = "lenient::optional")]
    pub retry: Option<u32>,
    #[serde(deserialize_with = "lenient::optional")]
    pub meta: Option<TaskMeta>,
    #[serde(deserialize_with = "lenient::optional")]
    pub logs: Option<Vec<Value>>,
    #[serde(deserialize_with = "lenient::optional")]
    pub state: Option<TaskState>,
}

impl TaskLike {
    /// Effective state: the result's state wins over the task's own field.
    pub fn resolved_state<'a>(&'a self, result: Option<&'a TaskResult>) -> Option<&'a TaskState> {
        result
            .and_then(|r| r.state.as_ref())
            .or(self.state.as_ref())
    }

    /// Whether the task counts as failed: resolved state is exactly `fail`.
    pub fn is_failed(&self, result: Option<&TaskResult>) -> bool {
        matches!(self.resolved_state(result), Some(TaskState::Fail))
    }

    /// Dedup key: id, else name, else a random value.
    ///
    /// Tasks with neither id nor name never deduplicate against each other.
    pub fn identity(&self) -> String {
        self.id
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    /// The enclosing suite node, `suite` taking precedence over `parent`.
    pub fn enclosing(&self) -> Option<&SuiteNode> {
        self.suite.as_deref().or(self.parent.as_deref())
    }
}

/// One entry of a task-update batch: `[task, result?]` or `{task, result?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskUpdatePack {
    Pair(
        TaskLike,
        #[serde(deserialize_with = "lenient::optional")] Option<TaskResult>,
    ),
    Single([TaskLike; 1]),
    Object {
        task: TaskLike,
        #[serde(default, deserialize_with = "lenient::optional")]
        result: Option<TaskResult>,
    },
}

impl TaskUpdatePack {
    pub fn new(task: TaskLike, result: Option<TaskResult>) -> Self {
        TaskUpdatePack::Object { task, result }
    }

    pub fn parts(&self) -> (&TaskLike, Option<&TaskResult>) {
        match self {
            TaskUpdatePack::Pair(task, result) => (task, result.as_ref()),
            TaskUpdatePack::Single([task]) => (task, None),
            TaskUpdatePack::Object { task, result } => (task, result.as_ref()),
        }
    }
}

/// A test file as handed over at run end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestModule {
    #[serde(deserialize_with = "lenient::entries")]
    pub tasks: Vec<TaskLike>,
}
