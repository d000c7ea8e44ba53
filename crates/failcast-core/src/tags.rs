//! Tag, extra and fingerprint synthesis.
//!
//! Tags are the indexed, primitive-only part of an event; extras and the
//! `test` context carry the unstructured diagnostics. Merge order for tags is
//! static, then dynamic, then base, so automatically derived facts always win over
//! consumer-supplied values for the same key.

use crate::domain::FailureContext;
use crate::{REPORTER_NAME, VERSION};
use failcast_ci::CiContext;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Leading element of the default fingerprint.
pub const DEFAULT_FINGERPRINT_TAG: &str = "test-failure";

/// Arbitrary key/value input, before cleaning.
pub type RawTags = Map<String, Value>;

/// Cleaned, tag-safe key/value map.
pub type Tags = BTreeMap<String, TagValue>;

/// A tag-safe primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(b) => write!(f, "{}", b),
            TagValue::Int(i) => write!(f, "{}", i),
            TagValue::Float(x) => write!(f, "{}", x),
            TagValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::Str(s.to_string())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        TagValue::Str(s)
    }
}

impl From<bool> for TagValue {
    fn from(b: bool) -> Self {
        TagValue::Bool(b)
    }
}

impl From<i64> for TagValue {
    fn from(i: i64) -> Self {
        TagValue::Int(i)
    }
}

/// Reduce arbitrary values to tag-safe primitives.
///
/// Null entries are dropped, objects and arrays are serialized to JSON text,
/// every other value passes through (including `false`, `0` and `""`).
pub fn clean_record(record: &RawTags) -> Tags {
    record
        .iter()
        .filter_map(|(key, value)| {
            let cleaned = match value {
                Value::Null => return None,
                Value::Bool(b) => TagValue::Bool(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => TagValue::Int(i),
                    None => TagValue::Float(n.as_f64().unwrap_or_default()),
                },
                Value::String(s) => TagValue::Str(s.clone()),
                Value::Array(_) | Value::Object(_) => TagValue::Str(value.to_string()),
            };
            Some((key.clone(), cleaned))
        })
        .collect()
}

/// Merge static, dynamic and base tags; later layers win.
pub fn merge_tags(static_tags: &RawTags, dynamic_tags: Option<&RawTags>, base: &RawTags) -> Tags {
    let mut merged = clean_record(static_tags);
    if let Some(dynamic) = dynamic_tags {
        merged.extend(clean_record(dynamic));
    }
    merged.extend(clean_record(base));
    merged
}

/// Tags derived from the failure and the CI context.
///
/// Repository, branch and commit are null when unknown and disappear in
/// [`clean_record`].
pub fn base_tags(ctx: &FailureContext, ci: &CiContext) -> RawTags {
    let mut tags = RawTags::new();
    tags.insert("reporter".into(), json!(REPORTER_NAME));
    tags.insert(
        "test_file".into(),
        json!(ctx.file_path.as_deref().unwrap_or("unknown")),
    );
    tags.insert("test_name".into(), json!(ctx.test_name));
    tags.insert(
        "test_full_title".into(),
        json!(ctx.full_title.as_deref().unwrap_or(&ctx.test_name)),
    );
    tags.insert(
        "flaky".into(),
        json!(ctx.flaky.unwrap_or(false).to_string()),
    );
    tags.insert("retry".into(), json!(ctx.retry.unwrap_or(0)));
    tags.insert("os_platform".into(), json!(std::env::consts::OS));
    tags.insert("os_arch".into(), json!(std::env::consts::ARCH));
    tags.insert("reporter_version".into(), json!(VERSION));
    tags.insert("ci".into(), json!(ci.provider_name().unwrap_or("local")));
    tags.insert("repository".into(), json!(ci.repository));
    tags.insert("branch".into(), json!(ci.branch));
    tags.insert("commit_sha".into(), json!(ci.commit_sha));
    tags
}

/// Unindexed diagnostics attached to the event.
pub fn extras(ctx: &FailureContext, ci: &CiContext, framework_version: Option<&str>) -> Map<String, Value> {
    let mut extra = Map::new();
    if let Some(duration) = ctx.duration_ms {
        extra.insert("duration_ms".into(), json!(duration));
    }
    if let Some(logs) = &ctx.logs {
        extra.insert("logs".into(), json!(logs));
    }
    if let Some(path) = &ctx.suite_path {
        extra.insert("suite_path".into(), json!(path));
    }
    if let Some(version) = framework_version {
        extra.insert("framework_version".into(), json!(version));
    }
    extra.insert("env".into(), json!(ci.env));
    extra
}

/// The structured `test` context block.
pub fn test_context(ctx: &FailureContext) -> Value {
    json!({
        "file": ctx.file_path,
        "name": ctx.test_name,
        "fullTitle": ctx.full_title,
        "durationMs": ctx.duration_ms,
        "retry": ctx.retry,
        "flaky": ctx.flaky,
    })
}

/// Grouping key: the caller's override, else `[tag, file, test name]`.
pub fn fingerprint(ctx: &FailureContext, custom: Option<Vec<String>>) -> Vec<String> {
    custom.unwrap_or_else(|| {
        vec![
            DEFAULT_FINGERPRINT_TAG.to_string(),
            ctx.file_path
                .clone()
                .unwrap_or_else(|| "unknown-file".to_string()),
            ctx.test_name.clone(),
        ]
    })
}
