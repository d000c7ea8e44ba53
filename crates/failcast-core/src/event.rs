//! Outbound event model.

use crate::domain::{value_to_string, FailureContext};
use crate::tags::Tags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Event severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
    Log,
}

impl Level {
    /// Glyph used by the dry-run transport.
    pub fn glyph(&self) -> &'static str {
        match self {
            Level::Debug => "🐛",
            Level::Info => "ℹ️",
            Level::Warning => "⚠️",
            Level::Error | Level::Fatal => "🚨",
            Level::Log => "💬",
        }
    }
}

/// User associated with an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// The error object reported for a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedError {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl CapturedError {
    /// Derive the error from a failure.
    ///
    /// An error payload that carries its own stack keeps it. A synthesized
    /// error gets no stack at all: one captured here would point into the
    /// reporter instead of the test. An explicit `name` on the payload
    /// overrides the default `Error`.
    pub fn from_failure(ctx: &FailureContext) -> Self {
        let message = ctx
            .message
            .clone()
            .or_else(|| ctx.full_title.clone())
            .unwrap_or_else(|| ctx.test_name.clone());

        let name = ctx
            .error
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|fields| fields.get("name"))
            .filter(|v| !v.is_null())
            .map(value_to_string)
            .unwrap_or_else(|| "Error".to_string());

        Self {
            name,
            message,
            stack: ctx.stack.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    #[serde(rename = "type")]
    pub ty: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionList {
    pub values: Vec<ExceptionRecord>,
}

/// One error event as handed to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: Option<String>,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    pub tags: Tags,
    pub extra: Map<String, Value>,
    pub contexts: Map<String, Value>,
    pub fingerprint: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub exception: ExceptionList,
}

impl Event {
    /// A fresh `error`-level event for `error`.
    pub fn from_error(error: &CapturedError) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level: Level::Error,
            message: Some(error.message.clone()),
            platform: "other".to_string(),
            environment: None,
            release: None,
            dist: None,
            server_name: None,
            tags: Tags::new(),
            extra: Map::new(),
            contexts: Map::new(),
            fingerprint: Vec::new(),
            user: None,
            exception: ExceptionList {
                values: vec![ExceptionRecord {
                    ty: error.name.clone(),
                    value: error.message.clone(),
                    stack: error.stack.clone(),
                }],
            },
        }
    }

    /// The single exception this event carries.
    pub fn error_record(&self) -> Option<&ExceptionRecord> {
        self.exception.values.first()
    }
}
