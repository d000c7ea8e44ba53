//! Transport that logs instead of sending.
//!
//! `send` never fails: a malformed envelope degrades to a single diagnostic
//! line and the call still acknowledges. `flush` always reports success.

use super::{Transport, TransportAck, TransportError};
use crate::envelope::Envelope;
use crate::event::Level;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SEND_NOTICE: &str = "[failcast] dry-run transport - would send:";
const FLUSH_NOTICE: &str = "[failcast] dry-run transport - would flush";
const FAILURE_NOTICE: &str = "[failcast] dry-run transport failed to log envelope";

/// Destination for dry-run output lines.
pub trait LogSink: Send + Sync {
    fn line(&self, text: &str);
}

/// Writes each line as a `warn!` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn line(&self, text: &str) {
        tracing::warn!(target: "failcast::dry_run", "{}", text);
    }
}

/// Collects lines in memory (testing only).
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl LogSink for MemorySink {
    fn line(&self, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(text.to_string());
    }
}

/// Why an envelope could not be rendered.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("envelope is not a [header, items] array")]
    NotAnArray,

    #[error("envelope has no item list")]
    MissingItems,

    #[error("envelope item is not a [header, payload] pair")]
    MalformedItem,

    #[error("tags could not be rendered: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct DryRunTransport {
    sink: Arc<dyn LogSink>,
}

impl Default for DryRunTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunTransport {
    /// Log through `tracing`.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Log an envelope given in its JSON form. Accepts anything.
    pub fn send_value(&self, envelope: &Value) -> TransportAck {
        match render_envelope(envelope) {
            Ok(text) => {
                self.sink.line(SEND_NOTICE);
                self.sink.line(&text);
            }
            Err(e) => {
                self.sink.line(&format!("{}: {}", FAILURE_NOTICE, e));
            }
        }
        TransportAck::default()
    }

    /// Log the flush notice.
    pub fn flush_now(&self) -> bool {
        self.sink.line(FLUSH_NOTICE);
        true
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    async fn send(&self, envelope: &Envelope) -> Result<TransportAck, TransportError> {
        match envelope.to_value() {
            Ok(value) => Ok(self.send_value(&value)),
            Err(e) => {
                self.sink.line(&format!("{}: {}", FAILURE_NOTICE, e));
                Ok(TransportAck::default())
            }
        }
    }

    async fn flush(&self, _timeout: Duration) -> bool {
        self.flush_now()
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

/// Human-readable summary of the first item of an envelope.
///
/// Event items render as a block (glyph + message, test file, pretty tags);
/// any other item type renders as a one-line fallback. An envelope without
/// items renders as an empty string.
pub fn render_envelope(envelope: &Value) -> Result<String, RenderError> {
    let items = envelope
        .as_array()
        .ok_or(RenderError::NotAnArray)?
        .get(1)
        .and_then(Value::as_array)
        .ok_or(RenderError::MissingItems)?;

    let Some(item) = items.first() else {
        return Ok(String::new());
    };
    let pair = item
        .as_array()
        .filter(|pair| pair.len() == 2)
        .ok_or(RenderError::MalformedItem)?;
    let (header, payload) = (&pair[0], &pair[1]);

    let item_type = header.get("type").and_then(Value::as_str).unwrap_or("unknown");
    if item_type != "event" {
        return Ok(format!("{} {} {}", SEND_NOTICE, item_type, payload));
    }

    let glyph = payload
        .get("level")
        .and_then(|level| serde_json::from_value::<Level>(level.clone()).ok())
        .map(|level| level.glyph())
        .unwrap_or("❓");
    let message = payload.get("message").and_then(Value::as_str).unwrap_or("");
    let tags = payload.get("tags").cloned().unwrap_or(Value::Null);
    let test_file = tags
        .get("test_file")
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    Ok([
        format!("Event[{}]: '{}'", glyph, message),
        format!("- test_file: '{}'", test_file),
        format!("- tags: '{}'", serde_json::to_string_pretty(&tags)?),
    ]
    .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_event_block() {
        let envelope = json!([
            { "dsn": "http://dry-run@localhost/0" },
            [[{ "type": "event" }, {
                "message": "hello",
                "level": "warning",
                "tags": { "test_file": "/tests/a.test.ts" }
            }]]
        ]);
        let text = render_envelope(&envelope).expect("render");

        assert!(text.starts_with("Event[⚠️]: 'hello'"));
        assert!(text.contains("- test_file: '/tests/a.test.ts'"));
        assert!(text.contains("\"test_file\": \"/tests/a.test.ts\""));
    }

    #[test]
    fn test_render_non_event_fallback() {
        let envelope = json!([{}, [[{ "type": "session" }, { "sid": "1" }]]]);
        let text = render_envelope(&envelope).expect("render");
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("session"));
    }

    #[test]
    fn test_render_unknown_level_and_empty_items() {
        let envelope = json!([{}, [[{ "type": "event" }, { "message": "m" }]]]);
        assert!(render_envelope(&envelope).expect("render").starts_with("Event[❓]"));

        let empty = json!([{}, []]);
        assert_eq!(render_envelope(&empty).expect("render"), "");
    }

    #[test]
    fn test_render_rejects_malformed() {
        assert!(matches!(render_envelope(&json!({})), Err(RenderError::NotAnArray)));
        assert!(matches!(render_envelope(&json!([{}])), Err(RenderError::MissingItems)));
        assert!(matches!(
            render_envelope(&json!([{}, [["only-one"]]])),
            Err(RenderError::MalformedItem)
        ));
    }
}
