//! Envelopes: the unit handed to a transport.
//!
//! As JSON an envelope is `[header, [[item_header, payload], ...]]`; on the
//! wire it is newline-delimited: the header, then each item header followed
//! by its payload.

use crate::event::Event;
use chrono::{DateTime, Utc};
use serde::ser::{Serialize, Serializer};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

/// Routing information for a whole envelope.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct EnvelopeHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Header of a single item.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct ItemHeader {
    #[serde(rename = "type")]
    pub ty: String,
}

impl ItemHeader {
    pub fn event() -> Self {
        Self {
            ty: "event".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub header: EnvelopeHeader,
    pub items: Vec<(ItemHeader, Value)>,
}

impl Envelope {
    /// Wrap a single event.
    pub fn from_event(event: &Event, dsn: Option<&str>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            header: EnvelopeHeader {
                event_id: Some(event.event_id),
                dsn: dsn.map(str::to_string),
                sent_at: Utc::now(),
            },
            items: vec![(ItemHeader::event(), serde_json::to_value(event)?)],
        })
    }

    pub fn event_id(&self) -> Option<Uuid> {
        self.header.event_id
    }

    /// Payloads of all `event` items.
    pub fn event_payloads(&self) -> impl Iterator<Item = &Value> {
        self.items
            .iter()
            .filter(|(header, _)| header.ty == "event")
            .map(|(_, payload)| payload)
    }

    /// The `[header, items]` JSON form.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Newline-delimited wire form.
    pub fn to_wire(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut out = serde_json::to_vec(&self.header)?;
        out.push(b'\n');
        for (header, payload) in &self.items {
            serde_json::to_writer(&mut out, header)?;
            out.push(b'\n');
            serde_json::to_writer(&mut out, payload)?;
            out.push(b'\n');
        }
        Ok(out)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.header, &self.items).serialize(serializer)
    }
}
