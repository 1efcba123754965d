//! Data types for pipeline communication
//!
//! A [`Payload`] is what flows from one stage to the next. The first stage
//! receives the triggering [`Event`]; later stages receive whatever the
//! previous stage produced.

use event_types::Event;

use crate::error::StageError;

/// Pipeline data that can flow between stages
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A device event, typically the one that triggered the pipeline
    Event(Event),
    /// Opaque bytes (compressed, encrypted or a transport response)
    Bytes(Vec<u8>),
    /// Text such as a marshaled document
    Text(String),
    /// Arbitrary JSON
    Json(serde_json::Value),
}

impl Payload {
    /// Get a human-readable description of the data type
    pub fn data_type(&self) -> &'static str {
        match self {
            Payload::Event(_) => "Event",
            Payload::Bytes(_) => "Bytes",
            Payload::Text(_) => "Text",
            Payload::Json(_) => "Json",
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Payload::Event(event) => Some(event),
            _ => None,
        }
    }

    /// Coerce into bytes. Text is taken as UTF-8, events and JSON are
    /// serialized as JSON.
    pub fn into_bytes(self) -> Result<Vec<u8>, StageError> {
        match self {
            Payload::Bytes(bytes) => Ok(bytes),
            Payload::Text(text) => Ok(text.into_bytes()),
            Payload::Event(event) => Ok(serde_json::to_vec(&event)?),
            Payload::Json(value) => Ok(serde_json::to_vec(&value)?),
        }
    }
}

impl From<Event> for Payload {
    fn from(event: Event) -> Self {
        Payload::Event(event)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}
