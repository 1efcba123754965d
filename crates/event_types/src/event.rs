//! Device events and their readings

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// An event reported by a device, carrying one or more readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Identifier assigned by storage, if the event has been persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name of the device that produced the event
    pub device: String,
    /// Origin timestamp in nanoseconds since the Unix epoch
    #[serde(default)]
    pub origin: i64,
    /// Whether the event has been marked as pushed upstream
    #[serde(default)]
    pub pushed: bool,
    /// Readings carried by this event
    #[serde(default)]
    pub readings: Vec<Reading>,
}

/// A single named value within an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name of the device that produced the reading
    pub device: String,
    /// Value descriptor name, e.g. "temperature"
    pub name: String,
    /// Reading value in its textual form
    pub value: String,
    #[serde(default)]
    pub origin: i64,
}

impl Event {
    /// Create a new event for `device`, stamped with the current time.
    pub fn new(device: impl Into<String>, readings: Vec<Reading>) -> Self {
        Self {
            id: None,
            device: device.into(),
            origin: now_nanos(),
            pushed: false,
            readings,
        }
    }

    /// Builder-style id assignment
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Names of all readings in this event, in order.
    pub fn reading_names(&self) -> impl Iterator<Item = &str> {
        self.readings.iter().map(|r| r.name.as_str())
    }
}

impl Reading {
    /// Create a new reading stamped with the current time.
    pub fn new(device: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            device: device.into(),
            name: name.into(),
            value: value.into(),
            origin: now_nanos(),
        }
    }
}

fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
