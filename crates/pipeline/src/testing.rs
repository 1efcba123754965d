//! Collaborator doubles and log capture shared by the unit tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use event_types::Event;
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use crate::collab::{
    CompressionAlgorithm, Compressor, CoreDataClient, Encryptor, HttpClient, MqttClient,
    MqttConnector, MqttSenderOptions, XmlEncoder,
};

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub mime_type: String,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct RecordingHttp {
    response: Vec<u8>,
    fail: bool,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingHttp {
    pub fn responding(response: &[u8]) -> Self {
        Self {
            response: response.to_vec(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpClient for RecordingHttp {
    fn post(&self, url: &str, mime_type: &str, body: &[u8]) -> anyhow::Result<Vec<u8>> {
        self.requests.lock().unwrap().push(HttpRequest {
            url: url.to_string(),
            mime_type: mime_type.to_string(),
            body: body.to_vec(),
        });
        if self.fail {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.response.clone())
    }
}

#[derive(Default)]
pub struct RecordingCoreData {
    marked: Mutex<Vec<String>>,
    pushed: Mutex<Vec<Event>>,
}

impl RecordingCoreData {
    pub fn marked(&self) -> Vec<String> {
        self.marked.lock().unwrap().clone()
    }

    pub fn pushed(&self) -> Vec<Event> {
        self.pushed.lock().unwrap().clone()
    }
}

impl CoreDataClient for RecordingCoreData {
    fn mark_pushed(&self, event_id: &str) -> anyhow::Result<()> {
        self.marked.lock().unwrap().push(event_id.to_string());
        Ok(())
    }

    fn push_event(&self, event: &Event) -> anyhow::Result<Event> {
        let mut pushed = self.pushed.lock().unwrap();
        let stored = event.clone().with_id(format!("stored-{}", pushed.len() + 1));
        pushed.push(stored.clone());
        Ok(stored)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub qos: u8,
    pub retain: bool,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct MqttState {
    connects: Vec<MqttSenderOptions>,
    published: Vec<Published>,
}

/// Connector and client in one; clones share their recordings.
#[derive(Clone, Default)]
pub struct RecordingMqtt {
    fail_publish: bool,
    state: Arc<Mutex<MqttState>>,
}

impl RecordingMqtt {
    pub fn failing_publish() -> Self {
        Self {
            fail_publish: true,
            ..Self::default()
        }
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects.len()
    }

    pub fn last_options(&self) -> Option<MqttSenderOptions> {
        self.state.lock().unwrap().connects.last().cloned()
    }

    pub fn published(&self) -> Vec<Published> {
        self.state.lock().unwrap().published.clone()
    }
}

impl MqttConnector for RecordingMqtt {
    fn connect(&self, options: &MqttSenderOptions) -> anyhow::Result<Box<dyn MqttClient>> {
        self.state.lock().unwrap().connects.push(options.clone());
        Ok(Box::new(self.clone()))
    }
}

impl MqttClient for RecordingMqtt {
    fn publish(&mut self, topic: &str, qos: u8, retain: bool, payload: &[u8]) -> anyhow::Result<()> {
        if self.fail_publish {
            return Err(anyhow!("broker unavailable"));
        }
        self.state.lock().unwrap().published.push(Published {
            topic: topic.to_string(),
            qos,
            retain,
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

/// Prefixes the algorithm name to the reversed input.
pub struct ReverseCompressor;

impl Compressor for ReverseCompressor {
    fn compress(&self, algorithm: CompressionAlgorithm, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let name = match algorithm {
            CompressionAlgorithm::Gzip => "gzip",
            CompressionAlgorithm::Zlib => "zlib",
        };
        let mut out = format!("{name}:").into_bytes();
        out.extend(data.iter().rev());
        Ok(out)
    }
}

/// Xors every byte with the first bytes of key and iv.
pub struct XorEncryptor;

impl Encryptor for XorEncryptor {
    fn encrypt_aes(&self, key: &str, init_vector: &str, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let (Some(k), Some(iv)) = (key.bytes().next(), init_vector.bytes().next()) else {
            return Err(anyhow!("empty key material"));
        };
        Ok(data.iter().map(|b| b ^ k ^ iv).collect())
    }
}

pub struct TagXml;

impl XmlEncoder for TagXml {
    fn event_to_xml(&self, event: &Event) -> anyhow::Result<String> {
        Ok(format!("<Event device=\"{}\"/>", event.device))
    }
}

/// One recorded log event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().to_string(), format!("{:?}", value));
    }
}

struct CaptureLayer(Arc<Mutex<Vec<CapturedEvent>>>);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        self.0.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }
}

/// Run `f` with a subscriber that records every event emitted on this thread.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedEvent>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(events.clone()));
    let result = tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    (result, captured)
}

/// Only the error-level events of a capture.
pub fn errors(events: &[CapturedEvent]) -> Vec<&CapturedEvent> {
    events.iter().filter(|e| e.level == Level::ERROR).collect()
}
