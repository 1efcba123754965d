//! Collaborators that perform the actual work behind transforming and
//! sending stages.
//!
//! The registry only wires configuration into these interfaces; codecs,
//! ciphers and transport clients are supplied by the embedding service through
//! a [`StageInitCtx`]. A stage whose collaborator is not supplied fails to
//! build.

use std::fmt;
use std::sync::Arc;

use event_types::{Addressable, Event};

use crate::error::StageError;

/// Sends a request body to an HTTP endpoint and returns the response body.
pub trait HttpClient: Send + Sync {
    fn post(&self, url: &str, mime_type: &str, body: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Storage service for device events.
pub trait CoreDataClient: Send + Sync {
    /// Flag the stored event `event_id` as pushed upstream.
    fn mark_pushed(&self, event_id: &str) -> anyhow::Result<()>;

    /// Store `event`, returning it as stored (with its assigned id).
    fn push_event(&self, event: &Event) -> anyhow::Result<Event>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    Gzip,
    Zlib,
}

pub trait Compressor: Send + Sync {
    fn compress(&self, algorithm: CompressionAlgorithm, data: &[u8]) -> anyhow::Result<Vec<u8>>;
}

pub trait Encryptor: Send + Sync {
    fn encrypt_aes(&self, key: &str, init_vector: &str, data: &[u8]) -> anyhow::Result<Vec<u8>>;
}

pub trait XmlEncoder: Send + Sync {
    fn event_to_xml(&self, event: &Event) -> anyhow::Result<String>;
}

/// TLS client certificate and key files for a broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCertPair {
    pub cert_file: String,
    pub key_file: String,
}

/// Everything needed to open a broker connection for one mqtt-send stage.
#[derive(Debug, Clone, PartialEq)]
pub struct MqttSenderOptions {
    pub addressable: Addressable,
    pub qos: u8,
    pub retain: bool,
    pub auto_reconnect: bool,
    pub key_cert_pair: Option<KeyCertPair>,
}

/// Opens broker connections. Called lazily, on a stage's first send.
pub trait MqttConnector: Send + Sync {
    fn connect(&self, options: &MqttSenderOptions) -> anyhow::Result<Box<dyn MqttClient>>;
}

/// An open broker connection, owned by a single stage.
pub trait MqttClient: Send {
    fn publish(&mut self, topic: &str, qos: u8, retain: bool, payload: &[u8]) -> anyhow::Result<()>;
}

/// Collaborators made available to stage factories.
#[derive(Clone, Default)]
pub struct StageInitCtx {
    http: Option<Arc<dyn HttpClient>>,
    mqtt: Option<Arc<dyn MqttConnector>>,
    core_data: Option<Arc<dyn CoreDataClient>>,
    compressor: Option<Arc<dyn Compressor>>,
    encryptor: Option<Arc<dyn Encryptor>>,
    xml: Option<Arc<dyn XmlEncoder>>,
}

impl StageInitCtx {
    /// A context without any collaborators.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http = Some(client);
        self
    }

    pub fn with_mqtt(mut self, connector: Arc<dyn MqttConnector>) -> Self {
        self.mqtt = Some(connector);
        self
    }

    pub fn with_core_data(mut self, client: Arc<dyn CoreDataClient>) -> Self {
        self.core_data = Some(client);
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn with_encryptor(mut self, encryptor: Arc<dyn Encryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    pub fn with_xml(mut self, encoder: Arc<dyn XmlEncoder>) -> Self {
        self.xml = Some(encoder);
        self
    }

    pub fn http(&self, stage: &str) -> Result<Arc<dyn HttpClient>, StageError> {
        require(&self.http, stage, "an HTTP client")
    }

    pub fn mqtt(&self, stage: &str) -> Result<Arc<dyn MqttConnector>, StageError> {
        require(&self.mqtt, stage, "an MQTT connector")
    }

    pub fn core_data(&self, stage: &str) -> Result<Arc<dyn CoreDataClient>, StageError> {
        require(&self.core_data, stage, "a core data client")
    }

    pub fn compressor(&self, stage: &str) -> Result<Arc<dyn Compressor>, StageError> {
        require(&self.compressor, stage, "a compressor")
    }

    pub fn encryptor(&self, stage: &str) -> Result<Arc<dyn Encryptor>, StageError> {
        require(&self.encryptor, stage, "an encryptor")
    }

    pub fn xml(&self, stage: &str) -> Result<Arc<dyn XmlEncoder>, StageError> {
        require(&self.xml, stage, "an XML encoder")
    }
}

fn require<T: ?Sized>(
    slot: &Option<Arc<T>>,
    stage: &str,
    what: &'static str,
) -> Result<Arc<T>, StageError> {
    slot.clone().ok_or_else(|| StageError::MissingContext {
        stage: stage.to_string(),
        what,
    })
}

impl fmt::Debug for StageInitCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageInitCtx")
            .field("http", &self.http.is_some())
            .field("mqtt", &self.mqtt.is_some())
            .field("core_data", &self.core_data.is_some())
            .field("compressor", &self.compressor.is_some())
            .field("encryptor", &self.encryptor.is_some())
            .field("xml", &self.xml.is_some())
            .finish()
    }
}
