//! Dry-run collaborators that log what they would send instead of sending it.

use std::sync::atomic::{AtomicU64, Ordering};

use event_types::Event;
use pipeline::collab::{CoreDataClient, HttpClient, MqttClient, MqttConnector, MqttSenderOptions};
use tracing::info;

/// Accepts every post and answers with an empty body.
#[derive(Debug, Default)]
pub struct LoggingHttp;

impl HttpClient for LoggingHttp {
    fn post(&self, url: &str, mime_type: &str, body: &[u8]) -> anyhow::Result<Vec<u8>> {
        info!(url, mimetype = mime_type, bytes = body.len(), "HTTP post");
        Ok(Vec::new())
    }
}

#[derive(Debug, Default)]
pub struct LoggingMqtt;

impl MqttConnector for LoggingMqtt {
    fn connect(&self, options: &MqttSenderOptions) -> anyhow::Result<Box<dyn MqttClient>> {
        info!(
            broker = %options.addressable.base_url(),
            tls = options.key_cert_pair.is_some(),
            "MQTT connect"
        );
        Ok(Box::new(LoggingMqttClient))
    }
}

struct LoggingMqttClient;

impl MqttClient for LoggingMqttClient {
    fn publish(&mut self, topic: &str, qos: u8, retain: bool, payload: &[u8]) -> anyhow::Result<()> {
        info!(topic, qos, retain, bytes = payload.len(), "MQTT publish");
        Ok(())
    }
}

/// Hands out sequential ids for stored events.
#[derive(Debug, Default)]
pub struct LoggingCoreData {
    next_id: AtomicU64,
}

impl CoreDataClient for LoggingCoreData {
    fn mark_pushed(&self, event_id: &str) -> anyhow::Result<()> {
        info!(event_id, "mark event pushed");
        Ok(())
    }

    fn push_event(&self, event: &Event) -> anyhow::Result<Event> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!(device = %event.device, readings = event.readings.len(), id, "push event");
        Ok(event.clone().with_id(format!("dry-run-{id}")))
    }
}
