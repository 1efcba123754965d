//! MQTT sender stage.

use std::sync::Arc;

use event_types::Addressable;
use tracing::debug;

use crate::collab::{KeyCertPair, MqttClient, MqttConnector, MqttSenderOptions, StageInitCtx};
use crate::data::Payload;
use crate::error::StageError;
use crate::params::{keys, ParamDefault, ParamKind, ParamSpec, ResolvedParams};
use crate::registry::StageFactory;
use crate::stage::{Stage, StageContext};

pub const MQTT_SEND: &str = "mqtt-send";

const MAX_QOS: i64 = 2;

/// Publishes the incoming data to the topic of the configured addressable.
///
/// The broker connection is opened on the first send and reused afterwards.
/// After a failed publish the connection is dropped unless `auto_reconnect` is
/// set, so the next send opens a fresh one.
pub struct MqttSend {
    options: MqttSenderOptions,
    persist_on_error: bool,
    connector: Arc<dyn MqttConnector>,
    client: Option<Box<dyn MqttClient>>,
}

impl MqttSend {
    pub fn options(&self) -> &MqttSenderOptions {
        &self.options
    }

    pub fn persist_on_error(&self) -> bool {
        self.persist_on_error
    }

    fn publish(&mut self, payload: &[u8]) -> anyhow::Result<()> {
        let mut client = match self.client.take() {
            Some(client) => client,
            None => {
                debug!(
                    address = %self.options.addressable.base_url(),
                    "opening MQTT connection"
                );
                self.connector.connect(&self.options)?
            }
        };
        let result = client.publish(
            &self.options.addressable.topic,
            self.options.qos,
            self.options.retain,
            payload,
        );
        if result.is_ok() || self.options.auto_reconnect {
            self.client = Some(client);
        }
        result
    }
}

impl Stage for MqttSend {
    fn id(&self) -> &str {
        MQTT_SEND
    }

    fn process(
        &mut self,
        data: Payload,
        ctx: &mut StageContext,
    ) -> Result<Option<Payload>, StageError> {
        let payload = data.into_bytes()?;
        match self.publish(&payload) {
            Ok(()) => Ok(Some(Payload::Bytes(payload))),
            Err(err) => {
                if self.persist_on_error {
                    ctx.set_retry_data(payload);
                }
                Err(StageError::collaborator(MQTT_SEND, err))
            }
        }
    }
}

#[derive(Default)]
pub struct MqttSendFactory;

impl StageFactory for MqttSendFactory {
    fn stage_type(&self) -> &'static str {
        MQTT_SEND
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[
            ParamSpec::optional(keys::QOS, ParamKind::Integer, ParamDefault::Integer(0)),
            ParamSpec::optional(keys::RETAIN, ParamKind::Bool, ParamDefault::Bool(false)),
            ParamSpec::optional(keys::AUTO_RECONNECT, ParamKind::Bool, ParamDefault::Bool(false)),
            ParamSpec::optional(keys::PERSIST_ON_ERROR, ParamKind::Bool, ParamDefault::Bool(false)),
            ParamSpec::optional(keys::CERT, ParamKind::Raw, ParamDefault::None),
            ParamSpec::optional(keys::KEY, ParamKind::Raw, ParamDefault::None),
        ];
        PARAMS
    }

    fn create(
        &self,
        params: &ResolvedParams,
        addressable: Option<&Addressable>,
        init: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        let addressable = addressable.ok_or_else(|| StageError::MissingContext {
            stage: MQTT_SEND.to_string(),
            what: "an endpoint addressable",
        })?;

        let qos = params.integer(keys::QOS)?;
        if !(0..=MAX_QOS).contains(&qos) {
            return Err(StageError::BadParam {
                stage: MQTT_SEND.to_string(),
                param: keys::QOS.to_string(),
                value: qos.to_string(),
                reason: format!("must be between 0 and {MAX_QOS}"),
            });
        }
        let retain = params.flag(keys::RETAIN)?;
        let auto_reconnect = params.flag(keys::AUTO_RECONNECT)?;
        let persist_on_error = params.flag(keys::PERSIST_ON_ERROR)?;

        let cert = params.opt_text(keys::CERT).unwrap_or_default();
        let key = params.opt_text(keys::KEY).unwrap_or_default();
        let key_cert_pair = if !cert.is_empty() && !key.is_empty() {
            Some(KeyCertPair {
                cert_file: cert.to_string(),
                key_file: key.to_string(),
            })
        } else {
            if !cert.is_empty() || !key.is_empty() {
                debug!("only one of cert and key given, connecting without a client certificate");
            }
            None
        };

        debug!(
            topic = %addressable.topic,
            qos,
            retain,
            auto_reconnect,
            persist_on_error,
            tls = key_cert_pair.is_some(),
            "MQTT sender parameters"
        );

        Ok(Box::new(MqttSend {
            options: MqttSenderOptions {
                addressable: addressable.clone(),
                qos: qos as u8,
                retain,
                auto_reconnect,
                key_cert_pair,
            },
            persist_on_error,
            connector: init.mqtt(MQTT_SEND)?,
            client: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{resolve, StageParams};
    use crate::testing::RecordingMqtt;

    fn addressable() -> Addressable {
        Addressable {
            name: "broker".to_string(),
            protocol: "tcp".to_string(),
            address: "localhost".to_string(),
            port: 1883,
            topic: "events".to_string(),
            ..Default::default()
        }
    }

    fn sender(mqtt: &RecordingMqtt, auto_reconnect: bool, persist_on_error: bool) -> MqttSend {
        MqttSend {
            options: MqttSenderOptions {
                addressable: addressable(),
                qos: 1,
                retain: true,
                auto_reconnect,
                key_cert_pair: None,
            },
            persist_on_error,
            connector: Arc::new(mqtt.clone()),
            client: None,
        }
    }

    fn build(pairs: &[(&str, &str)]) -> Result<Box<dyn Stage>, StageError> {
        let params: StageParams = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let resolved = resolve(MQTT_SEND, MqttSendFactory.params(), &params)?;
        let init = StageInitCtx::new().with_mqtt(Arc::new(RecordingMqtt::default()));
        MqttSendFactory.create(&resolved, Some(&addressable()), &init)
    }

    #[test]
    fn test_connects_once_and_publishes_to_topic() {
        let mqtt = RecordingMqtt::default();
        let mut stage = sender(&mqtt, false, false);
        let mut ctx = StageContext::new();

        let out = stage.process(Payload::Text("a".to_string()), &mut ctx).unwrap();
        stage.process(Payload::Text("b".to_string()), &mut ctx).unwrap();

        assert_eq!(out, Some(Payload::Bytes(b"a".to_vec())));
        assert_eq!(mqtt.connects(), 1);
        let published = mqtt.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].topic, "events");
        assert_eq!(published[0].qos, 1);
        assert!(published[0].retain);
        assert_eq!(published[1].payload, b"b");
    }

    #[test]
    fn test_failed_publish_drops_connection() {
        let mqtt = RecordingMqtt::failing_publish();
        let mut stage = sender(&mqtt, false, true);
        let mut ctx = StageContext::new();

        assert!(stage.process(Payload::Text("a".to_string()), &mut ctx).is_err());
        assert_eq!(ctx.retry_data.as_deref(), Some(&b"a"[..]));
        assert!(stage.process(Payload::Text("b".to_string()), &mut ctx).is_err());
        assert_eq!(mqtt.connects(), 2);
    }

    #[test]
    fn test_auto_reconnect_keeps_connection() {
        let mqtt = RecordingMqtt::failing_publish();
        let mut stage = sender(&mqtt, true, false);
        let mut ctx = StageContext::new();

        assert!(stage.process(Payload::Text("a".to_string()), &mut ctx).is_err());
        assert!(stage.process(Payload::Text("b".to_string()), &mut ctx).is_err());
        assert_eq!(mqtt.connects(), 1);
        assert!(ctx.retry_data.is_none());
    }

    #[test]
    fn test_requires_addressable() {
        let resolved = resolve(MQTT_SEND, MqttSendFactory.params(), &StageParams::new()).unwrap();
        let init = StageInitCtx::new().with_mqtt(Arc::new(RecordingMqtt::default()));
        let err = MqttSendFactory.create(&resolved, None, &init).err().unwrap();
        assert_eq!(err.to_string(), "stage mqtt-send requires an endpoint addressable");
    }

    #[test]
    fn test_qos_out_of_range() {
        let err = build(&[("qos", "3")]).err().unwrap();
        assert!(matches!(err, StageError::BadParam { ref param, .. } if param.as_str() == "qos"));
        assert!(build(&[("qos", "-1")]).is_err());
        assert!(build(&[("qos", "2")]).is_ok());
    }
}
