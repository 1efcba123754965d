//! Stages that talk to the event storage service.

use std::sync::Arc;

use event_types::{Addressable, Event, Reading};
use tracing::debug;

use crate::collab::{CoreDataClient, StageInitCtx};
use crate::data::Payload;
use crate::error::StageError;
use crate::params::{keys, ParamKind, ParamSpec, ResolvedParams};
use crate::registry::StageFactory;
use crate::stage::{Stage, StageContext};

pub const MARK_AS_PUSHED: &str = "mark-as-pushed";
pub const PUSH_TO_STORAGE: &str = "push-to-storage";

/// Marks the event that triggered the pipeline as pushed.
pub struct MarkAsPushed {
    client: Arc<dyn CoreDataClient>,
}

impl Stage for MarkAsPushed {
    fn id(&self) -> &str {
        MARK_AS_PUSHED
    }

    fn process(
        &mut self,
        data: Payload,
        ctx: &mut StageContext,
    ) -> Result<Option<Payload>, StageError> {
        let event_id = ctx
            .event_id
            .as_deref()
            .ok_or_else(|| StageError::NoEventId(MARK_AS_PUSHED.to_string()))?;
        self.client
            .mark_pushed(event_id)
            .map_err(|e| StageError::collaborator(MARK_AS_PUSHED, e))?;
        Ok(Some(data))
    }
}

/// Stores the incoming data as a single reading of a new event.
pub struct PushToStorage {
    device_name: String,
    reading_name: String,
    client: Arc<dyn CoreDataClient>,
}

impl PushToStorage {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn reading_name(&self) -> &str {
        &self.reading_name
    }
}

impl Stage for PushToStorage {
    fn id(&self) -> &str {
        PUSH_TO_STORAGE
    }

    fn process(
        &mut self,
        data: Payload,
        _ctx: &mut StageContext,
    ) -> Result<Option<Payload>, StageError> {
        let bytes = data.into_bytes()?;
        let value = String::from_utf8_lossy(&bytes);
        let event = Event::new(
            self.device_name.clone(),
            vec![Reading::new(&self.device_name, &self.reading_name, value)],
        );
        let stored = self
            .client
            .push_event(&event)
            .map_err(|e| StageError::collaborator(PUSH_TO_STORAGE, e))?;
        Ok(Some(Payload::Event(stored)))
    }
}

#[derive(Default)]
pub struct MarkAsPushedFactory;

impl StageFactory for MarkAsPushedFactory {
    fn stage_type(&self) -> &'static str {
        MARK_AS_PUSHED
    }

    fn create(
        &self,
        _: &ResolvedParams,
        _: Option<&Addressable>,
        init: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        Ok(Box::new(MarkAsPushed {
            client: init.core_data(MARK_AS_PUSHED)?,
        }))
    }
}

#[derive(Default)]
pub struct PushToStorageFactory;

impl StageFactory for PushToStorageFactory {
    fn stage_type(&self) -> &'static str {
        PUSH_TO_STORAGE
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[
            ParamSpec::required(keys::DEVICE_NAME, ParamKind::Identifier),
            ParamSpec::required(keys::READING_NAME, ParamKind::Identifier),
        ];
        PARAMS
    }

    fn create(
        &self,
        params: &ResolvedParams,
        _: Option<&Addressable>,
        init: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        let device_name = params.text(keys::DEVICE_NAME)?.to_string();
        let reading_name = params.text(keys::READING_NAME)?.to_string();
        debug!(devicename = %device_name, readingname = %reading_name, "push to storage parameters");
        Ok(Box::new(PushToStorage {
            device_name,
            reading_name,
            client: init.core_data(PUSH_TO_STORAGE)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingCoreData;

    #[test]
    fn test_mark_as_pushed_uses_context_event() {
        let client = Arc::new(RecordingCoreData::default());
        let mut stage = MarkAsPushed {
            client: client.clone(),
        };
        let event = Event::new("d1", vec![]).with_id("evt-1");
        let mut ctx = StageContext::for_event(&event);

        let out = stage.process(Payload::Event(event.clone()), &mut ctx).unwrap();
        assert_eq!(out, Some(Payload::Event(event)));
        assert_eq!(client.marked(), vec!["evt-1".to_string()]);
    }

    #[test]
    fn test_mark_as_pushed_without_event_id() {
        let mut stage = MarkAsPushed {
            client: Arc::new(RecordingCoreData::default()),
        };
        let err = stage
            .process(Payload::Text("x".to_string()), &mut StageContext::new())
            .unwrap_err();
        assert_eq!(err, StageError::NoEventId(MARK_AS_PUSHED.to_string()));
    }

    #[test]
    fn test_push_to_storage_wraps_reading() {
        let client = Arc::new(RecordingCoreData::default());
        let mut stage = PushToStorage {
            device_name: "gateway".to_string(),
            reading_name: "summary".to_string(),
            client: client.clone(),
        };

        let out = stage
            .process(Payload::Text("42".to_string()), &mut StageContext::new())
            .unwrap()
            .unwrap();

        let stored = out.as_event().unwrap();
        assert!(stored.id.is_some());
        assert_eq!(stored.device, "gateway");
        assert_eq!(stored.readings[0].name, "summary");
        assert_eq!(stored.readings[0].value, "42");
        assert_eq!(client.pushed().len(), 1);
    }
}
