//! Event conversion to JSON and XML documents.

use std::sync::Arc;

use event_types::Addressable;

use crate::collab::{StageInitCtx, XmlEncoder};
use crate::data::Payload;
use crate::error::StageError;
use crate::params::ResolvedParams;
use crate::registry::StageFactory;
use crate::stage::{expect_event, Stage, StageContext};

pub const CONVERT_TO_JSON: &str = "convert-to-json";
pub const CONVERT_TO_XML: &str = "convert-to-xml";

/// Marshals an event into a JSON document.
#[derive(Debug, Default)]
pub struct ToJson;

impl Stage for ToJson {
    fn id(&self) -> &str {
        CONVERT_TO_JSON
    }

    fn process(
        &mut self,
        data: Payload,
        _ctx: &mut StageContext,
    ) -> Result<Option<Payload>, StageError> {
        let event = expect_event(CONVERT_TO_JSON, data)?;
        Ok(Some(Payload::Text(serde_json::to_string(&event)?)))
    }
}

/// Marshals an event into an XML document.
pub struct ToXml {
    encoder: Arc<dyn XmlEncoder>,
}

impl Stage for ToXml {
    fn id(&self) -> &str {
        CONVERT_TO_XML
    }

    fn process(
        &mut self,
        data: Payload,
        _ctx: &mut StageContext,
    ) -> Result<Option<Payload>, StageError> {
        let event = expect_event(CONVERT_TO_XML, data)?;
        let xml = self
            .encoder
            .event_to_xml(&event)
            .map_err(|e| StageError::collaborator(CONVERT_TO_XML, e))?;
        Ok(Some(Payload::Text(xml)))
    }
}

#[derive(Default)]
pub struct ToJsonFactory;

impl StageFactory for ToJsonFactory {
    fn stage_type(&self) -> &'static str {
        CONVERT_TO_JSON
    }

    fn create(
        &self,
        _: &ResolvedParams,
        _: Option<&Addressable>,
        _: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        Ok(Box::new(ToJson))
    }
}

#[derive(Default)]
pub struct ToXmlFactory;

impl StageFactory for ToXmlFactory {
    fn stage_type(&self) -> &'static str {
        CONVERT_TO_XML
    }

    fn create(
        &self,
        _: &ResolvedParams,
        _: Option<&Addressable>,
        init: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        Ok(Box::new(ToXml {
            encoder: init.xml(CONVERT_TO_XML)?,
        }))
    }
}
