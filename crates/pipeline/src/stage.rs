//! Core pipeline stage trait and types

use event_types::Event;
use uuid::Uuid;

use crate::data::Payload;
use crate::error::StageError;

/// A configured unit of pipeline processing.
///
/// Stages are built once by a [`StageFactory`](crate::registry::StageFactory)
/// and then invoked for every payload that reaches them. The return value
/// decides what happens next:
///
/// * `Ok(Some(data))` continues the pipeline with `data`,
/// * `Ok(None)` stops the pipeline without an error,
/// * `Err(e)` stops the pipeline with an error.
pub trait Stage: Send {
    /// Stage kind, e.g. "http-post"
    fn id(&self) -> &str;

    fn process(
        &mut self,
        data: Payload,
        ctx: &mut StageContext,
    ) -> Result<Option<Payload>, StageError>;
}

/// Per-invocation state shared by all stages of one pipeline run.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub correlation_id: Uuid,
    /// Storage id of the event that triggered this run
    pub event_id: Option<String>,
    /// Data the pipeline hands back to its caller
    pub output_data: Option<Vec<u8>>,
    /// Payload a failing sender asked to keep for a later retry
    pub retry_data: Option<Vec<u8>>,
}

impl StageContext {
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            event_id: None,
            output_data: None,
            retry_data: None,
        }
    }

    /// Context for a run triggered by `event`.
    pub fn for_event(event: &Event) -> Self {
        Self {
            event_id: event.id.clone(),
            ..Self::new()
        }
    }

    /// Record the pipeline's output data.
    pub fn complete(&mut self, output: Vec<u8>) {
        self.output_data = Some(output);
    }

    pub fn set_retry_data(&mut self, payload: Vec<u8>) {
        self.retry_data = Some(payload);
    }
}

impl Default for StageContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Fail with [`StageError::UnexpectedPayload`] unless `data` is an event.
pub(crate) fn expect_event(stage: &str, data: Payload) -> Result<Event, StageError> {
    match data {
        Payload::Event(event) => Ok(event),
        other => Err(StageError::UnexpectedPayload {
            stage: stage.to_string(),
            expected: "Event",
            actual: other.data_type(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_for_event() {
        let event = Event::new("d1", vec![]).with_id("evt-7");
        let ctx = StageContext::for_event(&event);

        assert_eq!(ctx.event_id.as_deref(), Some("evt-7"));
        assert!(ctx.output_data.is_none());
        assert!(ctx.retry_data.is_none());
    }

    #[test]
    fn test_context_ids_are_unique() {
        assert_ne!(StageContext::new().correlation_id, StageContext::new().correlation_id);
    }

    #[test]
    fn test_expect_event_rejects_bytes() {
        let err = expect_event("convert-to-json", Payload::Bytes(vec![1])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "stage convert-to-json expected Event, got Bytes"
        );
    }
}
