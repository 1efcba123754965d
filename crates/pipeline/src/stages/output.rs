use event_types::Addressable;

use crate::collab::StageInitCtx;
use crate::data::Payload;
use crate::error::StageError;
use crate::params::ResolvedParams;
use crate::registry::StageFactory;
use crate::stage::{Stage, StageContext};

pub const SET_OUTPUT_DATA: &str = "set-output-data";

/// Records the incoming data as the pipeline's response and passes it on.
#[derive(Debug, Default)]
pub struct SetOutputData;

impl Stage for SetOutputData {
    fn id(&self) -> &str {
        SET_OUTPUT_DATA
    }

    fn process(
        &mut self,
        data: Payload,
        ctx: &mut StageContext,
    ) -> Result<Option<Payload>, StageError> {
        ctx.complete(data.clone().into_bytes()?);
        Ok(Some(data))
    }
}

#[derive(Default)]
pub struct SetOutputDataFactory;

impl StageFactory for SetOutputDataFactory {
    fn stage_type(&self) -> &'static str {
        SET_OUTPUT_DATA
    }

    fn create(
        &self,
        _: &ResolvedParams,
        _: Option<&Addressable>,
        _: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        Ok(Box::new(SetOutputData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sets_output_and_passes_through() {
        let mut ctx = StageContext::new();
        let out = SetOutputData
            .process(Payload::Text("done".to_string()), &mut ctx)
            .unwrap();

        assert_eq!(out, Some(Payload::Text("done".to_string())));
        assert_eq!(ctx.output_data.as_deref(), Some(&b"done"[..]));
    }
}
