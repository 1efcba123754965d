//! HTTP POST sender stages.

use std::sync::Arc;

use event_types::Addressable;
use tracing::debug;

use crate::collab::{HttpClient, StageInitCtx};
use crate::data::Payload;
use crate::error::StageError;
use crate::params::{keys, ParamDefault, ParamKind, ParamSpec, ResolvedParams};
use crate::registry::StageFactory;
use crate::stage::{Stage, StageContext};

pub const HTTP_POST: &str = "http-post";
pub const HTTP_POST_JSON: &str = "http-post-json";
pub const HTTP_POST_XML: &str = "http-post-xml";

const PERSIST_ON_ERROR: ParamSpec =
    ParamSpec::optional(keys::PERSIST_ON_ERROR, ParamKind::Bool, ParamDefault::Bool(false));

/// Posts the incoming data to a fixed URL and continues with the response
/// body.
///
/// When the post fails and `persist_on_error` is set, the outgoing payload is
/// stored on the context as retry data before the error is returned.
pub struct HttpPost {
    stage_type: &'static str,
    url: String,
    mime_type: String,
    persist_on_error: bool,
    client: Arc<dyn HttpClient>,
}

impl Stage for HttpPost {
    fn id(&self) -> &str {
        self.stage_type
    }

    fn process(
        &mut self,
        data: Payload,
        ctx: &mut StageContext,
    ) -> Result<Option<Payload>, StageError> {
        let body = data.into_bytes()?;
        match self.client.post(&self.url, &self.mime_type, &body) {
            Ok(response) => Ok(Some(Payload::Bytes(response))),
            Err(err) => {
                if self.persist_on_error {
                    ctx.set_retry_data(body);
                }
                Err(StageError::collaborator(self.stage_type, err))
            }
        }
    }
}

/// Builds `http-post`, or one of its fixed-mime-type variants.
pub struct HttpPostFactory {
    stage_type: &'static str,
    fixed_mime_type: Option<&'static str>,
}

impl HttpPostFactory {
    /// `http-post`: mime type taken from configuration.
    pub fn new() -> Self {
        Self {
            stage_type: HTTP_POST,
            fixed_mime_type: None,
        }
    }

    /// `http-post-json`
    pub fn json() -> Self {
        Self {
            stage_type: HTTP_POST_JSON,
            fixed_mime_type: Some("application/json"),
        }
    }

    /// `http-post-xml`
    pub fn xml() -> Self {
        Self {
            stage_type: HTTP_POST_XML,
            fixed_mime_type: Some("application/xml"),
        }
    }
}

impl Default for HttpPostFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl StageFactory for HttpPostFactory {
    fn stage_type(&self) -> &'static str {
        self.stage_type
    }

    fn params(&self) -> &'static [ParamSpec] {
        const CONFIGURED_MIME: &[ParamSpec] = &[
            ParamSpec::required(keys::URL, ParamKind::Identifier),
            ParamSpec::required(keys::MIME_TYPE, ParamKind::Identifier),
            PERSIST_ON_ERROR,
        ];
        const FIXED_MIME: &[ParamSpec] = &[
            ParamSpec::required(keys::URL, ParamKind::Identifier),
            PERSIST_ON_ERROR,
        ];
        match self.fixed_mime_type {
            Some(_) => FIXED_MIME,
            None => CONFIGURED_MIME,
        }
    }

    fn create(
        &self,
        params: &ResolvedParams,
        _: Option<&Addressable>,
        init: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        let url = params.text(keys::URL)?.to_string();
        let mime_type = match self.fixed_mime_type {
            Some(mime) => mime.to_string(),
            None => params.text(keys::MIME_TYPE)?.to_string(),
        };
        let persist_on_error = params.flag(keys::PERSIST_ON_ERROR)?;
        debug!(
            stage = self.stage_type,
            url = %url,
            mimetype = %mime_type,
            persist_on_error,
            "HTTP post parameters"
        );

        Ok(Box::new(HttpPost {
            stage_type: self.stage_type,
            url,
            mime_type,
            persist_on_error,
            client: init.http(self.stage_type)?,
        }))
    }
}
