//! Pipeline configuration types and loading

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use event_types::Addressable;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::{PipelineError, PipelineResult};
use crate::params::{parse_list, StageParams};

/// What to do when one configured stage cannot be built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyPolicy {
    /// Refuse to build the pipeline.
    #[default]
    Abort,
    /// Leave the stage out and keep assembling.
    Skip,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Stage names in invocation order
    #[serde(deserialize_with = "deserialize_order")]
    pub execution_order: Vec<String>,
    /// Per-stage configuration, keyed by stage name
    #[serde(default)]
    pub stages: HashMap<String, StageConfig>,
    #[serde(default)]
    pub on_stage_error: AssemblyPolicy,
}

/// Individual stage configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stage name within the pipeline; filled in from the `stages` key
    #[serde(skip)]
    pub name: String,
    /// Stage kind; defaults to the stage name
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub stage_type: Option<String>,
    /// Raw stage parameters
    #[serde(default)]
    pub parameters: StageParams,
    /// Endpoint for transport stages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addressable: Option<Addressable>,
}

impl StageConfig {
    /// Create a stage configuration whose kind is its name.
    pub fn new(name: impl Into<String>, parameters: StageParams) -> Self {
        Self {
            name: name.into(),
            stage_type: None,
            parameters,
            addressable: None,
        }
    }

    /// The registered stage kind this entry refers to.
    pub fn kind(&self) -> &str {
        self.stage_type.as_deref().unwrap_or(&self.name)
    }

    pub fn with_type(mut self, stage_type: impl Into<String>) -> Self {
        self.stage_type = Some(stage_type.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_addressable(mut self, addressable: Addressable) -> Self {
        self.addressable = Some(addressable);
        self
    }
}

impl PipelineConfig {
    /// Create a configuration running `order` with no stage parameters.
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            execution_order: order.into_iter().map(Into::into).collect(),
            stages: HashMap::new(),
            on_stage_error: AssemblyPolicy::Abort,
        }
    }

    /// Add or replace the configuration for `stage.name`.
    pub fn with_stage(mut self, stage: StageConfig) -> Self {
        self.stages.insert(stage.name.clone(), stage);
        self
    }

    pub fn with_policy(mut self, policy: AssemblyPolicy) -> Self {
        self.on_stage_error = policy;
        self
    }

    /// Configuration for the stage called `name`; unconfigured stages get an
    /// empty parameter mapping.
    pub fn stage(&self, name: &str) -> StageConfig {
        self.stages
            .get(name)
            .cloned()
            .unwrap_or_else(|| StageConfig::new(name, StageParams::new()))
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> PipelineResult<()> {
        if self.execution_order.is_empty() {
            return Err(PipelineError::InvalidConfiguration {
                message: "execution_order must name at least one stage".to_string(),
            });
        }

        for name in self.stages.keys() {
            if !self.execution_order.contains(name) {
                warn!(stage = %name, "stage is configured but not in execution_order");
            }
        }

        Ok(())
    }

    pub fn from_toml(text: &str) -> PipelineResult<Self> {
        Self::finish(toml::from_str(text)?)
    }

    pub fn from_yaml(text: &str) -> PipelineResult<Self> {
        Self::finish(serde_yaml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> PipelineResult<Self> {
        Self::finish(serde_json::from_str(text)?)
    }

    /// Load a configuration file, choosing the format by extension.
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&text),
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            Some("json") => Self::from_json(&text),
            other => Err(PipelineError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Save pipeline configuration to JSON
    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn finish(mut config: Self) -> PipelineResult<Self> {
        for (name, stage) in config.stages.iter_mut() {
            stage.name = name.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Accept either a list of names or one comma-separated string.
fn deserialize_order<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderVisitor;

    impl<'de> Visitor<'de> for OrderVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of stage names or a comma-separated string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(parse_list(v))
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut names = Vec::new();
            while let Some(name) = seq.next_element::<String>()? {
                let name = name.trim();
                if !name.is_empty() {
                    names.push(name.to_string());
                }
            }
            Ok(names)
        }
    }

    deserializer.deserialize_any(OrderVisitor)
}
