//! Error types for the pipeline system

use thiserror::Error;

/// Pipeline-level error types, raised while assembling or running a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid pipeline configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Stage '{stage_name}' could not be configured: {source}")]
    Assembly {
        stage_name: String,
        #[source]
        source: StageError,
    },

    #[error("Runtime error in stage '{stage_name}': {source}")]
    RuntimeError {
        stage_name: String,
        #[source]
        source: StageError,
    },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error types for a single stage, both at construction and at invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("parameter {param} not found for stage {stage}")]
    MissingParam { stage: String, param: String },

    #[error("could not parse '{value}' for parameter {param} of stage {stage}: {reason}")]
    BadParam {
        stage: String,
        param: String,
        value: String,
        reason: String,
    },

    #[error("stage type not found: {0}")]
    NotFound(String),

    #[error("stage {stage} requires {what}")]
    MissingContext { stage: String, what: &'static str },

    #[error("stage {stage} expected {expected}, got {actual}")]
    UnexpectedPayload {
        stage: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("stage {0} requires the id of the triggering event")]
    NoEventId(String),

    #[error("JSON serialization/deserialization error: {0}")]
    JsonError(String),

    #[error("stage {stage} failed: {message}")]
    Collaborator { stage: String, message: String },
}

impl StageError {
    /// Wrap a collaborator failure for `stage`, keeping the full error chain.
    pub fn collaborator(stage: &str, err: anyhow::Error) -> Self {
        StageError::Collaborator {
            stage: stage.to_string(),
            message: format!("{:#}", err),
        }
    }

    /// True for failures that can only happen while a stage is being built.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            StageError::MissingParam { .. }
                | StageError::BadParam { .. }
                | StageError::NotFound(_)
                | StageError::MissingContext { .. }
        )
    }
}

impl From<serde_json::Error> for StageError {
    fn from(err: serde_json::Error) -> Self {
        StageError::JsonError(err.to_string())
    }
}
