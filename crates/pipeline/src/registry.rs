//! Stage registry for creating pipeline stage instances.

use std::collections::HashMap;
use std::sync::Arc;

use event_types::Addressable;
use tracing::{debug, error};

use crate::collab::StageInitCtx;
use crate::config::StageConfig;
use crate::error::StageError;
use crate::params::{self, ParamSpec, ResolvedParams};
use crate::stage::Stage;

/// A factory for creating instances of a specific stage type.
pub trait StageFactory: Send + Sync {
    /// The stage kind this factory creates, e.g. "http-post".
    fn stage_type(&self) -> &'static str;

    /// Declared parameters; resolved by the registry before [`create`](Self::create).
    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    /// Creates a new stage instance from already resolved parameters.
    fn create(
        &self,
        params: &ResolvedParams,
        addressable: Option<&Addressable>,
        init: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError>;
}

/// A registry for stage factories.
#[derive(Default)]
pub struct StageRegistry {
    factories: HashMap<String, Arc<dyn StageFactory>>,
}

impl StageRegistry {
    /// Creates a new, empty stage registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in stage.
    pub fn with_builtin_stages() -> Self {
        let mut registry = Self::new();
        crate::stages::register_builtin_stages(&mut registry);
        registry
    }

    /// Registers a new stage factory under its stage type.
    pub fn register<F>(&mut self, factory: F)
    where
        F: StageFactory + 'static,
    {
        self.factories
            .insert(factory.stage_type().to_string(), Arc::new(factory));
    }

    /// Creates a new stage instance from a config.
    ///
    /// On failure the cause is logged once at error level and returned; no
    /// stage is produced.
    pub fn create_stage(
        &self,
        config: &StageConfig,
        init: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        match self.build(config, init) {
            Ok(stage) => {
                debug!(stage = %config.name, kind = %config.kind(), "stage configured");
                Ok(stage)
            }
            Err(err) => {
                error!(stage = %config.name, kind = %config.kind(), error = %err, "failed to configure stage");
                Err(err)
            }
        }
    }

    fn build(
        &self,
        config: &StageConfig,
        init: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        let factory = self
            .factories
            .get(config.kind())
            .ok_or_else(|| StageError::NotFound(config.kind().to_string()))?;
        let resolved = params::resolve(factory.stage_type(), factory.params(), &config.parameters)?;
        factory.create(&resolved, config.addressable.as_ref(), init)
    }

    /// Get all registered stage types, sorted.
    pub fn stage_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Get parameter schema for a stage type.
    pub fn parameter_schema(&self, stage_type: &str) -> Option<serde_json::Value> {
        self.factories
            .get(stage_type)
            .map(|f| params::schema(f.params()))
    }
}
