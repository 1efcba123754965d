//! Ordered pipeline assembly and execution.

use tracing::{debug, info, warn};

use crate::collab::StageInitCtx;
use crate::config::{AssemblyPolicy, PipelineConfig};
use crate::data::Payload;
use crate::error::{PipelineError, PipelineResult};
use crate::registry::StageRegistry;
use crate::stage::{Stage, StageContext};

/// A configured stage at its place in the pipeline.
pub struct PipelineNode {
    pub name: String,
    pub stage: Box<dyn Stage>,
}

/// Stages invoked one after another, each receiving the previous one's output.
pub struct Pipeline {
    nodes: Vec<PipelineNode>,
}

impl Pipeline {
    /// Builds every stage named in `config.execution_order`, in order.
    ///
    /// A stage that cannot be built aborts assembly or is left out, depending
    /// on `config.on_stage_error`. The registry has already logged the cause.
    pub fn build(
        config: &PipelineConfig,
        registry: &StageRegistry,
        init: &StageInitCtx,
    ) -> PipelineResult<Self> {
        config.validate()?;

        let mut nodes = Vec::with_capacity(config.execution_order.len());
        for name in &config.execution_order {
            let stage_config = config.stage(name);
            match registry.create_stage(&stage_config, init) {
                Ok(stage) => nodes.push(PipelineNode {
                    name: name.clone(),
                    stage,
                }),
                Err(source) => match config.on_stage_error {
                    AssemblyPolicy::Abort => {
                        return Err(PipelineError::Assembly {
                            stage_name: name.clone(),
                            source,
                        })
                    }
                    AssemblyPolicy::Skip => {
                        warn!(stage = %name, "leaving unconfigurable stage out of the pipeline");
                    }
                },
            }
        }

        if nodes.is_empty() {
            return Err(PipelineError::InvalidConfiguration {
                message: "no stage could be configured".to_string(),
            });
        }

        info!(stages = nodes.len(), "pipeline assembled");
        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Names of the assembled stages, in invocation order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Run `data` through every stage.
    ///
    /// Returns the last stage's output, or `None` when a stage stopped the
    /// run early.
    pub fn process(
        &mut self,
        data: Payload,
        ctx: &mut StageContext,
    ) -> PipelineResult<Option<Payload>> {
        let mut current = data;
        for node in self.nodes.iter_mut() {
            match node.stage.process(current, ctx) {
                Ok(Some(next)) => current = next,
                Ok(None) => {
                    debug!(stage = %node.name, correlation_id = %ctx.correlation_id, "pipeline stopped");
                    return Ok(None);
                }
                Err(source) => {
                    return Err(PipelineError::RuntimeError {
                        stage_name: node.name.clone(),
                        source,
                    })
                }
            }
        }
        Ok(Some(current))
    }
}
