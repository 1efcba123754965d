//! Command implementations for `pipectl`.

pub mod transports;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use event_types::Event;
use pipeline::{Payload, Pipeline, PipelineConfig, StageContext, StageInitCtx, StageRegistry};
use tracing::info;

use crate::transports::{LoggingCoreData, LoggingHttp, LoggingMqtt};

/// Collaborators available to dry runs. Codecs and ciphers are not provided,
/// so stages that need them fail to build.
pub fn dry_run_context() -> StageInitCtx {
    StageInitCtx::new()
        .with_http(Arc::new(LoggingHttp))
        .with_mqtt(Arc::new(LoggingMqtt))
        .with_core_data(Arc::new(LoggingCoreData::default()))
}

/// Every registered stage kind with its parameter schema.
pub fn describe_stages(registry: &StageRegistry) -> serde_json::Value {
    let stages = registry
        .stage_types()
        .into_iter()
        .map(|kind| {
            let schema = registry
                .parameter_schema(kind)
                .unwrap_or(serde_json::Value::Null);
            (kind.to_string(), schema)
        })
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(stages)
}

/// Assemble the pipeline in `config_path`, returning its stage names.
pub fn validate(config_path: &Path, registry: &StageRegistry) -> anyhow::Result<Vec<String>> {
    let config = load(config_path)?;
    let pipeline = Pipeline::build(&config, registry, &dry_run_context())
        .with_context(|| format!("assembling pipeline from {}", config_path.display()))?;
    Ok(pipeline.stage_names().into_iter().map(String::from).collect())
}

/// Push the event stored in `event_path` through the pipeline in
/// `config_path`, returning the data the pipeline set as its output.
pub fn run(
    config_path: &Path,
    event_path: &Path,
    registry: &StageRegistry,
) -> anyhow::Result<Option<Vec<u8>>> {
    let config = load(config_path)?;
    let mut pipeline = Pipeline::build(&config, registry, &dry_run_context())
        .with_context(|| format!("assembling pipeline from {}", config_path.display()))?;

    let text = std::fs::read_to_string(event_path)
        .with_context(|| format!("reading event from {}", event_path.display()))?;
    let event: Event = serde_json::from_str(&text)
        .with_context(|| format!("parsing event from {}", event_path.display()))?;

    let mut ctx = StageContext::for_event(&event);
    info!(correlation_id = %ctx.correlation_id, device = %event.device, "running pipeline");
    let result = pipeline.process(Payload::Event(event), &mut ctx)?;
    if result.is_none() {
        info!("pipeline stopped before its last stage");
    }
    Ok(ctx.output_data)
}

fn load(config_path: &Path) -> anyhow::Result<PipelineConfig> {
    PipelineConfig::load(config_path)
        .with_context(|| format!("loading pipeline config {}", config_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const CONFIG: &str = r#"
execution_order = ["filter-by-device-name", "convert-to-json", "set-output-data", "mark-as-pushed"]

[stages.filter-by-device-name.parameters]
devicenames = "thermostat1"
"#;

    #[test]
    fn test_describe_stages() {
        let described = describe_stages(&StageRegistry::with_builtin_stages());
        let stages = described.as_object().unwrap();
        assert_eq!(stages.len(), 14);
        assert_eq!(stages["encrypt-aes"]["required"], serde_json::json!(["key", "initvector"]));
    }

    #[test]
    fn test_validate_reports_stage_names() {
        let config = file(".toml", CONFIG);
        let names = validate(config.path(), &StageRegistry::with_builtin_stages()).unwrap();
        assert_eq!(
            names,
            vec!["filter-by-device-name", "convert-to-json", "set-output-data", "mark-as-pushed"]
        );
    }

    #[test]
    fn test_validate_fails_without_codec() {
        let config = file(".json", r#"{"execution_order": "convert-to-json, compress-gzip"}"#);
        let err = validate(config.path(), &StageRegistry::with_builtin_stages()).unwrap_err();
        assert!(format!("{err:#}").contains("requires a compressor"));
    }

    #[test]
    fn test_run_outputs_json() {
        let config = file(".toml", CONFIG);
        let event = file(
            ".json",
            r#"{"id": "evt-1", "device": "thermostat1", "origin": 0, "readings": [
                {"device": "thermostat1", "name": "temperature", "value": "20", "origin": 0}
            ]}"#,
        );

        let output = run(config.path(), event.path(), &StageRegistry::with_builtin_stages())
            .unwrap()
            .unwrap();
        let back: Event = serde_json::from_slice(&output).unwrap();
        assert_eq!(back.device, "thermostat1");
        assert_eq!(back.readings[0].value, "20");
    }

    #[test]
    fn test_run_filtered_event_has_no_output() {
        let config = file(".toml", CONFIG);
        let event = file(".json", r#"{"device": "motor", "origin": 0, "readings": []}"#);

        let output = run(config.path(), event.path(), &StageRegistry::with_builtin_stages()).unwrap();
        assert!(output.is_none());
    }
}
