//! Parameter resolution for configurable stages.
//!
//! Every stage kind declares its parameters as a static list of [`ParamSpec`]s.
//! [`resolve`] walks that list once against the flat string mapping taken from
//! the pipeline configuration, producing a [`ResolvedParams`] whose values are
//! already coerced. A required parameter that is missing, or any parameter whose
//! value is present but cannot be coerced, fails resolution for the whole stage.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::error::StageError;

/// Raw stage parameters as they appear in configuration.
pub type StageParams = HashMap<String, String>;

/// Parameter names recognised by the built-in stages.
pub mod keys {
    pub const DEVICE_NAMES: &str = "devicenames";
    pub const VALUE_DESCRIPTORS: &str = "valuedescriptors";
    pub const KEY: &str = "key";
    pub const INIT_VECTOR: &str = "initvector";
    pub const URL: &str = "url";
    pub const MIME_TYPE: &str = "mimetype";
    pub const PERSIST_ON_ERROR: &str = "persistOnError";
    pub const CERT: &str = "cert";
    pub const QOS: &str = "qos";
    pub const RETAIN: &str = "retain";
    pub const AUTO_RECONNECT: &str = "autoreconnect";
    pub const DEVICE_NAME: &str = "devicename";
    pub const READING_NAME: &str = "readingname";
}

/// How a raw string value is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A name or address; surrounding whitespace is trimmed.
    Identifier,
    /// Taken verbatim (key material, file references).
    Raw,
    Bool,
    Integer,
    /// Human duration such as `10s`, `250ms` or `1h 30m`.
    Duration,
    /// Comma-separated; elements trimmed, empty elements dropped.
    List,
}

impl ParamKind {
    fn format(self) -> Option<&'static str> {
        match self {
            ParamKind::Identifier | ParamKind::Raw => None,
            ParamKind::Bool => Some("boolean"),
            ParamKind::Integer => Some("integer"),
            ParamKind::Duration => Some("duration"),
            ParamKind::List => Some("comma-separated-list"),
        }
    }
}

/// Value substituted for an absent optional parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    /// Leave the parameter unset.
    None,
    Bool(bool),
    Integer(i64),
    Text(&'static str),
    Duration(Duration),
    EmptyList,
}

/// Declaration of one stage parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: ParamDefault,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: ParamDefault::None,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, default: ParamDefault) -> Self {
        Self {
            name,
            kind,
            required: false,
            default,
        }
    }
}

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Bool(bool),
    Integer(i64),
    Duration(Duration),
    List(Vec<String>),
}

impl ParamValue {
    fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Text(_) => "text",
            ParamValue::Bool(_) => "boolean",
            ParamValue::Integer(_) => "integer",
            ParamValue::Duration(_) => "duration",
            ParamValue::List(_) => "list",
        }
    }

    fn from_default(default: ParamDefault) -> Option<Self> {
        match default {
            ParamDefault::None => None,
            ParamDefault::Bool(b) => Some(ParamValue::Bool(b)),
            ParamDefault::Integer(i) => Some(ParamValue::Integer(i)),
            ParamDefault::Text(s) => Some(ParamValue::Text(s.to_string())),
            ParamDefault::Duration(d) => Some(ParamValue::Duration(d)),
            ParamDefault::EmptyList => Some(ParamValue::List(Vec::new())),
        }
    }
}

/// The resolved parameters for one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    stage: String,
    values: HashMap<&'static str, ParamValue>,
}

impl ResolvedParams {
    /// Stage kind these parameters were resolved for.
    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn get(&self, name: &str) -> Result<&ParamValue, StageError> {
        self.values.get(name).ok_or_else(|| StageError::MissingParam {
            stage: self.stage.clone(),
            param: name.to_string(),
        })
    }

    fn mismatch(&self, name: &str, value: &ParamValue, wanted: &str) -> StageError {
        StageError::BadParam {
            stage: self.stage.clone(),
            param: name.to_string(),
            value: format!("{:?}", value),
            reason: format!("resolved as {}, read as {}", value.kind_name(), wanted),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, StageError> {
        match self.get(name)? {
            ParamValue::Text(s) => Ok(s),
            other => Err(self.mismatch(name, other, "text")),
        }
    }

    /// Text value of an optional parameter without a default.
    pub fn opt_text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool, StageError> {
        match self.get(name)? {
            ParamValue::Bool(b) => Ok(*b),
            other => Err(self.mismatch(name, other, "boolean")),
        }
    }

    pub fn integer(&self, name: &str) -> Result<i64, StageError> {
        match self.get(name)? {
            ParamValue::Integer(i) => Ok(*i),
            other => Err(self.mismatch(name, other, "integer")),
        }
    }

    pub fn duration(&self, name: &str) -> Result<Duration, StageError> {
        match self.get(name)? {
            ParamValue::Duration(d) => Ok(*d),
            other => Err(self.mismatch(name, other, "duration")),
        }
    }

    pub fn list(&self, name: &str) -> Result<&[String], StageError> {
        match self.get(name)? {
            ParamValue::List(items) => Ok(items),
            other => Err(self.mismatch(name, other, "list")),
        }
    }
}

/// Resolve `params` against the declared `specs` of `stage`.
///
/// Keys in `params` that are not declared are ignored.
pub fn resolve(
    stage: &str,
    specs: &[ParamSpec],
    params: &StageParams,
) -> Result<ResolvedParams, StageError> {
    let mut values = HashMap::with_capacity(specs.len());

    for spec in specs {
        match params.get(spec.name) {
            Some(raw) => {
                let value = coerce(spec.kind, raw).map_err(|reason| StageError::BadParam {
                    stage: stage.to_string(),
                    param: spec.name.to_string(),
                    value: raw.clone(),
                    reason,
                })?;
                values.insert(spec.name, value);
            }
            None if spec.required => {
                return Err(StageError::MissingParam {
                    stage: stage.to_string(),
                    param: spec.name.to_string(),
                });
            }
            None => {
                if let Some(value) = ParamValue::from_default(spec.default) {
                    values.insert(spec.name, value);
                }
            }
        }
    }

    Ok(ResolvedParams {
        stage: stage.to_string(),
        values,
    })
}

fn coerce(kind: ParamKind, raw: &str) -> Result<ParamValue, String> {
    match kind {
        ParamKind::Identifier => Ok(ParamValue::Text(raw.trim().to_string())),
        ParamKind::Raw => Ok(ParamValue::Text(raw.to_string())),
        ParamKind::Bool => parse_bool(raw).map(ParamValue::Bool),
        ParamKind::Integer => raw
            .parse::<i64>()
            .map(ParamValue::Integer)
            .map_err(|e| e.to_string()),
        ParamKind::Duration => humantime::parse_duration(raw)
            .map(ParamValue::Duration)
            .map_err(|e| e.to_string()),
        ParamKind::List => Ok(ParamValue::List(parse_list(raw))),
    }
}

/// Parse the usual spellings of a boolean.
pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err("invalid boolean".to_string()),
    }
}

/// Split a comma-separated list, trimming elements and dropping empty ones.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// JSON schema describing a parameter list.
pub fn schema(specs: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for spec in specs {
        let mut prop = Map::new();
        prop.insert("type".to_string(), json!("string"));
        if let Some(format) = spec.kind.format() {
            prop.insert("format".to_string(), json!(format));
        }
        match spec.default {
            ParamDefault::None => {}
            ParamDefault::Bool(b) => {
                prop.insert("default".to_string(), json!(b.to_string()));
            }
            ParamDefault::Integer(i) => {
                prop.insert("default".to_string(), json!(i.to_string()));
            }
            ParamDefault::Text(s) => {
                prop.insert("default".to_string(), json!(s));
            }
            ParamDefault::Duration(d) => {
                prop.insert(
                    "default".to_string(),
                    json!(humantime::format_duration(d).to_string()),
                );
            }
            ParamDefault::EmptyList => {
                prop.insert("default".to_string(), json!(""));
            }
        }
        if spec.required {
            required.push(json!(spec.name));
        }
        properties.insert(spec.name.to_string(), Value::Object(prop));
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
