//! Configurable stage registry for event-processing pipelines
//!
//! A pipeline is an ordered list of stages. Each stage is named in
//! configuration together with a flat string-to-string parameter mapping; the
//! [`StageRegistry`] looks the stage kind up, resolves and coerces its
//! parameters and hands back a ready-to-run [`Stage`]. A stage that cannot be
//! configured is reported once, at error level, and never produced.
//!
//! Work that needs an outside system (transports, storage, codecs) is done by
//! collaborators supplied through a [`StageInitCtx`].

pub mod collab;
pub mod config;
pub mod data;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod registry;
pub mod stage;
pub mod stages;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use collab::*;
pub use config::*;
pub use data::*;
pub use error::*;
pub use params::{ParamDefault, ParamKind, ParamSpec, ResolvedParams, StageParams};
pub use pipeline::*;
pub use registry::*;
pub use stage::*;
