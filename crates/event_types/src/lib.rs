//! Shared types for the event pipeline
//!
//! This crate contains the device event model that flows through pipeline
//! stages and the endpoint descriptor handed to transport stages.

pub mod event;
pub mod addressable;

// Re-export commonly used types
pub use event::*;
pub use addressable::*;
