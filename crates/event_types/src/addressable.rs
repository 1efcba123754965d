//! Network endpoint descriptors

use serde::{Deserialize, Serialize};

/// Describes where a transport stage should deliver data.
///
/// Supplied by the caller alongside a stage's parameters; it is never read
/// from the stage's parameter mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Addressable {
    pub name: String,
    /// Scheme, e.g. "tcp", "ssl" or "http"
    pub protocol: String,
    pub address: String,
    pub port: u16,
    pub path: String,
    /// Client identifier used when publishing
    pub publisher: String,
    pub user: String,
    pub password: String,
    /// Topic for message-broker endpoints
    pub topic: String,
}

impl Addressable {
    /// `protocol://address:port`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.address, self.port)
    }

    /// Base URL followed by the path.
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url(), self.path)
    }
}
