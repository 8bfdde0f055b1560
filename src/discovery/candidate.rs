//! Candidate endpoints as published by the proxy directory.

use serde::{Deserialize, Serialize};

use crate::registry::EndpointKey;

/// One proxy advertised by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "server")]
    pub host: String,
    pub port: u16,
    /// Transport protocol tag, e.g. `SOCKS5`.
    pub protocol: String,
    #[serde(default)]
    pub iso_code: String,
    #[serde(default)]
    pub country: String,
    /// Advisory round-trip latency.
    #[serde(default, rename = "ping_time_ms")]
    pub latency_ms: u64,
    /// Advisory packet loss, 0.0 to 1.0.
    #[serde(default)]
    pub loss_ratio: f64,
}

impl Candidate {
    pub fn key(&self) -> EndpointKey {
        EndpointKey::new(self.host.clone(), self.port)
    }
}

/// Keep only candidates whose protocol tag matches exactly.
pub fn filter_by_protocol(candidates: Vec<Candidate>, protocol: &str) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| c.protocol == protocol)
        .collect()
}
