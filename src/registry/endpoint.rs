//! Registered endpoint model and registry mutations.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HAProxy maintenance flag. `Enabled` means the server is suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Maintenance {
    Enabled,
    #[default]
    Disabled,
}

/// Identity of an endpoint on the network, independent of its registry name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub host: String,
    pub port: u16,
}

impl EndpointKey {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A backend server known to the load balancer.
///
/// Attributes the controller does not manage are kept in `extra` so that a
/// full-object edit writes them back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredEndpoint {
    /// Opaque, stable server name.
    pub name: String,
    /// Host or IP the server points at.
    pub address: String,
    /// 0 when the registry entry carries no port (e.g. templated servers).
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub maintenance: Maintenance,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegisteredEndpoint {
    /// A new server entry, suspended until its first healthy probe.
    pub fn new_suspended(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
            maintenance: Maintenance::Enabled,
            extra: Map::new(),
        }
    }

    pub fn key(&self) -> EndpointKey {
        EndpointKey::new(self.address.clone(), self.port)
    }

    pub fn is_suspended(&self) -> bool {
        self.maintenance == Maintenance::Enabled
    }

    /// Copy of this entry with the maintenance flag set accordingly.
    pub fn with_suspended(&self, suspended: bool) -> Self {
        let mut next = self.clone();
        next.maintenance = if suspended {
            Maintenance::Enabled
        } else {
            Maintenance::Disabled
        };
        next
    }
}

/// A staged change to the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create(RegisteredEndpoint),
    Edit(RegisteredEndpoint),
    Delete { name: String },
}

impl Mutation {
    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Create(_) => "create",
            Mutation::Edit(_) => "edit",
            Mutation::Delete { .. } => "delete",
        }
    }

    /// Name of the server this mutation touches.
    pub fn name(&self) -> &str {
        match self {
            Mutation::Create(e) | Mutation::Edit(e) => &e.name,
            Mutation::Delete { name } => name,
        }
    }
}

/// All mutations from one reconciliation pass, bound to the snapshot
/// version they were computed against.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationBatch {
    pub version: u64,
    pub mutations: Vec<Mutation>,
}

impl MutationBatch {
    pub fn new(version: u64, mutations: Vec<Mutation>) -> Self {
        Self { version, mutations }
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }
}
