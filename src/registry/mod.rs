//! Load balancer registry boundary.
//!
//! # Data Flow
//! ```text
//! snapshot()            → versioned read of all backend servers
//! begin(version)        → transaction bound to that version
//!     create/edit/delete* staged inside the transaction
//! commit(txn)           → rejected if the registry moved past `version`
//! discard(txn)          → always called last, even after a commit
//! ```
//!
//! # Design Decisions
//! - The registry owns all state; the controller never caches it across cycles
//! - Optimistic concurrency via configuration version
//! - dataplane.rs talks to the HAProxy Data Plane API, memory.rs keeps
//!   everything in process with identical semantics

pub mod dataplane;
pub mod endpoint;
pub mod memory;
pub mod naming;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use dataplane::DataPlaneRegistry;
pub use endpoint::{EndpointKey, Maintenance, Mutation, MutationBatch, RegisteredEndpoint};
pub use memory::MemoryRegistry;
pub use naming::{IdGenerator, RandomNameGenerator};

/// Identifier of an open registry transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Versioned view of the registry at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub version: u64,
    pub endpoints: Vec<RegisteredEndpoint>,
}

/// Errors returned by a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry version advanced after the snapshot was taken.
    #[error("registry version conflict: {0}")]
    Conflict(String),

    #[error("transaction {0} does not exist")]
    UnknownTransaction(String),

    #[error("server '{0}' does not exist")]
    UnknownServer(String),

    #[error("server '{0}' already exists")]
    DuplicateServer(String),

    /// Any other non-success answer from the registry.
    #[error("registry rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("registry unreachable: {0}")]
    Http(#[from] reqwest::Error),
}

impl RegistryError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RegistryError::Conflict(_))
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Transactional access to the load balancer's backend servers.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Read all servers together with the version they belong to.
    async fn snapshot(&self) -> RegistryResult<Snapshot>;

    /// Open a transaction against `version`.
    async fn begin(&self, version: u64) -> RegistryResult<TransactionId>;

    async fn create(&self, txn: &TransactionId, endpoint: &RegisteredEndpoint) -> RegistryResult<()>;

    async fn edit(&self, txn: &TransactionId, endpoint: &RegisteredEndpoint) -> RegistryResult<()>;

    async fn delete(&self, txn: &TransactionId, name: &str) -> RegistryResult<()>;

    /// Make the staged changes visible.
    async fn commit(&self, txn: &TransactionId) -> RegistryResult<()>;

    /// Release the transaction. Succeeds for already-committed transactions.
    async fn discard(&self, txn: &TransactionId) -> RegistryResult<()>;

    /// Stage one mutation.
    async fn apply(&self, txn: &TransactionId, mutation: &Mutation) -> RegistryResult<()> {
        match mutation {
            Mutation::Create(endpoint) => self.create(txn, endpoint).await,
            Mutation::Edit(endpoint) => self.edit(txn, endpoint).await,
            Mutation::Delete { name } => self.delete(txn, name).await,
        }
    }
}
