//! In-process registry with Data Plane API transaction semantics.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::registry::{
    RegisteredEndpoint, Registry, RegistryError, RegistryResult, Snapshot, TransactionId,
};

#[derive(Debug)]
struct Transaction {
    base_version: u64,
    working: Vec<RegisteredEndpoint>,
}

#[derive(Debug, Default)]
struct State {
    version: u64,
    servers: Vec<RegisteredEndpoint>,
    transactions: HashMap<String, Transaction>,
}

impl State {
    fn transaction(&mut self, txn: &TransactionId) -> RegistryResult<&mut Transaction> {
        self.transactions
            .get_mut(&txn.0)
            .ok_or_else(|| RegistryError::UnknownTransaction(txn.0.clone()))
    }
}

/// Versioned registry held in memory.
///
/// Every successful commit bumps the version by one. Transactions work on a
/// private copy of the server list, so nothing is observable until commit.
#[derive(Debug)]
pub struct MemoryRegistry {
    state: Mutex<State>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::with_endpoints(Vec::new())
    }

    /// Start at version 1 with the given servers.
    pub fn with_endpoints(servers: Vec<RegisteredEndpoint>) -> Self {
        Self {
            state: Mutex::new(State {
                version: 1,
                servers,
                transactions: HashMap::new(),
            }),
        }
    }

    /// Advance the version without changing membership, as a concurrent
    /// writer would.
    pub async fn touch(&self) -> u64 {
        let mut state = self.state.lock().await;
        state.version += 1;
        state.version
    }

    pub async fn version(&self) -> u64 {
        self.state.lock().await.version
    }

    pub async fn endpoints(&self) -> Vec<RegisteredEndpoint> {
        self.state.lock().await.servers.clone()
    }

    /// Number of transactions opened and not yet discarded.
    pub async fn open_transactions(&self) -> usize {
        self.state.lock().await.transactions.len()
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn snapshot(&self) -> RegistryResult<Snapshot> {
        let state = self.state.lock().await;
        Ok(Snapshot {
            version: state.version,
            endpoints: state.servers.clone(),
        })
    }

    async fn begin(&self, version: u64) -> RegistryResult<TransactionId> {
        let mut state = self.state.lock().await;
        if version != state.version {
            return Err(RegistryError::Conflict(format!(
                "cannot open transaction at version {}, registry is at {}",
                version, state.version
            )));
        }
        let id = Uuid::new_v4().to_string();
        let working = state.servers.clone();
        state.transactions.insert(
            id.clone(),
            Transaction {
                base_version: version,
                working,
            },
        );
        Ok(TransactionId(id))
    }

    async fn create(&self, txn: &TransactionId, endpoint: &RegisteredEndpoint) -> RegistryResult<()> {
        let mut state = self.state.lock().await;
        let txn = state.transaction(txn)?;
        if txn.working.iter().any(|s| s.name == endpoint.name) {
            return Err(RegistryError::DuplicateServer(endpoint.name.clone()));
        }
        txn.working.push(endpoint.clone());
        Ok(())
    }

    async fn edit(&self, txn: &TransactionId, endpoint: &RegisteredEndpoint) -> RegistryResult<()> {
        let mut state = self.state.lock().await;
        let txn = state.transaction(txn)?;
        match txn.working.iter_mut().find(|s| s.name == endpoint.name) {
            Some(slot) => {
                *slot = endpoint.clone();
                Ok(())
            }
            None => Err(RegistryError::UnknownServer(endpoint.name.clone())),
        }
    }

    async fn delete(&self, txn: &TransactionId, name: &str) -> RegistryResult<()> {
        let mut state = self.state.lock().await;
        let txn = state.transaction(txn)?;
        let before = txn.working.len();
        txn.working.retain(|s| s.name != name);
        if txn.working.len() == before {
            return Err(RegistryError::UnknownServer(name.to_string()));
        }
        Ok(())
    }

    async fn commit(&self, txn: &TransactionId) -> RegistryResult<()> {
        let mut state = self.state.lock().await;
        let current = state.version;
        let base = state.transaction(txn)?.base_version;
        if base != current {
            return Err(RegistryError::Conflict(format!(
                "transaction {} based on version {}, registry is at {}",
                txn, base, current
            )));
        }
        if let Some(committed) = state.transactions.remove(&txn.0) {
            state.servers = committed.working;
            state.version += 1;
        }
        Ok(())
    }

    async fn discard(&self, txn: &TransactionId) -> RegistryResult<()> {
        self.state.lock().await.transactions.remove(&txn.0);
        Ok(())
    }
}
