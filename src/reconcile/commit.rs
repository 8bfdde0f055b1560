//! Transactional application of a mutation batch.
//!
//! # Responsibilities
//! - Open one transaction at the batch's snapshot version
//! - Stage every mutation, then commit
//! - Always discard the transaction afterwards
//! - Reload the load balancer after a non-empty commit

use std::sync::Arc;

use thiserror::Error;

use crate::lifecycle::process::ProcessControl;
use crate::observability::metrics;
use crate::registry::{MutationBatch, Registry, RegistryError, RegistryResult, TransactionId};

/// Why a batch was not applied. Nothing from the batch is visible in either case.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The registry moved on after the snapshot.
    #[error("registry conflict: {0}")]
    Conflict(#[source] RegistryError),

    #[error("transaction failed: {0}")]
    Transaction(#[source] RegistryError),
}

impl From<RegistryError> for CommitError {
    fn from(err: RegistryError) -> Self {
        if err.is_conflict() {
            CommitError::Conflict(err)
        } else {
            CommitError::Transaction(err)
        }
    }
}

/// What happened to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Empty batch; no transaction opened, no reload.
    Skipped,
    /// Batch committed. `reloaded` is false when the reload signal failed.
    Applied { mutations: usize, reloaded: bool },
}

/// Open transaction that must be released.
///
/// `release` discards it explicitly. If the guard is dropped without being
/// released (a cancelled cycle), the discard is spawned onto the runtime.
struct TransactionGuard {
    registry: Arc<dyn Registry>,
    id: TransactionId,
    released: bool,
}

impl TransactionGuard {
    async fn open(registry: Arc<dyn Registry>, version: u64) -> RegistryResult<Self> {
        let id = registry.begin(version).await?;
        tracing::debug!(tid = %id, version, "Started transaction");
        Ok(Self {
            registry,
            id,
            released: false,
        })
    }

    async fn release(mut self) {
        self.released = true;
        tracing::debug!(tid = %self.id, "Deleting transaction");
        if let Err(e) = self.registry.discard(&self.id).await {
            tracing::warn!(tid = %self.id, error = %e, "Failed to delete transaction");
        }
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let registry = self.registry.clone();
        let id = self.id.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = registry.discard(&id).await {
                    tracing::warn!(tid = %id, error = %e, "Failed to delete abandoned transaction");
                }
            });
        }
    }
}

/// Applies batches and triggers reloads.
pub struct CommitCoordinator {
    registry: Arc<dyn Registry>,
    process: Arc<dyn ProcessControl>,
}

impl CommitCoordinator {
    pub fn new(registry: Arc<dyn Registry>, process: Arc<dyn ProcessControl>) -> Self {
        Self { registry, process }
    }

    /// Apply `batch` atomically and reload on success.
    pub async fn commit(&self, batch: &MutationBatch) -> Result<CommitOutcome, CommitError> {
        if batch.is_empty() {
            tracing::debug!(version = batch.version, "Nothing to commit");
            return Ok(CommitOutcome::Skipped);
        }

        let guard = TransactionGuard::open(self.registry.clone(), batch.version).await?;
        let result = self.stage_and_commit(&guard.id, batch).await;
        guard.release().await;
        result?;

        for mutation in &batch.mutations {
            metrics::record_mutation(mutation.kind());
        }
        tracing::info!(version = batch.version, mutations = batch.len(), "Committed registry changes");

        let reloaded = match self.process.reload().await {
            Ok(()) => {
                tracing::debug!("Reloaded load balancer");
                metrics::record_reload(true);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Reload failed; committed changes stand");
                metrics::record_reload(false);
                false
            }
        };

        Ok(CommitOutcome::Applied {
            mutations: batch.len(),
            reloaded,
        })
    }

    async fn stage_and_commit(&self, txn: &TransactionId, batch: &MutationBatch) -> RegistryResult<()> {
        for mutation in &batch.mutations {
            tracing::debug!(tid = %txn, kind = mutation.kind(), name = mutation.name(), "Staging mutation");
            self.registry.apply(txn, mutation).await?;
        }
        self.registry.commit(txn).await?;
        tracing::debug!(tid = %txn, "Committed transaction");
        Ok(())
    }
}
