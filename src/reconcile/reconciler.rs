//! Discovery and health-check cycles.
//!
//! # Responsibilities
//! - Take one versioned snapshot per cycle
//! - Discovery: stage creates for unseen candidates
//! - Health: probe every server concurrently, wait for all, fold outcomes
//! - Hand the batch to the commit coordinator
//! - Serialize cycles so only one transaction is in flight

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tracing::Instrument;

use crate::discovery::{CandidateSource, SourceError};
use crate::health::HealthPolicy;
use crate::lifecycle::process::ProcessControl;
use crate::observability::metrics;
use crate::probe::{ProbeOutcome, Prober};
use crate::reconcile::commit::{CommitCoordinator, CommitError, CommitOutcome};
use crate::reconcile::plan::{plan_discovery, plan_health};
use crate::registry::{
    IdGenerator, Mutation, MutationBatch, RegisteredEndpoint, Registry, RegistryError, Snapshot,
};

/// The two kinds of reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleKind {
    Discovery,
    Health,
}

impl CycleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleKind::Discovery => "discovery",
            CycleKind::Health => "health",
        }
    }
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a cycle. None of them are fatal to the controller.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("candidate source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    #[error("failed to read registry: {0}")]
    Snapshot(#[source] RegistryError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

impl ReconcileError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::Commit(CommitError::Conflict(_)))
    }
}

/// Summary of a finished cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub kind: CycleKind,
    /// Snapshot version the batch was computed against.
    pub version: u64,
    pub outcome: CommitOutcome,
}

/// Drives cycles against one registry.
pub struct Reconciler {
    registry: Arc<dyn Registry>,
    source: Arc<dyn CandidateSource>,
    prober: Arc<dyn Prober>,
    ids: Arc<dyn IdGenerator>,
    coordinator: CommitCoordinator,
    policy: HealthPolicy,
    max_concurrency: Option<usize>,
    gate: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        registry: Arc<dyn Registry>,
        source: Arc<dyn CandidateSource>,
        prober: Arc<dyn Prober>,
        process: Arc<dyn ProcessControl>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            coordinator: CommitCoordinator::new(registry.clone(), process),
            registry,
            source,
            prober,
            ids,
            policy: HealthPolicy::default(),
            max_concurrency: None,
            gate: Mutex::new(()),
        }
    }

    pub fn with_policy(mut self, policy: HealthPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cap concurrent probes per health cycle. `None` probes everything at once.
    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit.filter(|n| *n > 0);
        self
    }

    /// Run one cycle. Waits for any other cycle to finish first.
    pub async fn run_cycle(&self, kind: CycleKind) -> Result<CycleReport, ReconcileError> {
        let _serialized = self.gate.lock().await;
        match kind {
            CycleKind::Discovery => self.discovery_cycle().await,
            CycleKind::Health => self.health_cycle().await,
        }
    }

    /// Run one cycle and log the result instead of returning it.
    pub async fn run_logged(&self, kind: CycleKind) {
        match self.run_cycle(kind).await {
            Ok(report) => {
                let result = match report.outcome {
                    CommitOutcome::Skipped => "unchanged",
                    CommitOutcome::Applied { .. } => "applied",
                };
                metrics::record_cycle(kind.as_str(), result);
                tracing::debug!(cycle = %kind, version = report.version, outcome = ?report.outcome, "Cycle finished");
            }
            Err(e) if e.is_conflict() => {
                metrics::record_cycle(kind.as_str(), "conflict");
                tracing::warn!(cycle = %kind, error = %e, "Registry changed underneath cycle; retrying next tick");
            }
            Err(e) => {
                metrics::record_cycle(kind.as_str(), "error");
                tracing::error!(cycle = %kind, error = %e, "Cycle failed");
            }
        }
    }

    async fn snapshot(&self) -> Result<Snapshot, ReconcileError> {
        let snapshot = self.registry.snapshot().await.map_err(ReconcileError::Snapshot)?;
        metrics::record_registry_size(snapshot.endpoints.len());
        Ok(snapshot)
    }

    async fn discovery_cycle(&self) -> Result<CycleReport, ReconcileError> {
        tracing::info!("Checking for new proxies");
        let snapshot = self.snapshot().await?;
        let candidates = self.source.discover().await?;
        let mutations = plan_discovery(&snapshot, &candidates, self.ids.as_ref());

        for mutation in &mutations {
            if let Mutation::Create(endpoint) = mutation {
                tracing::info!(
                    name = %endpoint.name,
                    address = %endpoint.address,
                    port = endpoint.port,
                    "Adding server to load balancer"
                );
            }
        }

        self.finish(CycleKind::Discovery, snapshot.version, mutations).await
    }

    async fn health_cycle(&self) -> Result<CycleReport, ReconcileError> {
        tracing::debug!("Checking current proxies");
        let snapshot = self.snapshot().await?;
        let outcomes = self.probe_all(&snapshot.endpoints).await;
        let mutations = plan_health(&snapshot, &outcomes, &self.policy);

        for mutation in &mutations {
            tracing::info!(kind = mutation.kind(), name = mutation.name(), "Health decision");
        }

        self.finish(CycleKind::Health, snapshot.version, mutations).await
    }

    async fn finish(
        &self,
        kind: CycleKind,
        version: u64,
        mutations: Vec<Mutation>,
    ) -> Result<CycleReport, ReconcileError> {
        let batch = MutationBatch::new(version, mutations);
        let outcome = self.coordinator.commit(&batch).await?;
        Ok(CycleReport {
            kind,
            version,
            outcome,
        })
    }

    /// Probe every endpoint and wait for all of them.
    ///
    /// Each probe runs as its own task and writes into a shared map; nothing
    /// is read from the map until every task has returned. Endpoints whose
    /// probe could not be built are absent from the result.
    async fn probe_all(&self, endpoints: &[RegisteredEndpoint]) -> HashMap<String, ProbeOutcome> {
        let results: Arc<DashMap<String, ProbeOutcome>> = Arc::new(DashMap::new());
        let limiter = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));

        let tasks: Vec<_> = endpoints
            .iter()
            .cloned()
            .map(|endpoint| {
                let prober = self.prober.clone();
                let results = results.clone();
                let limiter = limiter.clone();
                let span = tracing::debug_span!("probe", name = %endpoint.name);

                tokio::spawn(
                    async move {
                        let _permit = match limiter {
                            Some(semaphore) => semaphore.acquire_owned().await.ok(),
                            None => None,
                        };
                        tracing::debug!(address = %endpoint.address, port = endpoint.port, "Examining server");

                        match prober.probe(&endpoint).await {
                            Ok(outcome) => {
                                tracing::debug!(outcome = ?outcome, "Probe finished");
                                metrics::record_probe(&outcome);
                                results.insert(endpoint.name, outcome);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Could not probe server");
                            }
                        }
                    }
                    .instrument(span),
                )
            })
            .collect();

        for joined in join_all(tasks).await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Probe task panicked");
            }
        }

        results
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}
