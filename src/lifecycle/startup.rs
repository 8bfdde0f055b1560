//! Startup orchestration.
//!
//! # Responsibilities
//! - Start or attach to the load balancer process
//! - Reach the registry, retrying with backoff
//! - Build the source, prober and reconciler from configuration
//!
//! # Design Decisions
//! - Fail fast: a registry that never answers is fatal
//! - The process starts before the registry check, since the Data Plane API
//!   usually runs alongside the load balancer
//! - A load balancer started here is stopped again if startup fails

use std::sync::Arc;

use thiserror::Error;

use crate::config::{RegistryKind, ReloadMode, WardenConfig};
use crate::discovery::{CandidateSource, DirectorySource, SourceError};
use crate::health::HealthPolicy;
use crate::lifecycle::process::{
    MasterWorkerProcess, NoReload, ProcessControl, ProcessError, ReloadCommand,
};
use crate::probe::{HttpProber, ProbeError, Prober};
use crate::registry::{
    DataPlaneRegistry, MemoryRegistry, RandomNameGenerator, Registry, RegistryError,
};
use crate::reconcile::{Reconciler, Scheduler};
use crate::resilience::{retry, Backoff};

/// Errors that stop the controller from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("registry unavailable: {0}")]
    Registry(#[from] RegistryError),

    #[error("candidate source setup failed: {0}")]
    Source(#[from] SourceError),

    #[error("prober setup failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("load balancer process: {0}")]
    Process(#[from] ProcessError),

    #[error("reload command is empty")]
    EmptyReloadCommand,
}

/// Everything the controller needs to run.
pub struct Warden {
    pub registry: Arc<dyn Registry>,
    /// Stopped by the caller once the scheduler returns.
    pub process: Arc<dyn ProcessControl>,
    pub reconciler: Arc<Reconciler>,
    pub scheduler: Scheduler,
}

/// Build the process control selected by `process.mode`.
pub fn process_control(config: &WardenConfig) -> Result<Arc<dyn ProcessControl>, StartupError> {
    let process = &config.process;
    let control: Arc<dyn ProcessControl> = match process.mode {
        ReloadMode::MasterWorker => Arc::new(MasterWorkerProcess::spawn(
            &process.binary,
            &process.config_file,
        )?),
        ReloadMode::Command => Arc::new(
            ReloadCommand::new(&process.reload_command).ok_or(StartupError::EmptyReloadCommand)?,
        ),
        ReloadMode::None => Arc::new(NoReload),
    };
    Ok(control)
}

/// Build the registry and wait until it answers a snapshot.
pub async fn connect_registry(
    config: &WardenConfig,
    backoff: Backoff,
) -> Result<Arc<dyn Registry>, StartupError> {
    let registry: Arc<dyn Registry> = match config.registry.kind {
        RegistryKind::Dataplane => Arc::new(DataPlaneRegistry::new(&config.registry)?),
        RegistryKind::Memory => Arc::new(MemoryRegistry::new()),
    };

    let snapshot = retry("registry", config.registry.startup_attempts, backoff, || {
        registry.snapshot()
    })
    .await?;

    tracing::info!(
        kind = ?config.registry.kind,
        version = snapshot.version,
        endpoints = snapshot.endpoints.len(),
        "Registry reachable"
    );
    Ok(registry)
}

/// Assemble the controller from validated configuration.
pub async fn build(config: &WardenConfig) -> Result<Warden, StartupError> {
    build_with(config, Backoff::default()).await
}

/// [`build`] with an explicit registry retry schedule.
pub async fn build_with(config: &WardenConfig, backoff: Backoff) -> Result<Warden, StartupError> {
    let source: Arc<dyn CandidateSource> = Arc::new(DirectorySource::new(&config.directory)?);
    let prober: Arc<dyn Prober> = Arc::new(HttpProber::from_config(&config.probe)?);

    let process = process_control(config)?;
    let registry = match connect_registry(config, backoff).await {
        Ok(registry) => registry,
        Err(e) => {
            if let Err(stop) = process.shutdown().await {
                tracing::warn!(error = %stop, "Failed to stop load balancer after startup error");
            }
            return Err(e);
        }
    };

    let reconciler = Arc::new(
        Reconciler::new(
            registry.clone(),
            source,
            prober,
            process.clone(),
            Arc::new(RandomNameGenerator),
        )
        .with_policy(HealthPolicy::from(&config.health))
        .with_max_concurrency(config.probe.max_concurrency),
    );
    let scheduler = Scheduler::from_config(reconciler.clone(), &config.schedule);

    Ok(Warden {
        registry,
        process,
        reconciler,
        scheduler,
    })
}
