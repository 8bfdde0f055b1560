//! Periodic triggers for the two cycles.
//!
//! One discovery pass runs before the timers start. Afterwards each fired
//! timer spawns a cycle; the reconciler's gate keeps them one at a time. A
//! tick is skipped while a cycle of the same kind is still queued or running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::ScheduleConfig;
use crate::reconcile::reconciler::{CycleKind, Reconciler};

/// Marks a cycle kind busy for as long as it lives.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag.clone()))
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives discovery and health cycles until shutdown.
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    discovery_every: Duration,
    health_every: Duration,
    discovery_busy: Arc<AtomicBool>,
    health_busy: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(reconciler: Arc<Reconciler>, discovery_every: Duration, health_every: Duration) -> Self {
        Self {
            reconciler,
            discovery_every,
            health_every,
            discovery_busy: Arc::new(AtomicBool::new(false)),
            health_busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(reconciler: Arc<Reconciler>, config: &ScheduleConfig) -> Self {
        Self::new(
            reconciler,
            Duration::from_secs(config.discovery_interval_secs),
            Duration::from_secs(config.health_interval_secs),
        )
    }

    /// Run until `shutdown` fires, then wait for in-flight cycles.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            discovery_secs = self.discovery_every.as_secs_f64(),
            health_secs = self.health_every.as_secs_f64(),
            "Scheduler starting"
        );

        self.reconciler.run_logged(CycleKind::Discovery).await;

        let start = Instant::now();
        let mut discovery = interval_at(start + self.discovery_every, self.discovery_every);
        let mut health = interval_at(start + self.health_every, self.health_every);
        discovery.set_missed_tick_behavior(MissedTickBehavior::Delay);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                _ = discovery.tick() => self.launch(&mut in_flight, CycleKind::Discovery),
                _ = health.tick() => self.launch(&mut in_flight, CycleKind::Health),
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Cycle task panicked");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        if !in_flight.is_empty() {
            tracing::info!(cycles = in_flight.len(), "Waiting for in-flight cycles");
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Cycle task panicked");
            }
        }
        tracing::info!("Scheduler stopped");
    }

    fn launch(&self, in_flight: &mut JoinSet<()>, kind: CycleKind) {
        let flag = match kind {
            CycleKind::Discovery => &self.discovery_busy,
            CycleKind::Health => &self.health_busy,
        };
        let Some(busy) = BusyGuard::acquire(flag) else {
            tracing::debug!(cycle = %kind, "Previous cycle still running, skipping tick");
            return;
        };

        let reconciler = self.reconciler.clone();
        in_flight.spawn(async move {
            let _busy = busy;
            reconciler.run_logged(kind).await;
        });
    }
}
