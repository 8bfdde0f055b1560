//! End-to-end cycles against the in-memory registry with scripted collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use pool_warden::discovery::{Candidate, CandidateSource, SourceError, SourceResult};
use pool_warden::lifecycle::process::{ProcessControl, ProcessResult};
use pool_warden::lifecycle::Shutdown;
use pool_warden::probe::{FailureKind, ProbeOutcome, ProbeResult, Prober};
use pool_warden::reconcile::{CommitOutcome, CycleKind, Reconciler, Scheduler};
use pool_warden::registry::{IdGenerator, MemoryRegistry, RegisteredEndpoint};

/// Candidates served from a list that tests can swap.
#[derive(Default)]
struct ScriptedSource {
    candidates: Mutex<Option<Vec<Candidate>>>,
}

impl ScriptedSource {
    fn serving(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: Mutex::new(Some(candidates)),
        }
    }
}

#[async_trait]
impl CandidateSource for ScriptedSource {
    async fn discover(&self) -> SourceResult<Vec<Candidate>> {
        self.candidates
            .lock()
            .unwrap()
            .clone()
            .ok_or(SourceError::Status(503))
    }
}

/// Outcomes keyed by address; unknown addresses are healthy.
#[derive(Default)]
struct ScriptedProber {
    outcomes: Mutex<HashMap<String, ProbeOutcome>>,
    bump: Option<Arc<MemoryRegistry>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedProber {
    fn set(&self, address: &str, outcome: ProbeOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(address.to_string(), outcome);
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, endpoint: &RegisteredEndpoint) -> ProbeResult<ProbeOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(registry) = &self.bump {
            registry.touch().await;
        }
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get(&endpoint.address)
            .copied()
            .unwrap_or(ProbeOutcome::completed(200, Duration::from_millis(50)));
        Ok(outcome)
    }
}

#[derive(Default)]
struct CountingReload(AtomicUsize);

impl CountingReload {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessControl for CountingReload {
    async fn reload(&self) -> ProcessResult<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct SequentialIds(AtomicUsize);

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        format!("srv-{}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}

fn candidate(host: &str, port: u16, protocol: &str) -> Candidate {
    Candidate {
        host: host.to_string(),
        port,
        protocol: protocol.to_string(),
        iso_code: "DE".to_string(),
        country: "Germany".to_string(),
        latency_ms: 40,
        loss_ratio: 0.0,
    }
}

struct Harness {
    registry: Arc<MemoryRegistry>,
    source: Arc<ScriptedSource>,
    prober: Arc<ScriptedProber>,
    reload: Arc<CountingReload>,
    reconciler: Arc<Reconciler>,
}

fn harness(registry: MemoryRegistry, source: ScriptedSource, prober: ScriptedProber) -> Harness {
    let registry = Arc::new(registry);
    let source = Arc::new(source);
    let prober = Arc::new(prober);
    let reload = Arc::new(CountingReload::default());
    let reconciler = Arc::new(Reconciler::new(
        registry.clone(),
        source.clone(),
        prober.clone(),
        reload.clone(),
        Arc::new(SequentialIds::default()),
    ));
    Harness {
        registry,
        source,
        prober,
        reload,
        reconciler,
    }
}

fn active(name: &str, address: &str) -> RegisteredEndpoint {
    RegisteredEndpoint::new_suspended(name, address, 1080).with_suspended(false)
}

#[tokio::test]
async fn test_failing_endpoint_is_suspended_then_removed() {
    let h = harness(
        MemoryRegistry::with_endpoints(vec![active("e", "10.0.0.1")]),
        ScriptedSource::default(),
        ScriptedProber::default(),
    );
    h.prober
        .set("10.0.0.1", ProbeOutcome::Failed(FailureKind::Timeout));

    h.reconciler.run_cycle(CycleKind::Health).await.unwrap();
    let endpoints = h.registry.endpoints().await;
    assert_eq!(endpoints.len(), 1);
    assert!(endpoints[0].is_suspended());

    h.reconciler.run_cycle(CycleKind::Health).await.unwrap();
    assert!(h.registry.endpoints().await.is_empty());
    assert_eq!(h.reload.count(), 2);
}

#[tokio::test]
async fn test_discovered_candidate_joins_suspended_then_resumes() {
    let h = harness(
        MemoryRegistry::new(),
        ScriptedSource::serving(vec![candidate("1.2.3.4", 1080, "SOCKS5")]),
        ScriptedProber::default(),
    );

    let report = h.reconciler.run_cycle(CycleKind::Discovery).await.unwrap();
    assert_eq!(
        report.outcome,
        CommitOutcome::Applied {
            mutations: 1,
            reloaded: true
        }
    );
    let endpoints = h.registry.endpoints().await;
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].name, "srv-0");
    assert_eq!(endpoints[0].address, "1.2.3.4");
    assert!(endpoints[0].is_suspended());

    h.prober
        .set("1.2.3.4", ProbeOutcome::completed(200, Duration::from_secs(2)));
    h.reconciler.run_cycle(CycleKind::Health).await.unwrap();
    assert!(!h.registry.endpoints().await[0].is_suspended());
}

#[tokio::test]
async fn test_wrong_protocol_stages_nothing() {
    let h = harness(
        MemoryRegistry::new(),
        ScriptedSource::serving(vec![candidate("1.2.3.4", 1080, "HTTP")]),
        ScriptedProber::default(),
    );
    let source: &dyn CandidateSource = h.source.as_ref();
    // The scripted source does not filter; the directory adapter does.
    let listed = pool_warden::discovery::filter_by_protocol(source.discover().await.unwrap(), "SOCKS5");
    assert!(listed.is_empty());

    *h.source.candidates.lock().unwrap() = Some(listed);
    let report = h.reconciler.run_cycle(CycleKind::Discovery).await.unwrap();
    assert_eq!(report.outcome, CommitOutcome::Skipped);
    assert_eq!(h.reload.count(), 0);
    assert_eq!(h.registry.version().await, 1);
}

#[tokio::test]
async fn test_known_candidate_is_not_created_again() {
    let h = harness(
        MemoryRegistry::with_endpoints(vec![active("existing", "1.2.3.4")]),
        ScriptedSource::serving(vec![
            candidate("1.2.3.4", 1080, "SOCKS5"),
            candidate("5.6.7.8", 1080, "SOCKS5"),
            candidate("5.6.7.8", 1080, "SOCKS5"),
        ]),
        ScriptedProber::default(),
    );

    h.reconciler.run_cycle(CycleKind::Discovery).await.unwrap();
    let endpoints = h.registry.endpoints().await;
    assert_eq!(endpoints.len(), 2);

    // Same listing again changes nothing.
    let report = h.reconciler.run_cycle(CycleKind::Discovery).await.unwrap();
    assert_eq!(report.outcome, CommitOutcome::Skipped);
    assert_eq!(h.reload.count(), 1);
}

#[tokio::test]
async fn test_healthy_pool_never_reloads() {
    let h = harness(
        MemoryRegistry::with_endpoints(vec![active("a", "10.0.0.1"), active("b", "10.0.0.2")]),
        ScriptedSource::default(),
        ScriptedProber::default(),
    );

    for _ in 0..3 {
        let report = h.reconciler.run_cycle(CycleKind::Health).await.unwrap();
        assert_eq!(report.outcome, CommitOutcome::Skipped);
    }
    assert_eq!(h.reload.count(), 0);
}

#[tokio::test]
async fn test_batch_reloads_exactly_once() {
    let h = harness(
        MemoryRegistry::with_endpoints(vec![
            active("a", "10.0.0.1"),
            active("b", "10.0.0.2"),
            active("c", "10.0.0.3"),
        ]),
        ScriptedSource::default(),
        ScriptedProber::default(),
    );
    h.prober
        .set("10.0.0.1", ProbeOutcome::Failed(FailureKind::Transport));
    h.prober
        .set("10.0.0.2", ProbeOutcome::completed(500, Duration::from_millis(10)));

    let report = h.reconciler.run_cycle(CycleKind::Health).await.unwrap();
    assert_eq!(
        report.outcome,
        CommitOutcome::Applied {
            mutations: 2,
            reloaded: true
        }
    );
    assert_eq!(h.reload.count(), 1);
}

#[tokio::test]
async fn test_version_change_mid_cycle_applies_nothing() {
    let registry = Arc::new(MemoryRegistry::with_endpoints(vec![active("a", "10.0.0.1")]));
    let prober = ScriptedProber {
        bump: Some(registry.clone()),
        ..ScriptedProber::default()
    };
    prober.set("10.0.0.1", ProbeOutcome::Failed(FailureKind::Timeout));
    let reload = Arc::new(CountingReload::default());
    let reconciler = Reconciler::new(
        registry.clone(),
        Arc::new(ScriptedSource::default()),
        Arc::new(prober),
        reload.clone(),
        Arc::new(SequentialIds::default()),
    );

    let err = reconciler.run_cycle(CycleKind::Health).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(!registry.endpoints().await[0].is_suspended());
    assert_eq!(registry.open_transactions().await, 0);
    assert_eq!(reload.count(), 0);
}

#[tokio::test]
async fn test_unavailable_source_aborts_discovery_only() {
    let h = harness(
        MemoryRegistry::with_endpoints(vec![active("a", "10.0.0.1")]),
        ScriptedSource::default(),
        ScriptedProber::default(),
    );

    assert!(h.reconciler.run_cycle(CycleKind::Discovery).await.is_err());
    h.prober
        .set("10.0.0.1", ProbeOutcome::Failed(FailureKind::Timeout));
    h.reconciler.run_cycle(CycleKind::Health).await.unwrap();
    assert!(h.registry.endpoints().await[0].is_suspended());
}

async fn stop_scheduler(shutdown: Shutdown, task: tokio::task::JoinHandle<()>) {
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_scheduler_discovers_before_first_tick() {
    let h = harness(
        MemoryRegistry::new(),
        ScriptedSource::serving(vec![candidate("1.2.3.4", 1080, "SOCKS5")]),
        ScriptedProber::default(),
    );
    let scheduler = Scheduler::new(
        h.reconciler.clone(),
        Duration::from_secs(10),
        Duration::from_secs(5),
    );

    let shutdown = Shutdown::new();
    let task = tokio::spawn(scheduler.run(shutdown.subscribe()));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let endpoints = h.registry.endpoints().await;
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].address, "1.2.3.4");
    assert!(endpoints[0].is_suspended());

    stop_scheduler(shutdown, task).await;
    assert_eq!(h.reload.count(), 1);
}

#[tokio::test]
async fn test_scheduler_resumes_discovered_servers() {
    let h = harness(
        MemoryRegistry::new(),
        ScriptedSource::serving(vec![
            candidate("1.2.3.4", 1080, "SOCKS5"),
            candidate("1.2.3.5", 1080, "SOCKS5"),
        ]),
        ScriptedProber::default(),
    );
    let scheduler = Scheduler::new(
        h.reconciler.clone(),
        Duration::from_secs(10),
        Duration::from_millis(20),
    );

    let shutdown = Shutdown::new();
    let task = tokio::spawn(scheduler.run(shutdown.subscribe()));
    tokio::time::sleep(Duration::from_millis(300)).await;
    stop_scheduler(shutdown, task).await;

    let endpoints = h.registry.endpoints().await;
    assert_eq!(endpoints.len(), 2);
    assert!(endpoints.iter().all(|e| !e.is_suspended()));
    // One create batch plus one resume batch.
    assert_eq!(h.reload.count(), 2);
}

#[tokio::test]
async fn test_scheduler_skips_ticks_and_drains_on_shutdown() {
    let prober = ScriptedProber {
        delay: Duration::from_millis(250),
        ..ScriptedProber::default()
    };
    prober.set("10.0.0.1", ProbeOutcome::Failed(FailureKind::Timeout));
    let h = harness(
        MemoryRegistry::with_endpoints(vec![active("a", "10.0.0.1")]),
        ScriptedSource::default(),
        prober,
    );
    let scheduler = Scheduler::new(
        h.reconciler.clone(),
        Duration::from_secs(10),
        Duration::from_millis(20),
    );

    let shutdown = Shutdown::new();
    let task = tokio::spawn(scheduler.run(shutdown.subscribe()));
    // Several health ticks fire while the first cycle is still probing.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.prober.calls.load(Ordering::SeqCst), 1);
    assert!(!h.registry.endpoints().await[0].is_suspended());

    stop_scheduler(shutdown, task).await;

    // The in-flight cycle finished and committed after shutdown was requested.
    assert!(h.registry.endpoints().await[0].is_suspended());
    assert_eq!(h.registry.open_transactions().await, 0);
    assert_eq!(h.reload.count(), 1);
    // Skipped ticks never queued extra cycles.
    assert_eq!(h.prober.calls.load(Ordering::SeqCst), 1);
}
