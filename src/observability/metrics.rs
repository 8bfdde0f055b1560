//! Metrics collection and exposition.
//!
//! # Metrics
//! - `warden_cycles_total` (counter): cycles by kind and result
//! - `warden_probes_total` (counter): probe outcomes
//! - `warden_probe_duration_seconds` (histogram): completed probe latency
//! - `warden_mutations_total` (counter): committed mutations by kind
//! - `warden_reloads_total` (counter): reload attempts by result
//! - `warden_registry_servers` (gauge): servers seen in the last snapshot
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests never need to call `init_metrics`.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::probe::ProbeOutcome;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_cycle(kind: &'static str, result: &'static str) {
    metrics::counter!("warden_cycles_total", "kind" => kind, "result" => result).increment(1);
}

pub fn record_probe(outcome: &ProbeOutcome) {
    metrics::counter!("warden_probes_total", "outcome" => outcome.label()).increment(1);
    if let ProbeOutcome::Completed { elapsed, .. } = outcome {
        metrics::histogram!("warden_probe_duration_seconds").record(elapsed.as_secs_f64());
    }
}

pub fn record_mutation(kind: &'static str) {
    metrics::counter!("warden_mutations_total", "kind" => kind).increment(1);
}

pub fn record_reload(success: bool) {
    let result = if success { "ok" } else { "error" };
    metrics::counter!("warden_reloads_total", "result" => result).increment(1);
}

pub fn record_registry_size(servers: usize) {
    metrics::gauge!("warden_registry_servers").set(servers as f64);
}
