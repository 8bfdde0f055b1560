//! pool-warden daemon entry point.

use std::path::PathBuf;

use clap::Parser;

use pool_warden::config::{load_config, WardenConfig};
use pool_warden::config::validation::validate_config;
use pool_warden::lifecycle::{self, signals, ProcessControl, Shutdown};
use pool_warden::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "pool-warden", version, about = "Keeps a SOCKS5 proxy pool healthy")]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "POOL_WARDEN_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let config = WardenConfig::default();
            if let Err(errors) = validate_config(&config) {
                for e in &errors {
                    eprintln!("{e}");
                }
                return Err("default configuration is invalid".into());
            }
            config
        }
    };

    if args.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!("pool-warden v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        directory = %config.directory.url,
        protocol = %config.directory.protocol,
        registry = %config.registry.url,
        backend = %config.registry.backend,
        discovery_secs = config.schedule.discovery_interval_secs,
        health_secs = config.schedule.health_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let warden = lifecycle::build(&config).await?;

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    let signal_task = signals::spawn_signal_handler(shutdown.clone());

    warden.scheduler.run(stop).await;
    signal_task.abort();

    if let Err(e) = warden.process.shutdown().await {
        tracing::error!(error = %e, "Failed to stop load balancer");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
