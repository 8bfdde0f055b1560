//! OS signal handling.
//!
//! SIGINT and SIGTERM both end the scheduler loop. In-flight cycles are
//! allowed to finish, so an open transaction is always committed or
//! discarded before exit.

use crate::lifecycle::shutdown::Shutdown;

/// Wait for SIGINT or SIGTERM.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM, only Ctrl-C will stop");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Cannot listen for Ctrl-C");
                }
                return;
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Cannot listen for Ctrl-C");
                }
                tracing::info!("Received SIGINT");
            }
            _ = term.recv() => tracing::info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl-C");
        }
        tracing::info!("Received Ctrl-C");
    }
}

/// Spawn a task that triggers `shutdown` on the first signal.
pub fn spawn_signal_handler(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    })
}
