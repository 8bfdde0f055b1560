//! Endpoint probing subsystem.
//!
//! # Data Flow
//! ```text
//! Registered endpoint
//!     → http.rs (GET target URL with the endpoint as forward proxy)
//!     → ProbeOutcome (Failed | Completed{status, elapsed})
//!     → health::decide
//! ```
//!
//! # Design Decisions
//! - Timeouts and transport errors are outcomes, not errors
//! - Only a probe that cannot be built is an error
//! - Every probe uses a fresh connection; nothing is pooled across endpoints

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::registry::RegisteredEndpoint;

pub use http::{probe, HttpProber, ProbeTimeouts};

/// Duration recorded for probes that never completed. Always over any
/// sensible health threshold.
pub const FAILED_PROBE_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Why a probe produced no HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Transport,
}

/// Result of one health check against one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Failed(FailureKind),
    Completed { status: u16, elapsed: Duration },
}

impl ProbeOutcome {
    pub fn completed(status: u16, elapsed: Duration) -> Self {
        ProbeOutcome::Completed { status, elapsed }
    }

    /// Wall-clock duration, or the sentinel for failed probes.
    pub fn elapsed(&self) -> Duration {
        match self {
            ProbeOutcome::Failed(_) => FAILED_PROBE_DURATION,
            ProbeOutcome::Completed { elapsed, .. } => *elapsed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Failed(FailureKind::Timeout) => "timeout",
            ProbeOutcome::Failed(FailureKind::Transport) => "transport_error",
            ProbeOutcome::Completed { .. } => "completed",
        }
    }
}

/// A probe could not be constructed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid endpoint address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("invalid probe target: {0}")]
    InvalidTarget(#[from] url::ParseError),

    #[error("failed to build probe client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Checks one endpoint.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, endpoint: &RegisteredEndpoint) -> ProbeResult<ProbeOutcome>;
}
