//! Candidate discovery subsystem.
//!
//! # Data Flow
//! ```text
//! directory.rs: GET directory listing (JSON array)
//!     → candidate.rs: deserialize, keep the required protocol tag
//!     → reconciler diffs against the registry snapshot
//! ```
//!
//! # Design Decisions
//! - No retries here; the next discovery tick is the retry
//! - Non-matching protocols are dropped silently, not reported

pub mod candidate;
pub mod directory;

use async_trait::async_trait;
use thiserror::Error;

pub use candidate::{filter_by_protocol, Candidate};
pub use directory::DirectorySource;

/// The directory could not produce a listing.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("directory request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("directory answered with status {0}")]
    Status(u16),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Anything that can list candidate endpoints.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Candidates already filtered to the required protocol.
    async fn discover(&self) -> SourceResult<Vec<Candidate>>;
}
