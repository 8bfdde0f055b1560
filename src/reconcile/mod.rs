//! Reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! scheduler.rs: timer fires
//!     → reconciler.rs: snapshot registry (one versioned read)
//!         discovery: CandidateSource → plan_discovery
//!         health:    Prober fan-out → join → plan_health
//!     → commit.rs: one transaction, commit, discard, reload
//! ```
//!
//! # Design Decisions
//! - Nothing is cached between cycles; every pass starts from the registry
//! - A whole batch commits or nothing does
//! - A conflicting or failed cycle is dropped; the next tick recomputes
//! - Only one cycle talks to the registry at a time

pub mod commit;
pub mod plan;
pub mod reconciler;
pub mod scheduler;

pub use commit::{CommitCoordinator, CommitError, CommitOutcome};
pub use plan::{plan_discovery, plan_health};
pub use reconciler::{CycleKind, CycleReport, ReconcileError, Reconciler};
pub use scheduler::Scheduler;
