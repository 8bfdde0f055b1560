//! Health decision subsystem.
//!
//! # Data Flow
//! ```text
//! (maintenance flag, ProbeOutcome)
//!     → state.rs (decision table)
//!     → Action: none | suspend | resume | remove
//! ```
//!
//! # Design Decisions
//! - Two strikes: suspend on the first bad probe, remove on the second
//! - A suspended endpoint with a good probe is resumed immediately
//! - Pure; no I/O, no clocks, no counters

pub mod state;

pub use state::{decide, Action, Decision, HealthPolicy, LifecycleState};
