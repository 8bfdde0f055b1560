//! Resilience helpers.
//!
//! # Design Decisions
//! - Retries belong to startup only; a failed cycle is simply dropped and
//!   the next tick recomputes from fresh state
//! - Jitter keeps several controllers from hammering the registry in step

pub mod backoff;

pub use backoff::{retry, Backoff};
