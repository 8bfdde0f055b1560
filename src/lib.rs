//! Pool Warden
//!
//! Keeps a load balancer's pool of upstream SOCKS5 proxies healthy.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌───────────────┐  candidates   ┌──────────────────────────────────────┐
//!   │   discovery   │──────────────▶│              reconcile               │
//!   │ (directory)   │               │                                      │
//!   └───────────────┘               │  scheduler ─▶ reconciler ─▶ commit   │
//!   ┌───────────────┐  outcomes     │                 │             │      │
//!   │     probe     │──────────────▶│        health (decision table)│      │
//!   │ (via SOCKS5)  │               └─────────────────┬─────────────┼──────┘
//!   └───────────────┘                                 │             │
//!                                          snapshot / txn       reload
//!                                                     ▼             ▼
//!                                             ┌────────────┐  ┌───────────┐
//!                                             │  registry  │  │ lifecycle │
//!                                             │ (Data Plane│  │ (process) │
//!                                             │  or memory)│  └───────────┘
//!                                             └────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod discovery;
pub mod probe;
pub mod registry;

// Decision making
pub mod health;
pub mod reconcile;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::WardenConfig;
pub use lifecycle::Shutdown;
pub use reconcile::{Reconciler, Scheduler};
