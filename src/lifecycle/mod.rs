//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → process control → registry (with retry) → reconciler → scheduler
//!
//! Running (process.rs):
//!     Commit succeeded → reload load balancer
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → stop timers → drain in-flight cycles → exit
//! ```

pub mod process;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use process::{MasterWorkerProcess, NoReload, ProcessControl, ProcessError, ReloadCommand};
pub use shutdown::Shutdown;
pub use startup::{build, StartupError, Warden};
