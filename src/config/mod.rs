//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WardenConfig (validated, immutable)
//!     → handed to startup, split per subsystem
//! ```
//!
//! # Design Decisions
//! - Config is fixed for the lifetime of the process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DirectoryConfig, HealthConfig, LogFormat, ObservabilityConfig, ProbeConfig, ProcessConfig,
    RegistryConfig, RegistryKind, ReloadMode, ScheduleConfig, WardenConfig,
};
