//! Infrastructure: configuration loading and logging setup for the binary.
//!
//! Neither submodule is reachable from [`crate::services::orchestrator::run`];
//! the binary loads configuration and logging here, then calls into the
//! library with plain domain types.

pub mod config_loader;
pub mod logging;

pub use config_loader::{AppConfig, ConfigLoader};
