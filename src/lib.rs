//! firsttry: a local code-quality gate orchestrator with a
//! content-addressed verification cache.
//!
//! The public entry point is [`engine::run`], which plans a task graph
//! from an [`domain::models::EngineConfig`], fingerprints the repository,
//! and either returns a cached [`domain::models::RunReport`] or executes
//! the graph and produces a fresh one.

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

/// Stable, flat entry point mirroring how this crate is described
/// elsewhere: fingerprinting, caching, planning, and execution as
/// sub-modules of one `engine`.
pub mod engine {
    pub use crate::services::executor;
    pub use crate::services::fingerprint;
    pub use crate::services::orchestrator;
    pub use crate::services::orchestrator::{run, RunOpts};
    pub use crate::services::planner;
    pub use crate::services::versions;

    /// The two-level cache: per-task results plus the whole-run green cache.
    pub mod cache {
        pub use crate::domain::ports::remote_cache as remote;
        pub use crate::services::state_store;
        pub use crate::services::task_cache;
    }
}

pub use domain::models::{
    CacheState, EngineConfig, OverallStatus, RequiredPassBar, RunReport, Task, TaskResult,
};
pub use engine::{run, RunOpts};
