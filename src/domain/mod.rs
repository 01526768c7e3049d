//! Domain layer: types and error taxonomy for the verification engine.
//!
//! Nothing in this module touches the filesystem or spawns a process --
//! that is the job of [`crate::services`].

pub mod error;
pub mod models;
pub mod ports;

pub use error::{CacheIoError, EngineError, FingerprintError, PlanError, RemoteBackendError};
pub use models::{
    builtin_task, CacheState, CheckConfig, Dag, EngineConfig, OverallStatus, RequiredPassBar,
    RunReport, Task, TaskResult, BUILTIN_CHECK_IDS,
};
pub use ports::{NullRemoteBackend, RemoteCacheBackend};
