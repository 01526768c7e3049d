//! Trait seams the engine depends on but does not implement inline.

pub mod remote_cache;

pub use remote_cache::{NullRemoteBackend, RemoteCacheBackend};
