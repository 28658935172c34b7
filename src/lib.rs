//! Pilot Cache - Write-coalescing cache utilities for a portfolio tracker session
//!
//! Provides an element handle cache, a batched storage write queue and a TTL
//! memoizer, all owned by an explicit `CacheContext` and driven by a pluggable
//! scheduler.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod tasks;
pub mod timing;

pub use config::Config;
pub use context::CacheContext;
pub use error::{CacheError, Result};
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle, TokioScheduler};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageExt};
