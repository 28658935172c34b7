//! Background Tasks Module
//!
//! Timer-driven maintenance running for the lifetime of a session.
//!
//! # Tasks
//! - Memo cleanup: drops memoized results past the maximum age at a fixed interval

mod cleanup;

pub use cleanup::{cleanup_memo, spawn_cleanup_task};
