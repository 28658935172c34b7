//! Timing Module
//!
//! Rate limiting wrappers for event handlers.
//!
//! - `Debounced`: runs once a quiet period follows the last trigger
//! - `Throttled`: runs at most once per interval

mod debounce;
mod throttle;

pub use debounce::Debounced;
pub use throttle::Throttled;

// == Public Constants ==
/// Default debounce and throttle wait (ms)
pub const DEFAULT_WAIT_MS: u64 = 300;
