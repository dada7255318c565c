//! Tracking runtime (internal)
//!
//! This module holds the state machine, the listener shell that drives it,
//! the unload timer and the diagnostics registry of active listeners.
//!
//! **Note**: `machine` and `registry` are exposed for integration testing and
//! diagnostics. Prefer the re-exports at the crate root in user code.

pub mod listener;
#[doc(hidden)]
pub mod machine;
pub mod registry;
pub mod timer;
