// Public API types module
//
// Options accepted by the listener and the facade. They provide builder
// methods and serde support so they can travel inside protocol commands.

pub mod tracking_options;

pub use tracking_options::{DEFAULT_UNLOAD_TIMEOUT_MS, TrackingConfig, WaitOptions};
