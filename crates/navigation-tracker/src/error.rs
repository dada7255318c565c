// Error types for navigation-tracker

use thiserror::Error;

/// Result type alias for navigation-tracker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while tracking a navigation
#[derive(Debug, Error)]
pub enum Error {
    /// `start()` was called while a navigation is already being tracked
    ///
    /// A listener tracks one navigation at a time. Call `stop()` (or wait for
    /// the pending navigation to settle) before starting again.
    #[error("Progress listener already started")]
    AlreadyStarted,

    /// `stop()` was called without a navigation being tracked
    ///
    /// Either `start()` was never called, the navigation already settled,
    /// or `start()` resolved immediately because a document was already loading.
    #[error("Progress listener not yet started")]
    NotStarted,

    /// The listener was destroyed and can no longer track navigations
    #[error("Progress listener was destroyed")]
    Destroyed,

    /// The tracked navigation failed
    ///
    /// Carries the engine's name for the failure, e.g. `NS_ERROR_UNKNOWN_HOST`
    /// or the error page reason such as `dnsNotFound`.
    #[error("Navigation failed: {0}")]
    Navigation(#[from] NavigationError),

    /// An internal invariant of the tracking state machine was violated
    #[error("Invalid tracking state: {0}")]
    InvalidState(String),

    /// Invalid argument provided to a constructor or option
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No async runtime is available to drive the unload timer
    #[error("Runtime unavailable: {0}")]
    Runtime(String),

    /// The completion channel closed before the navigation settled
    ///
    /// Happens when the listener is dropped or destroyed while a navigation
    /// is still pending.
    #[error("Completion channel closed before the navigation settled")]
    ChannelClosed,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error with additional context
    #[error("{0}: {1}")]
    Context(String, #[source] Box<Error>),
}

impl Error {
    /// Adds context to the error
    pub fn context(self, msg: impl Into<String>) -> Self {
        Error::Context(msg.into(), Box::new(self))
    }

    /// Returns true for start/stop sequencing mistakes made by the caller.
    pub fn is_protocol_misuse(&self) -> bool {
        match self {
            Error::AlreadyStarted | Error::NotStarted => true,
            Error::Context(_, inner) => inner.is_protocol_misuse(),
            _ => false,
        }
    }

    /// Returns the navigation failure name, if this error is a navigation failure.
    pub fn navigation_error_name(&self) -> Option<&str> {
        match self {
            Error::Navigation(e) => Some(e.name()),
            Error::Context(_, inner) => inner.navigation_error_name(),
            _ => None,
        }
    }
}

/// Terminal failure of a tracked navigation.
///
/// Always carries a human-readable name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}")]
pub struct NavigationError {
    name: String,
}

impl NavigationError {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The engine's name for the failure
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_misuse_classification() {
        assert!(Error::AlreadyStarted.is_protocol_misuse());
        assert!(Error::NotStarted.is_protocol_misuse());
        assert!(Error::NotStarted.context("stop()").is_protocol_misuse());
        assert!(!Error::ChannelClosed.is_protocol_misuse());
        assert!(!Error::from(NavigationError::new("NS_BINDING_ABORTED")).is_protocol_misuse());
    }

    #[test]
    fn test_navigation_error_name_survives_context() {
        let err = Error::from(NavigationError::new("NS_ERROR_UNKNOWN_HOST")).context("goto");
        assert_eq!(err.navigation_error_name(), Some("NS_ERROR_UNKNOWN_HOST"));
        assert_eq!(
            err.to_string(),
            "goto: Navigation failed: NS_ERROR_UNKNOWN_HOST"
        );
    }
}
