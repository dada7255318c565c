//! navigation-tracker: Navigation-completion tracking for browser remote control
//!
//! Automation clients (WebDriver-style protocols) need to know when a
//! navigation they triggered is done. Browser navigation is racy: a requested
//! navigation may never start, be replaced, stay within the same document,
//! end on an error page, or be held up by a `beforeunload` prompt. This crate
//! observes a navigable's page-load progress notifications and resolves one
//! deterministic outcome: navigation complete, navigation failed, or no
//! navigation before the unload timeout.
//!
//! # Examples
//!
//! ## Waiting for a navigation
//!
//! ```ignore
//! use navigation_tracker::{Collaborators, ProgressListener, TrackingConfig};
//!
//! async fn navigate(source: std::sync::Arc<dyn navigation_tracker::ProgressSource>)
//!     -> navigation_tracker::Result<()>
//! {
//!     let listener = ProgressListener::new(
//!         source,
//!         TrackingConfig::new().expect_navigation(true),
//!         Collaborators::new(),
//!     )?;
//!
//!     // Register before triggering the navigation
//!     let navigated = listener.start(None)?;
//!     // ... ask the engine to load a URL ...
//!
//!     match navigated.await {
//!         Ok(outcome) => println!("loaded {:?}", outcome.target_uri),
//!         Err(e) => println!("navigation failed: {}", e),
//!     }
//!     listener.destroy();
//!     Ok(())
//! }
//! ```
//!
//! ## Waiting for the initial navigation of a new tab
//!
//! ```ignore
//! use navigation_tracker::{WaitOptions, wait_for_initial_navigation_completed};
//!
//! let outcome = wait_for_initial_navigation_completed(source, WaitOptions::default()).await;
//! assert!(outcome.current_uri.is_some());
//! ```

pub mod api;
mod error;
pub mod navigate;
pub mod protocol;
#[doc(hidden)]
pub mod server;

// Re-export error types
pub use error::{Error, NavigationError, Result};

// Re-export options
pub use api::{DEFAULT_UNLOAD_TIMEOUT_MS, TrackingConfig, WaitOptions};

// Re-export the facade
pub use navigate::{wait_for_initial_navigation_completed, wait_for_initial_navigation_completed_with};

// Re-export the listener API
pub use server::listener::{Collaborators, NavigationOutcome, PendingNavigation, ProgressListener};
pub use server::machine::Phase;
pub use server::registry::{ActiveListener, ListenerId, active_listeners};
pub use server::timer::{TimerCallback, TimerHandle, TimerService, TokioTimer};

// Re-export the host vocabulary
pub use protocol::{
    BrowsingContextId, LoadType, LocationChange, LocationFlags, NavigationFailedEvent,
    NavigationId, NavigationRegistry, ProgressObserver, ProgressSource, PromptEvent,
    PromptSource, PromptType, RequestInfo, Signal, StateChange, StateFlags, Status,
    SubscriptionId,
};
