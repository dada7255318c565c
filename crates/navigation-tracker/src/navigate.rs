// Initial navigation - wait for a navigable to settle after it was opened
//
// Right after a navigable is created it shows the initial blank document,
// which may or may not be replaced by a real navigation. This facade waits
// until either a navigation completes or the unload timeout decides that
// none is coming, and reports the URIs in every case.

use crate::api::WaitOptions;
use crate::protocol::ProgressSource;
use crate::server::listener::{Collaborators, NavigationOutcome, ProgressListener};
use std::sync::Arc;

/// Waits for the initial navigation of a navigable to complete.
///
/// Never fails: errors are logged and the best-known URIs are returned.
///
/// # Example
///
/// ```ignore
/// use navigation_tracker::{WaitOptions, wait_for_initial_navigation_completed};
///
/// let outcome = wait_for_initial_navigation_completed(
///     source,
///     WaitOptions::new().timeout_multiplier(host_multiplier),
/// )
/// .await;
/// println!("current={:?} target={:?}", outcome.current_uri, outcome.target_uri);
/// ```
pub async fn wait_for_initial_navigation_completed(
    source: Arc<dyn ProgressSource>,
    options: WaitOptions,
) -> NavigationOutcome {
    wait_for_initial_navigation_completed_with(source, options, Collaborators::new()).await
}

/// Same as [`wait_for_initial_navigation_completed`], with explicit collaborators.
pub async fn wait_for_initial_navigation_completed_with(
    source: Arc<dyn ProgressSource>,
    options: WaitOptions,
    collaborators: Collaborators,
) -> NavigationOutcome {
    let context_id = source.browsing_context_id();

    let listener = match ProgressListener::new(
        Arc::clone(&source),
        options.to_tracking_config(),
        collaborators,
    ) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::warn!(
                "[{}] Failed to create progress listener: {}",
                context_id,
                e
            );
            return best_effort(source.as_ref());
        }
    };

    // Start right away so a navigation starting now cannot be missed
    let navigated = match listener.start(None) {
        Ok(navigated) => navigated,
        Err(e) => {
            tracing::warn!("[{}] Failed to start progress listener: {}", context_id, e);
            listener.destroy();
            return best_effort(source.as_ref());
        }
    };

    // A document that is neither the initial one nor loading is final
    if !source.is_initial_document() && !listener.is_loading_document() {
        tracing::debug!(
            "[{}] Document already finished loading: {:?}",
            context_id,
            listener.current_uri().as_ref().map(|uri| uri.as_str())
        );
        if let Err(e) = listener.stop(None) {
            tracing::debug!("[{}] {}", context_id, e);
        }
    }

    if let Err(e) = navigated.await {
        tracing::warn!(
            "[{}] Failed to wait for initial navigation: {}",
            context_id,
            e
        );
    }
    listener.destroy();

    NavigationOutcome {
        current_uri: listener.current_uri(),
        target_uri: listener.target_uri(),
    }
}

fn best_effort(source: &dyn ProgressSource) -> NavigationOutcome {
    let current_uri = source.current_uri();
    NavigationOutcome {
        target_uri: current_uri.clone(),
        current_uri,
    }
}
