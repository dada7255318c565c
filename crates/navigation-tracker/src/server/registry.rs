// Active listener registry
//
// Process-wide table of listeners that are currently subscribed to a progress
// source, keyed by listener id. Used for diagnostics only: listeners are
// owned by their callers and never looked up through this table.

use crate::protocol::{BrowsingContextId, NavigationId};
use parking_lot::{Mutex, const_mutex};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Identifier of a [`ProgressListener`](crate::ProgressListener) instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot entry describing one listener that is tracking a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveListener {
    pub id: ListenerId,
    pub browsing_context_id: BrowsingContextId,
    pub navigation_id: Option<NavigationId>,
    pub started_at: Instant,
}

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

static ACTIVE_LISTENERS: Mutex<BTreeMap<ListenerId, ActiveListener>> =
    const_mutex(BTreeMap::new());

pub(crate) fn next_listener_id() -> ListenerId {
    ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
}

pub(crate) fn register(entry: ActiveListener) {
    ACTIVE_LISTENERS.lock().insert(entry.id, entry);
}

pub(crate) fn unregister(id: ListenerId) -> bool {
    ACTIVE_LISTENERS.lock().remove(&id).is_some()
}

/// Returns the listeners currently tracking a navigation, ordered by id.
pub fn active_listeners() -> Vec<ActiveListener> {
    ACTIVE_LISTENERS.lock().values().cloned().collect()
}

/// Returns true if the listener is currently tracking a navigation.
pub fn is_active(id: ListenerId) -> bool {
    ACTIVE_LISTENERS.lock().contains_key(&id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_unregister() {
        let id = next_listener_id();
        register(ActiveListener {
            id,
            browsing_context_id: BrowsingContextId(3),
            navigation_id: Some(NavigationId::new("nav")),
            started_at: Instant::now(),
        });

        assert!(is_active(id));
        assert!(
            active_listeners()
                .iter()
                .any(|l| l.id == id && l.browsing_context_id == BrowsingContextId(3))
        );

        assert!(unregister(id));
        assert!(!unregister(id));
        assert!(!is_active(id));
    }

    #[test]
    fn test_listener_ids_are_unique() {
        let a = next_listener_id();
        let b = next_listener_id();
        assert_ne!(a, b);
    }
}
