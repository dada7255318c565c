// Navigation registry - asynchronous failure reports
//
// Some failures are detected outside the progress source, e.g. by a
// navigation tracker running in the content process. The registry reports
// them correlated by navigation id.

use crate::error::Result;
use crate::protocol::progress::SubscriptionId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Correlation id of a navigation, assigned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationId(pub String);

impl NavigationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NavigationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload of a "navigation-failed" event.
///
/// Wire shape: `{"errorName": "NS_ERROR_UNKNOWN_HOST", "navigationId": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationFailedEvent {
    pub error_name: String,
    pub navigation_id: NavigationId,
}

impl NavigationFailedEvent {
    pub fn new(error_name: impl Into<String>, navigation_id: NavigationId) -> Self {
        Self {
            error_name: error_name.into(),
            navigation_id,
        }
    }

    /// Entry point for a host receiving navigation-failed events as remote
    /// protocol JSON; malformed payloads surface as [`Error::Json`](crate::Error::Json).
    pub fn from_json(payload: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(payload)?)
    }
}

/// "navigation-failed" event handler
pub type NavigationFailedHandler = Arc<dyn Fn(&NavigationFailedEvent) + Send + Sync>;

/// Higher-level navigation bookkeeping that reports failures by navigation id.
pub trait NavigationRegistry: Send + Sync {
    fn on_navigation_failed(&self, handler: NavigationFailedHandler) -> SubscriptionId;

    fn off(&self, id: SubscriptionId);
}
