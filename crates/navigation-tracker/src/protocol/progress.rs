// Copyright 2026 Paul Adamson
// Licensed under the Apache License, Version 2.0
//
// Progress source - the page-load engine as seen by the tracker
//
// The host's load engine emits two kinds of notifications for a navigable:
// state changes (start/stop of a request, with a result code) and location
// changes (a new location, possibly an error page or a same-document change).
// The tracker only subscribes and reads; it never mutates the source.

use crate::protocol::status::Status;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Identifier of a browsing context (tab or frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrowsingContextId(pub u64);

impl fmt::Display for BrowsingContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by a collaborator when a listener or handler is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Start/stop bitmask of a state-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateFlags(pub u32);

impl StateFlags {
    pub const START: StateFlags = StateFlags(0x0000_0001);
    pub const REDIRECTING: StateFlags = StateFlags(0x0000_0002);
    pub const TRANSFERRING: StateFlags = StateFlags(0x0000_0004);
    pub const STOP: StateFlags = StateFlags(0x0000_0010);
    pub const IS_REQUEST: StateFlags = StateFlags(0x0001_0000);
    pub const IS_DOCUMENT: StateFlags = StateFlags(0x0002_0000);
    pub const IS_NETWORK: StateFlags = StateFlags(0x0004_0000);
    pub const IS_WINDOW: StateFlags = StateFlags(0x0008_0000);

    pub fn contains(self, other: StateFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_start(self) -> bool {
        self.contains(Self::START)
    }

    pub fn is_stop(self) -> bool {
        self.contains(Self::STOP)
    }
}

impl std::ops::BitOr for StateFlags {
    type Output = StateFlags;

    fn bitor(self, rhs: StateFlags) -> StateFlags {
        StateFlags(self.0 | rhs.0)
    }
}

/// Flags of a location-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LocationFlags(pub u32);

impl LocationFlags {
    pub const SAME_DOCUMENT: LocationFlags = LocationFlags(0x0000_0001);
    pub const ERROR_PAGE: LocationFlags = LocationFlags(0x0000_0002);
    pub const RELOAD: LocationFlags = LocationFlags(0x0000_0004);

    pub fn contains(self, other: LocationFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for LocationFlags {
    type Output = LocationFlags;

    fn bitor(self, rhs: LocationFlags) -> LocationFlags {
        LocationFlags(self.0 | rhs.0)
    }
}

/// Load type of the navigable's current load.
///
/// The low 16 bits hold the load command, the high 16 bits the load flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LoadType(pub u32);

impl LoadType {
    pub const CMD_NORMAL: LoadType = LoadType(0x0000_0001);
    pub const CMD_RELOAD: LoadType = LoadType(0x0000_0002);
    pub const CMD_HISTORY: LoadType = LoadType(0x0000_0004);
    pub const CMD_PUSHSTATE: LoadType = LoadType(0x0000_0008);

    /// Set while the engine is loading an internal error page.
    pub const FLAGS_ERROR_PAGE: LoadType = LoadType(0x0001 << 16);

    /// Normal load of an error page.
    pub const ERROR_PAGE: LoadType = LoadType(Self::FLAGS_ERROR_PAGE.0 | Self::CMD_NORMAL.0);

    pub fn is_error_page(self) -> bool {
        self.0 & Self::FLAGS_ERROR_PAGE.0 != 0
    }
}

/// The request a state-change notification refers to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestInfo {
    /// Original URI of the request before any redirect, as reported by the engine
    pub original_uri: Option<String>,
}

impl RequestInfo {
    pub fn new(original_uri: impl Into<String>) -> Self {
        Self {
            original_uri: Some(original_uri.into()),
        }
    }

    /// Parses the original URI.
    ///
    /// Requests that are not channels (or carry an unparsable URI) yield `None`.
    pub fn target_uri(&self) -> Option<Url> {
        self.original_uri
            .as_deref()
            .and_then(|uri| Url::parse(uri).ok())
    }
}

/// A state-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub request: Option<RequestInfo>,
    pub flags: StateFlags,
    pub status: Status,
}

impl StateChange {
    pub fn start(request: RequestInfo) -> Self {
        Self {
            request: Some(request),
            flags: StateFlags::START | StateFlags::IS_DOCUMENT | StateFlags::IS_NETWORK,
            status: Status::OK,
        }
    }

    pub fn stop(status: Status) -> Self {
        Self {
            request: None,
            flags: StateFlags::STOP | StateFlags::IS_DOCUMENT | StateFlags::IS_NETWORK,
            status,
        }
    }
}

/// A location-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationChange {
    pub location: Url,
    pub flags: LocationFlags,
}

/// Notification emitted by a [`ProgressSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    StateChange(StateChange),
    LocationChange(LocationChange),
}

/// Receives the notifications of a [`ProgressSource`].
pub trait ProgressObserver: Send + Sync {
    fn on_signal(&self, signal: Signal);
}

/// The page-load engine of one navigable.
///
/// Implementations must deliver signals in emission order, on the same
/// logical thread of control that calls into the tracker. They must not hold
/// internal locks while invoking observers: an observer may call
/// [`ProgressSource::remove_listener`] from within `on_signal`.
pub trait ProgressSource: Send + Sync {
    /// Id of the tracked browsing context.
    fn browsing_context_id(&self) -> BrowsingContextId;

    /// Id of the top-level browsing context the tracked one belongs to.
    fn top_level_context_id(&self) -> BrowsingContextId;

    fn is_loading_document(&self) -> bool;

    /// URI of the currently committed document, if there is one.
    fn current_uri(&self) -> Option<Url>;

    fn load_type(&self) -> LoadType;

    /// The request of the document currently loading, if any.
    fn document_request(&self) -> Option<RequestInfo>;

    /// Whether the committed document is the initial blank document.
    fn is_initial_document(&self) -> bool;

    fn add_listener(&self, observer: Arc<dyn ProgressObserver>) -> SubscriptionId;

    fn remove_listener(&self, id: SubscriptionId);
}

/// Document state read from the source at the time a signal is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentSnapshot {
    pub load_type: LoadType,
    pub is_initial_document: bool,
}

impl DocumentSnapshot {
    pub fn capture(source: &dyn ProgressSource) -> Self {
        Self {
            load_type: source.load_type(),
            is_initial_document: source.is_initial_document(),
        }
    }
}
