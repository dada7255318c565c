// Copyright 2026 Paul Adamson
// Licensed under the Apache License, Version 2.0
//
// Host vocabulary - what the tracker observes
//
// This module contains the types exchanged with the host's collaborators
// (progress source, prompt source, navigation registry) and the classifier
// that interprets progress notifications.
//
// Architecture:
// - Collaborators are traits implemented by the host
// - Notifications are typed values, never event-name strings
// - Classification is pure; state lives in the server layer

pub mod classify;
pub mod navigation_registry;
pub mod progress;
pub mod prompt;
pub mod status;

pub use classify::{
    GENERIC_ERROR_PAGE_NAME, Verdict, classify_location_change, classify_state_change,
    error_page_reason,
};
pub use navigation_registry::{
    NavigationFailedEvent, NavigationFailedHandler, NavigationId, NavigationRegistry,
};
pub use progress::{
    BrowsingContextId, DocumentSnapshot, LoadType, LocationChange, LocationFlags,
    ProgressObserver, ProgressSource, RequestInfo, Signal, StateChange, StateFlags,
    SubscriptionId,
};
pub use prompt::{Prompt, PromptEvent, PromptHandler, PromptSource, PromptType};
pub use status::Status;
