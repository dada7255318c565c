// Copyright 2026 Paul Adamson
// Licensed under the Apache License, Version 2.0
//
// Prompt source - user prompts that can suspend a navigation
//
// A `beforeunload` prompt blocks the unload of the current document until the
// user answers it. Callers that only wait for a navigation to start treat such
// a prompt as proof that it started.

use crate::error::Result;
use crate::protocol::progress::{BrowsingContextId, SubscriptionId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The type of a user prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    /// Simple notification dialog
    Alert,
    /// Yes/No confirmation dialog
    Confirm,
    /// Text input dialog
    Prompt,
    /// Page unload confirmation dialog
    #[serde(rename = "beforeunload")]
    BeforeUnload,
}

/// The prompt part of an "opened" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub prompt_type: PromptType,
}

/// Payload of a prompt "opened" event.
///
/// Wire shape: `{"prompt": {"promptType": "beforeunload"}, "navigableContext": 7}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptEvent {
    pub prompt: Prompt,
    /// Top-level browsing context the prompt is shown for
    pub navigable_context: BrowsingContextId,
}

impl PromptEvent {
    pub fn new(prompt_type: PromptType, navigable_context: BrowsingContextId) -> Self {
        Self {
            prompt: Prompt { prompt_type },
            navigable_context,
        }
    }

    /// Parses an event payload as sent by the remote protocol layer.
    ///
    /// Entry point for a host receiving prompt events as JSON; malformed
    /// payloads surface as [`Error::Json`](crate::Error::Json).
    pub fn from_json(payload: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(payload)?)
    }

    pub fn is_before_unload_for(&self, context: BrowsingContextId) -> bool {
        self.prompt.prompt_type == PromptType::BeforeUnload && self.navigable_context == context
    }
}

/// Prompt "opened" event handler
pub type PromptHandler = Arc<dyn Fn(&PromptEvent) + Send + Sync>;

/// Emits an event whenever a user prompt opens.
pub trait PromptSource: Send + Sync {
    fn on_opened(&self, handler: PromptHandler) -> SubscriptionId;

    fn off(&self, id: SubscriptionId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_event_from_json() {
        let event = PromptEvent::from_json(json!({
            "prompt": { "promptType": "beforeunload" },
            "navigableContext": 7
        }))
        .unwrap();

        assert_eq!(event.prompt.prompt_type, PromptType::BeforeUnload);
        assert!(event.is_before_unload_for(BrowsingContextId(7)));
        assert!(!event.is_before_unload_for(BrowsingContextId(8)));
    }

    #[test]
    fn test_other_prompt_types_are_not_before_unload() {
        for (name, prompt_type) in [
            ("alert", PromptType::Alert),
            ("confirm", PromptType::Confirm),
            ("prompt", PromptType::Prompt),
        ] {
            let event = PromptEvent::from_json(json!({
                "prompt": { "promptType": name },
                "navigableContext": 1
            }))
            .unwrap();
            assert_eq!(event.prompt.prompt_type, prompt_type);
            assert!(!event.is_before_unload_for(BrowsingContextId(1)));
        }
    }

    #[test]
    fn test_unknown_prompt_type_is_rejected() {
        let result = PromptEvent::from_json(json!({
            "prompt": { "promptType": "print" },
            "navigableContext": 1
        }));
        assert!(matches!(result, Err(crate::Error::Json(_))));
    }
}
