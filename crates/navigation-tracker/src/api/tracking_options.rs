// Options for ProgressListener and wait_for_initial_navigation_completed()
//
// Both are plain data so a remote-protocol command layer can pass them
// through as JSON.

use crate::error::{Error, Result};
use crate::protocol::Status;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default time to wait for a navigation to start, in milliseconds
pub const DEFAULT_UNLOAD_TIMEOUT_MS: u64 = 200;

fn default_unload_timeout_ms() -> u64 {
    DEFAULT_UNLOAD_TIMEOUT_MS
}

fn default_success_statuses() -> Vec<Status> {
    vec![Status::NS_ERROR_PARSED_DATA_CACHED]
}

fn default_timeout_multiplier() -> f64 {
    1.0
}

/// Immutable parameters of a [`ProgressListener`](crate::ProgressListener).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingConfig {
    /// The caller guarantees a navigation will happen; never fall back on the unload timer
    #[serde(default)]
    pub expect_navigation: bool,

    /// Settle as soon as the navigation started instead of when it finished
    #[serde(default)]
    pub resolve_when_started: bool,

    /// Time to wait for a navigation to start before assuming none will.
    /// Ignored when `expect_navigation` is set.
    #[serde(default = "default_unload_timeout_ms")]
    pub unload_timeout_ms: u64,

    /// Ignore a document that is already loading and wait for a new start
    #[serde(default)]
    pub wait_for_explicit_start: bool,

    /// Best-known target of the navigation, if the caller knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_uri: Option<Url>,

    /// Failure codes the engine reports for loads that did complete
    #[serde(default = "default_success_statuses")]
    pub success_statuses: Vec<Status>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            expect_navigation: false,
            resolve_when_started: false,
            unload_timeout_ms: DEFAULT_UNLOAD_TIMEOUT_MS,
            wait_for_explicit_start: false,
            target_uri: None,
            success_statuses: default_success_statuses(),
        }
    }
}

impl TrackingConfig {
    /// Creates a new TrackingConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_navigation(mut self, expect: bool) -> Self {
        self.expect_navigation = expect;
        self
    }

    pub fn resolve_when_started(mut self, resolve: bool) -> Self {
        self.resolve_when_started = resolve;
        self
    }

    pub fn unload_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.unload_timeout_ms = timeout_ms;
        self
    }

    pub fn wait_for_explicit_start(mut self, wait: bool) -> Self {
        self.wait_for_explicit_start = wait;
        self
    }

    pub fn target_uri(mut self, uri: Url) -> Self {
        self.target_uri = Some(uri);
        self
    }

    /// Replaces the engine-specific success allowlist
    pub fn success_statuses(mut self, statuses: Vec<Status>) -> Self {
        self.success_statuses = statuses;
        self
    }

    /// The unload timeout, or `None` when the timer must never be armed.
    pub fn unload_timeout(&self) -> Option<Duration> {
        if self.expect_navigation {
            None
        } else {
            Some(Duration::from_millis(self.unload_timeout_ms))
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(status) = self.success_statuses.iter().find(|s| s.is_success()) {
            return Err(Error::InvalidArgument(format!(
                "success_statuses must only list failure codes, got {}",
                status
            )));
        }
        Ok(())
    }
}

/// Options for [`wait_for_initial_navigation_completed`](crate::wait_for_initial_navigation_completed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitOptions {
    /// Settle once the initial navigation started
    #[serde(default)]
    pub resolve_when_started: bool,

    /// Base time to wait for a navigation to start, in milliseconds
    #[serde(default = "default_unload_timeout_ms")]
    pub unload_timeout_ms: u64,

    /// Host-supplied scale factor for slow or instrumented builds (>= 1)
    #[serde(default = "default_timeout_multiplier")]
    pub timeout_multiplier: f64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            resolve_when_started: false,
            unload_timeout_ms: DEFAULT_UNLOAD_TIMEOUT_MS,
            timeout_multiplier: 1.0,
        }
    }
}

impl WaitOptions {
    /// Creates new WaitOptions with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_when_started(mut self, resolve: bool) -> Self {
        self.resolve_when_started = resolve;
        self
    }

    pub fn unload_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.unload_timeout_ms = timeout_ms;
        self
    }

    pub fn timeout_multiplier(mut self, multiplier: f64) -> Self {
        self.timeout_multiplier = multiplier;
        self
    }

    /// Unload timeout scaled by the multiplier.
    ///
    /// Multipliers below 1 (or not finite) are treated as 1.
    pub fn effective_unload_timeout_ms(&self) -> u64 {
        let multiplier = if self.timeout_multiplier.is_finite() && self.timeout_multiplier >= 1.0
        {
            self.timeout_multiplier
        } else {
            tracing::warn!(
                "Ignoring timeout multiplier {}, must be a finite value >= 1",
                self.timeout_multiplier
            );
            1.0
        };
        (self.unload_timeout_ms as f64 * multiplier).round() as u64
    }

    pub(crate) fn to_tracking_config(&self) -> TrackingConfig {
        TrackingConfig::new()
            .resolve_when_started(self.resolve_when_started)
            .unload_timeout_ms(self.effective_unload_timeout_ms())
    }
}
