// Tracking state machine
//
// `TrackingState::step` is the whole navigation-tracking policy as a pure
// transition `(state, input) -> effects`. The listener shell feeds it inputs
// and performs the effects (timer, unsubscribe, settle); nothing in here
// touches a collaborator.

use crate::api::TrackingConfig;
use crate::error::{Error, NavigationError, Result};
use crate::protocol::classify::{Verdict, classify_location_change, classify_state_change};
use crate::protocol::{DocumentSnapshot, NavigationId, Signal};
use std::time::Duration;
use url::Url;

/// Input processed by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A notification from the progress source
    Signal(Signal),
    /// The unload timer expired without a navigation starting
    UnloadTimerFired {
        /// Arm generation of the timer that fired; the listener drops fires
        /// whose generation is no longer armed before calling `step`
        generation: u64,
        current_uri: Option<Url>,
    },
    /// A `beforeunload` prompt opened for the tracked top-level context
    BeforeUnloadPrompt,
    /// The navigation registry reported a failure
    NavigationFailed {
        navigation_id: NavigationId,
        error_name: String,
    },
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ArmUnloadTimer(Duration),
    DisarmUnloadTimer,
    /// Stop tracking: disarm, unsubscribe and settle the pending navigation
    Stop(Option<NavigationError>),
}

/// Coarse position of the state machine, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No start seen yet; the unload timer may be armed
    WaitingForStart,
    /// Started, waiting for the stop notification
    AwaitingStop,
    /// The load failed and the error page has not committed yet
    AwaitingErrorConfirmation,
}

/// Mutable state of one tracked navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingState {
    seen_start: bool,
    target_uri: Option<Url>,
    pending_error_name: Option<String>,
    navigation_id: Option<NavigationId>,
}

impl TrackingState {
    pub fn new(navigation_id: Option<NavigationId>, target_uri: Option<Url>) -> Self {
        Self {
            seen_start: false,
            target_uri,
            pending_error_name: None,
            navigation_id,
        }
    }

    pub fn seen_start(&self) -> bool {
        self.seen_start
    }

    pub fn target_uri(&self) -> Option<&Url> {
        self.target_uri.as_ref()
    }

    pub fn pending_error_name(&self) -> Option<&str> {
        self.pending_error_name.as_deref()
    }

    pub fn phase(&self) -> Phase {
        match (self.seen_start, &self.pending_error_name) {
            (false, _) => Phase::WaitingForStart,
            (true, None) => Phase::AwaitingStop,
            (true, Some(_)) => Phase::AwaitingErrorConfirmation,
        }
    }

    pub(crate) fn set_target_uri(&mut self, uri: Option<Url>) {
        self.target_uri = uri;
    }

    /// Effects that wait for a navigation to start.
    pub fn wait_for_start(config: &TrackingConfig) -> Vec<Effect> {
        config
            .unload_timeout()
            .map(Effect::ArmUnloadTimer)
            .into_iter()
            .collect()
    }

    /// Applies one input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the input cannot happen in the
    /// current state. The shell turns this into a failed stop.
    pub fn step(
        &mut self,
        input: Input,
        document: &DocumentSnapshot,
        config: &TrackingConfig,
    ) -> Result<Vec<Effect>> {
        match input {
            Input::Signal(Signal::StateChange(change)) => {
                let verdict = classify_state_change(
                    &change,
                    document,
                    self.seen_start,
                    &config.success_statuses,
                );
                Ok(self.apply(verdict, config))
            }
            Input::Signal(Signal::LocationChange(change)) => {
                let verdict =
                    classify_location_change(&change, self.pending_error_name.as_deref());
                Ok(self.apply(verdict, config))
            }
            Input::UnloadTimerFired { current_uri, .. } => {
                if self.seen_start {
                    return Err(Error::InvalidState(
                        "unload timer fired after the navigation started".to_string(),
                    ));
                }
                self.target_uri = current_uri;
                Ok(vec![Effect::Stop(None)])
            }
            Input::BeforeUnloadPrompt => {
                if !config.resolve_when_started {
                    return Ok(Vec::new());
                }
                self.seen_start = true;
                Ok(vec![Effect::DisarmUnloadTimer, Effect::Stop(None)])
            }
            Input::NavigationFailed {
                navigation_id,
                error_name,
            } => {
                if self.navigation_id.as_ref() != Some(&navigation_id) {
                    return Ok(Vec::new());
                }
                Ok(vec![Effect::Stop(Some(NavigationError::new(error_name)))])
            }
        }
    }

    fn apply(&mut self, verdict: Verdict, config: &TrackingConfig) -> Vec<Effect> {
        match verdict {
            Verdict::NoOp | Verdict::AbortedInitialDocument => Vec::new(),
            Verdict::Started { target_uri } => {
                self.seen_start = true;
                if target_uri.is_some() {
                    self.target_uri = target_uri;
                }
                let mut effects = vec![Effect::DisarmUnloadTimer];
                if config.resolve_when_started {
                    effects.push(Effect::Stop(None));
                }
                effects
            }
            Verdict::SucceededFinal => vec![Effect::Stop(None)],
            Verdict::SucceededAwaitingFurtherNav => {
                self.seen_start = false;
                Self::wait_for_start(config)
            }
            Verdict::FailedImmediate { error_name }
            | Verdict::ErrorPageConfirmed { error_name } => {
                vec![Effect::Stop(Some(NavigationError::new(error_name)))]
            }
            Verdict::FailedAwaitingErrorPage { error_name } => {
                self.pending_error_name = Some(error_name);
                Vec::new()
            }
            Verdict::FragmentNavigated { location }
            | Verdict::SameDocumentNavigated { location } => {
                self.target_uri = Some(location);
                vec![Effect::Stop(None)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        LoadType, LocationChange, LocationFlags, RequestInfo, StateChange, Status,
    };

    const TIMEOUT: Duration = Duration::from_millis(200);

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn doc(initial: bool) -> DocumentSnapshot {
        DocumentSnapshot {
            load_type: LoadType::CMD_NORMAL,
            is_initial_document: initial,
        }
    }

    fn start(uri: &str) -> Input {
        Input::Signal(Signal::StateChange(StateChange::start(RequestInfo::new(uri))))
    }

    fn stop(status: Status) -> Input {
        Input::Signal(Signal::StateChange(StateChange::stop(status)))
    }

    fn location(uri: &str, flags: LocationFlags) -> Input {
        Input::Signal(Signal::LocationChange(LocationChange {
            location: url(uri),
            flags,
        }))
    }

    #[test]
    fn test_wait_for_start_respects_expect_navigation() {
        let config = TrackingConfig::default();
        assert_eq!(
            TrackingState::wait_for_start(&config),
            vec![Effect::ArmUnloadTimer(TIMEOUT)]
        );
        let config = TrackingConfig::new().expect_navigation(true);
        assert!(TrackingState::wait_for_start(&config).is_empty());
    }

    #[test]
    fn test_start_then_successful_stop() {
        let config = TrackingConfig::default();
        let mut state = TrackingState::default();

        let effects = state.step(start("https://a.test/"), &doc(false), &config).unwrap();
        assert_eq!(effects, vec![Effect::DisarmUnloadTimer]);
        assert_eq!(state.phase(), Phase::AwaitingStop);
        assert_eq!(state.target_uri(), Some(&url("https://a.test/")));

        let effects = state.step(stop(Status::OK), &doc(false), &config).unwrap();
        assert_eq!(effects, vec![Effect::Stop(None)]);
    }

    #[test]
    fn test_resolve_when_started_stops_on_start() {
        let config = TrackingConfig::new().resolve_when_started(true);
        let mut state = TrackingState::default();

        let effects = state.step(start("https://a.test/"), &doc(true), &config).unwrap();
        assert_eq!(effects, vec![Effect::DisarmUnloadTimer, Effect::Stop(None)]);
    }

    #[test]
    fn test_start_without_uri_keeps_hint() {
        let config = TrackingConfig::default();
        let mut state = TrackingState::new(None, Some(url("https://hint.test/")));

        let input = Input::Signal(Signal::StateChange(StateChange::start(RequestInfo::default())));
        state.step(input, &doc(false), &config).unwrap();
        assert_eq!(state.target_uri(), Some(&url("https://hint.test/")));
    }

    #[test]
    fn test_initial_document_load_rearms_timer() {
        let config = TrackingConfig::default();
        let mut state = TrackingState::default();

        state.step(start("about:blank"), &doc(true), &config).unwrap();
        let effects = state.step(stop(Status::OK), &doc(true), &config).unwrap();

        assert_eq!(effects, vec![Effect::ArmUnloadTimer(TIMEOUT)]);
        assert!(!state.seen_start());
        assert_eq!(state.phase(), Phase::WaitingForStart);

        // A real navigation follows
        state.step(start("https://real.test/"), &doc(true), &config).unwrap();
        let effects = state.step(stop(Status::OK), &doc(false), &config).unwrap();
        assert_eq!(effects, vec![Effect::Stop(None)]);
        assert_eq!(state.target_uri(), Some(&url("https://real.test/")));
    }

    #[test]
    fn test_error_page_two_step() {
        let config = TrackingConfig::default();
        let mut state = TrackingState::default();
        let error_doc = DocumentSnapshot {
            load_type: LoadType::ERROR_PAGE,
            is_initial_document: false,
        };

        state.step(start("https://down.test/"), &doc(false), &config).unwrap();
        let effects = state
            .step(stop(Status::NS_ERROR_CONNECTION_REFUSED), &error_doc, &config)
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(state.phase(), Phase::AwaitingErrorConfirmation);
        assert_eq!(
            state.pending_error_name(),
            Some("NS_ERROR_CONNECTION_REFUSED")
        );

        let effects = state
            .step(
                location("about:neterror?e=connectionFailure", LocationFlags::ERROR_PAGE),
                &error_doc,
                &config,
            )
            .unwrap();
        assert_eq!(
            effects,
            vec![Effect::Stop(Some(NavigationError::new(
                "NS_ERROR_CONNECTION_REFUSED"
            )))]
        );
    }

    #[test]
    fn test_aborted_initial_document_produces_no_effects() {
        let config = TrackingConfig::default();
        let mut state = TrackingState::default();

        state.step(start("about:blank"), &doc(true), &config).unwrap();
        let effects = state
            .step(stop(Status::NS_BINDING_ABORTED), &doc(true), &config)
            .unwrap();
        assert!(effects.is_empty());
        assert!(state.seen_start());
    }

    #[test]
    fn test_same_document_navigation_updates_target() {
        let config = TrackingConfig::default();
        let mut state = TrackingState::default();

        let effects = state
            .step(
                location("https://a.test/page#frag", LocationFlags::SAME_DOCUMENT),
                &doc(false),
                &config,
            )
            .unwrap();
        assert_eq!(effects, vec![Effect::Stop(None)]);
        assert_eq!(state.target_uri(), Some(&url("https://a.test/page#frag")));
    }

    #[test]
    fn test_unload_timer_reports_current_uri() {
        let config = TrackingConfig::default();
        let mut state = TrackingState::new(None, Some(url("https://hint.test/")));

        let effects = state
            .step(
                Input::UnloadTimerFired {
                    generation: 1,
                    current_uri: Some(url("https://current.test/")),
                },
                &doc(false),
                &config,
            )
            .unwrap();
        assert_eq!(effects, vec![Effect::Stop(None)]);
        assert_eq!(state.target_uri(), Some(&url("https://current.test/")));
    }

    #[test]
    fn test_unload_timer_after_start_is_invalid() {
        let config = TrackingConfig::default();
        let mut state = TrackingState::default();
        state.step(start("https://a.test/"), &doc(false), &config).unwrap();

        let result = state.step(
            Input::UnloadTimerFired {
                generation: 1,
                current_uri: None,
            },
            &doc(false),
            &config,
        );
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_before_unload_prompt_only_counts_when_resolving_on_start() {
        let mut state = TrackingState::default();
        let effects = state
            .step(Input::BeforeUnloadPrompt, &doc(false), &TrackingConfig::default())
            .unwrap();
        assert!(effects.is_empty());
        assert!(!state.seen_start());

        let config = TrackingConfig::new().resolve_when_started(true);
        let effects = state
            .step(Input::BeforeUnloadPrompt, &doc(false), &config)
            .unwrap();
        assert_eq!(effects, vec![Effect::DisarmUnloadTimer, Effect::Stop(None)]);
        assert!(state.seen_start());
    }

    #[test]
    fn test_navigation_failed_matches_navigation_id() {
        let config = TrackingConfig::default();
        let mut state = TrackingState::new(Some(NavigationId::new("nav-1")), None);

        let effects = state
            .step(
                Input::NavigationFailed {
                    navigation_id: NavigationId::new("nav-2"),
                    error_name: "NS_ERROR_UNKNOWN_HOST".to_string(),
                },
                &doc(false),
                &config,
            )
            .unwrap();
        assert!(effects.is_empty());

        let effects = state
            .step(
                Input::NavigationFailed {
                    navigation_id: NavigationId::new("nav-1"),
                    error_name: "NS_ERROR_UNKNOWN_HOST".to_string(),
                },
                &doc(false),
                &config,
            )
            .unwrap();
        assert_eq!(
            effects,
            vec![Effect::Stop(Some(NavigationError::new("NS_ERROR_UNKNOWN_HOST")))]
        );
    }

    #[test]
    fn test_navigation_failed_without_id_is_ignored() {
        let config = TrackingConfig::default();
        let mut state = TrackingState::default();
        let effects = state
            .step(
                Input::NavigationFailed {
                    navigation_id: NavigationId::new("nav-1"),
                    error_name: "x".to_string(),
                },
                &doc(false),
                &config,
            )
            .unwrap();
        assert!(effects.is_empty());
    }
}
