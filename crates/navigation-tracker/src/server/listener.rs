// Copyright 2026 Paul Adamson
// Licensed under the Apache License, Version 2.0
//
// ProgressListener - tracks one navigation of one navigable
//
// The listener subscribes to the navigable's progress source, feeds every
// notification through the tracking state machine and performs the effects
// it requests. It settles a single pending navigation per start() call.
//
// Locking: the state mutex is only held while reading or mutating listener
// state, never while calling into a collaborator. Collaborators may call back
// into the listener synchronously (e.g. a source dispatching a signal from
// add_listener, or a timer firing).

use crate::api::TrackingConfig;
use crate::error::{Error, NavigationError, Result};
use crate::protocol::{
    BrowsingContextId, DocumentSnapshot, NavigationFailedEvent, NavigationFailedHandler,
    NavigationId, NavigationRegistry, ProgressObserver, ProgressSource, PromptEvent,
    PromptHandler, PromptSource, RequestInfo, Signal, StateChange, StateFlags, Status,
    SubscriptionId,
};
use crate::server::machine::{Effect, Input, Phase, TrackingState};
use crate::server::registry::{self, ActiveListener, ListenerId};
use crate::server::timer::{TimerHandle, TimerService, TokioTimer};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use url::Url;

/// URIs reported when a tracked navigation settles.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationOutcome {
    /// URI of the document committed when the navigation settled
    pub current_uri: Option<Url>,
    /// Best-known URI the navigation was heading to
    pub target_uri: Option<Url>,
}

type Completion = oneshot::Sender<Result<NavigationOutcome>>;

/// Future returned by [`ProgressListener::start`].
///
/// Resolves with the [`NavigationOutcome`] or fails with
/// [`Error::Navigation`]. Fails with [`Error::ChannelClosed`] if the listener
/// is dropped before the navigation settled.
#[derive(Debug)]
pub struct PendingNavigation {
    inner: PendingInner,
}

#[derive(Debug)]
enum PendingInner {
    Ready(Option<Result<NavigationOutcome>>),
    Waiting(oneshot::Receiver<Result<NavigationOutcome>>),
}

impl PendingNavigation {
    fn ready(result: Result<NavigationOutcome>) -> Self {
        Self {
            inner: PendingInner::Ready(Some(result)),
        }
    }

    fn waiting(receiver: oneshot::Receiver<Result<NavigationOutcome>>) -> Self {
        Self {
            inner: PendingInner::Waiting(receiver),
        }
    }

    /// Takes the result without waiting, if the navigation already settled.
    pub fn try_take(&mut self) -> Option<Result<NavigationOutcome>> {
        let result = match &mut self.inner {
            PendingInner::Ready(result) => return result.take(),
            PendingInner::Waiting(receiver) => match receiver.try_recv() {
                Ok(result) => result,
                Err(oneshot::error::TryRecvError::Empty) => return None,
                Err(oneshot::error::TryRecvError::Closed) => Err(Error::ChannelClosed),
            },
        };
        self.inner = PendingInner::Ready(None);
        Some(result)
    }
}

impl Future for PendingNavigation {
    type Output = Result<NavigationOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.inner {
            PendingInner::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(Error::ChannelClosed)))
            }
            PendingInner::Waiting(receiver) => Pin::new(receiver)
                .poll(cx)
                .map(|received| received.unwrap_or_else(|_| Err(Error::ChannelClosed))),
        }
    }
}

/// Optional collaborators of a [`ProgressListener`].
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Timer used for the unload timeout (default: [`TokioTimer`] on the current runtime)
    pub timer: Option<Arc<dyn TimerService>>,
    /// Source of user prompts, consulted when resolving on start
    pub prompts: Option<Arc<dyn PromptSource>>,
    /// Registry reporting failures the progress source cannot observe
    pub navigation_registry: Option<Arc<dyn NavigationRegistry>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timer(mut self, timer: Arc<dyn TimerService>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn prompts(mut self, prompts: Arc<dyn PromptSource>) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn navigation_registry(mut self, registry: Arc<dyn NavigationRegistry>) -> Self {
        self.navigation_registry = Some(registry);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("timer", &self.timer.is_some())
            .field("prompts", &self.prompts.is_some())
            .field("navigation_registry", &self.navigation_registry.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    generation: u64,
    handle: Option<TimerHandle>,
}

#[derive(Default)]
struct ListenerState {
    tracking: TrackingState,
    completion: Option<Completion>,
    unload_timer: Option<ArmedTimer>,
    timer_generation: u64,
    progress_subscription: Option<SubscriptionId>,
    prompt_subscription: Option<SubscriptionId>,
    failure_subscription: Option<SubscriptionId>,
    destroyed: bool,
}

impl ListenerState {
    /// Whether an input may reach the state machine right now.
    fn accepts(&mut self, input: &Input) -> bool {
        if self.completion.is_none() {
            return false;
        }
        if let Input::UnloadTimerFired { generation, .. } = input {
            // Only the currently armed timer counts; a disarmed or replaced
            // one may still fire once.
            match self.unload_timer {
                Some(armed) if armed.generation == *generation => self.unload_timer = None,
                _ => return false,
            }
        }
        true
    }
}

struct ListenerInner {
    id: ListenerId,
    context_id: BrowsingContextId,
    source: Arc<dyn ProgressSource>,
    config: TrackingConfig,
    timer: Arc<dyn TimerService>,
    prompts: Option<Arc<dyn PromptSource>>,
    navigation_registry: Option<Arc<dyn NavigationRegistry>>,
    state: Mutex<ListenerState>,
}

/// Forwards progress notifications to a listener without keeping it alive.
struct SignalForwarder {
    listener: Weak<ListenerInner>,
}

impl ProgressObserver for SignalForwarder {
    fn on_signal(&self, signal: Signal) {
        if let Some(listener) = self.listener.upgrade() {
            listener.dispatch(Input::Signal(signal));
        }
    }
}

/// Tracks the navigation of one navigable and resolves a single outcome:
/// navigation complete, navigation failed, or no navigation before the
/// unload timeout.
///
/// A listener can be reused: once a pending navigation settled, `start()`
/// may be called again. [`ProgressListener::destroy`] is terminal.
///
/// # Example
///
/// ```ignore
/// use navigation_tracker::{Collaborators, ProgressListener, TrackingConfig};
///
/// let listener = ProgressListener::new(source, TrackingConfig::default(), Collaborators::new())?;
/// let navigated = listener.start(None)?;
/// // ... trigger the navigation ...
/// let outcome = navigated.await?;
/// println!("navigated to {:?}", outcome.target_uri);
/// listener.destroy();
/// ```
#[derive(Clone)]
pub struct ProgressListener {
    inner: Arc<ListenerInner>,
}

impl ProgressListener {
    /// Creates a listener for the navigable behind `source`.
    ///
    /// Subscribes to the prompt source (when `resolve_when_started` is set)
    /// and to the navigation registry right away; both stay subscribed until
    /// [`ProgressListener::destroy`].
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The config is invalid
    /// - No timer was supplied and no tokio runtime is running
    pub fn new(
        source: Arc<dyn ProgressSource>,
        config: TrackingConfig,
        collaborators: Collaborators,
    ) -> Result<Self> {
        config.validate()?;

        let timer: Arc<dyn TimerService> = match collaborators.timer {
            Some(timer) => timer,
            None => Arc::new(
                TokioTimer::from_current().map_err(|e| e.context("Unload timer unavailable"))?,
            ),
        };

        let inner = Arc::new(ListenerInner {
            id: registry::next_listener_id(),
            context_id: source.browsing_context_id(),
            source,
            config,
            timer,
            prompts: collaborators.prompts,
            navigation_registry: collaborators.navigation_registry,
            state: Mutex::new(ListenerState::default()),
        });
        inner.subscribe_side_channels();

        Ok(Self { inner })
    }

    /// Starts tracking a navigation.
    ///
    /// Observers are registered before this returns, so a navigation
    /// triggered right after cannot be missed. If a document is already
    /// loading and the listener resolves on start (without waiting for an
    /// explicit start), the returned future is already resolved and no
    /// navigation is tracked.
    ///
    /// # Arguments
    ///
    /// * `navigation_id` - Correlates failures reported by the navigation registry
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - A navigation is already being tracked ([`Error::AlreadyStarted`])
    /// - The listener was destroyed ([`Error::Destroyed`])
    pub fn start(&self, navigation_id: Option<NavigationId>) -> Result<PendingNavigation> {
        self.inner.start(navigation_id)
    }

    /// Stops tracking and settles the pending navigation.
    ///
    /// Disarms the unload timer, unsubscribes from the progress source and
    /// resolves (or, with `error`, rejects) the pending navigation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotStarted`] if no navigation is being tracked.
    pub fn stop(&self, error: Option<NavigationError>) -> Result<()> {
        self.inner.stop(error)
    }

    /// Stops tracking only if the navigation already started; otherwise does nothing.
    pub fn stop_if_started(&self, error: Option<NavigationError>) {
        let started = {
            let state = self.inner.state.lock();
            state.completion.is_some() && state.tracking.seen_start()
        };
        if started {
            if let Err(e) = self.inner.stop(error) {
                tracing::trace!("{} stop_if_started: {}", self.inner.prefix(), e);
            }
        }
    }

    /// Releases the prompt and navigation-registry subscriptions for good.
    ///
    /// Does not settle a pending navigation; call [`ProgressListener::stop`] first.
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    /// Feeds a progress notification to the listener.
    ///
    /// Sources normally deliver notifications through the observer registered
    /// in [`ProgressListener::start`]; hosts that pump notifications
    /// themselves can call this instead. Ignored while nothing is tracked.
    pub fn handle(&self, signal: Signal) {
        self.inner.dispatch(Input::Signal(signal));
    }

    pub fn id(&self) -> ListenerId {
        self.inner.id
    }

    pub fn browsing_context_id(&self) -> BrowsingContextId {
        self.inner.context_id
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.inner.config
    }

    /// URI of the document currently committed in the navigable.
    pub fn current_uri(&self) -> Option<Url> {
        self.inner.source.current_uri()
    }

    /// Best-known URI of the tracked (or last tracked) navigation.
    pub fn target_uri(&self) -> Option<Url> {
        self.inner.state.lock().tracking.target_uri().cloned()
    }

    pub fn is_loading_document(&self) -> bool {
        self.inner.source.is_loading_document()
    }

    /// Whether the tracked navigation has started.
    pub fn is_started(&self) -> bool {
        self.inner.state.lock().tracking.seen_start()
    }

    /// Whether a navigation is pending.
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().completion.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.lock().tracking.phase()
    }
}

impl std::fmt::Debug for ProgressListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressListener")
            .field("id", &self.inner.id)
            .field("browsing_context_id", &self.inner.context_id)
            .field("pending", &self.is_pending())
            .field("started", &self.is_started())
            .finish()
    }
}

impl ListenerInner {
    fn prefix(&self) -> String {
        format!("[{}] ProgressListener", self.context_id)
    }

    fn subscribe_side_channels(self: &Arc<Self>) {
        let prompt_subscription = match &self.prompts {
            Some(prompts) if self.config.resolve_when_started => {
                let listener = Arc::downgrade(self);
                let handler: PromptHandler = Arc::new(move |event: &PromptEvent| {
                    if let Some(listener) = listener.upgrade() {
                        listener.on_prompt_opened(event);
                    }
                });
                Some(prompts.on_opened(handler))
            }
            _ => None,
        };

        let failure_subscription = self.navigation_registry.as_ref().map(|navigations| {
            let listener = Arc::downgrade(self);
            let handler: NavigationFailedHandler =
                Arc::new(move |event: &NavigationFailedEvent| {
                    if let Some(listener) = listener.upgrade() {
                        listener.on_navigation_failed(event);
                    }
                });
            navigations.on_navigation_failed(handler)
        });

        let mut state = self.state.lock();
        state.prompt_subscription = prompt_subscription;
        state.failure_subscription = failure_subscription;
    }

    fn start(self: &Arc<Self>, navigation_id: Option<NavigationId>) -> Result<PendingNavigation> {
        {
            let state = self.state.lock();
            if state.destroyed {
                return Err(Error::Destroyed);
            }
            if state.completion.is_some() {
                return Err(Error::AlreadyStarted);
            }
        }

        tracing::trace!(
            "{} Start: expectNavigation={} resolveWhenStarted={} unloadTimeout={} waitForExplicitStart={}",
            self.prefix(),
            self.config.expect_navigation,
            self.config.resolve_when_started,
            self.config.unload_timeout_ms,
            self.config.wait_for_explicit_start
        );

        let mut tracking = TrackingState::new(navigation_id.clone(), self.config.target_uri.clone());

        let is_loading = self.source.is_loading_document();
        let document_request = if is_loading {
            self.source.document_request()
        } else {
            None
        };

        if is_loading {
            if let Some(uri) = document_request.as_ref().and_then(RequestInfo::target_uri) {
                tracking.set_target_uri(Some(uri));
            }
            tracing::trace!(
                "{} Document already loading {:?}",
                self.prefix(),
                tracking.target_uri().map(Url::as_str)
            );

            if self.config.resolve_when_started && !self.config.wait_for_explicit_start {
                tracing::trace!(
                    "{} Resolve on document loading if not waiting for a load or a new navigation",
                    self.prefix()
                );
                let outcome = NavigationOutcome {
                    current_uri: self.source.current_uri(),
                    target_uri: tracking.target_uri().cloned(),
                };
                self.state.lock().tracking = tracking;
                return Ok(PendingNavigation::ready(Ok(outcome)));
            }
        }

        let (sender, receiver) = oneshot::channel();
        {
            let mut state = self.state.lock();
            if state.completion.is_some() {
                return Err(Error::AlreadyStarted);
            }
            state.tracking = tracking;
            state.completion = Some(sender);
        }

        let observer: Arc<dyn ProgressObserver> = Arc::new(SignalForwarder {
            listener: Arc::downgrade(self),
        });
        let subscription = self.source.add_listener(observer);

        let (still_pending, started_during_registration) = {
            let mut state = self.state.lock();
            if state.completion.is_some() {
                state.progress_subscription = Some(subscription);
                (true, state.tracking.seen_start())
            } else {
                (false, false)
            }
        };
        if !still_pending {
            // Settled by a signal delivered during registration
            self.source.remove_listener(subscription);
            return Ok(PendingNavigation::waiting(receiver));
        }

        registry::register(ActiveListener {
            id: self.id,
            browsing_context_id: self.context_id,
            navigation_id,
            started_at: Instant::now(),
        });

        if started_during_registration {
            tracing::trace!("{} Navigation started while subscribing", self.prefix());
        } else if is_loading && !self.config.wait_for_explicit_start {
            let start = StateChange {
                request: document_request,
                flags: StateFlags::START,
                status: Status::OK,
            };
            self.dispatch(Input::Signal(Signal::StateChange(start)));
        } else {
            self.apply(TrackingState::wait_for_start(&self.config));
        }

        Ok(PendingNavigation::waiting(receiver))
    }

    fn stop(&self, error: Option<NavigationError>) -> Result<()> {
        let current_uri = self.source.current_uri();

        let (completion, unload_timer, subscription, outcome) = {
            let mut state = self.state.lock();
            let completion = state.completion.take().ok_or(Error::NotStarted)?;
            if state.tracking.target_uri().is_none() {
                state.tracking.set_target_uri(current_uri.clone());
            }
            let outcome = NavigationOutcome {
                current_uri,
                target_uri: state.tracking.target_uri().cloned(),
            };
            (
                completion,
                state.unload_timer.take(),
                state.progress_subscription.take(),
                outcome,
            )
        };

        tracing::trace!(
            "{} stop: has error={}",
            self.prefix(),
            error.is_some()
        );

        if let Some(handle) = unload_timer.and_then(|armed| armed.handle) {
            self.timer.disarm(handle);
        }
        if let Some(subscription) = subscription {
            self.source.remove_listener(subscription);
        }
        registry::unregister(self.id);

        let result = match error {
            Some(error) => Err(Error::Navigation(error)),
            None => Ok(outcome),
        };
        // The caller may have stopped waiting
        let _ = completion.send(result);
        Ok(())
    }

    fn destroy(&self) {
        let (prompt_subscription, failure_subscription) = {
            let mut state = self.state.lock();
            state.destroyed = true;
            (
                state.prompt_subscription.take(),
                state.failure_subscription.take(),
            )
        };

        if let (Some(prompts), Some(id)) = (&self.prompts, prompt_subscription) {
            prompts.off(id);
        }
        if let (Some(navigations), Some(id)) = (&self.navigation_registry, failure_subscription) {
            navigations.off(id);
        }
        tracing::trace!("{} destroyed", self.prefix());
    }

    fn dispatch(self: &Arc<Self>, input: Input) {
        let document = DocumentSnapshot::capture(self.source.as_ref());

        let result = {
            let mut state = self.state.lock();
            if !state.accepts(&input) {
                tracing::trace!("{} Ignoring {:?}", self.prefix(), input);
                return;
            }
            state.tracking.step(input, &document, &self.config)
        };

        let effects = result.unwrap_or_else(|e| {
            tracing::error!("{} {}, stopping", self.prefix(), e);
            vec![Effect::Stop(Some(NavigationError::new(e.to_string())))]
        });
        self.apply(effects);
    }

    fn apply(self: &Arc<Self>, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ArmUnloadTimer(delay) => self.arm_unload_timer(delay),
                Effect::DisarmUnloadTimer => self.disarm_unload_timer(),
                Effect::Stop(error) => {
                    if let Err(e) = self.stop(error) {
                        tracing::trace!("{} {}", self.prefix(), e);
                    }
                    return;
                }
            }
        }
    }

    fn arm_unload_timer(self: &Arc<Self>, delay: Duration) {
        self.disarm_unload_timer();

        let generation = {
            let mut state = self.state.lock();
            // The unload timer only covers the wait for a start
            if state.completion.is_none() || state.tracking.seen_start() {
                return;
            }
            state.timer_generation += 1;
            let generation = state.timer_generation;
            state.unload_timer = Some(ArmedTimer {
                generation,
                handle: None,
            });
            generation
        };

        let listener = Arc::downgrade(self);
        let handle = self.timer.arm(
            delay,
            Box::new(move || {
                if let Some(listener) = listener.upgrade() {
                    listener.on_unload_timer(generation);
                }
            }),
        );

        let attached = {
            let mut state = self.state.lock();
            match state.unload_timer.as_mut() {
                Some(armed) if armed.generation == generation => {
                    armed.handle = Some(handle);
                    true
                }
                _ => false,
            }
        };
        if !attached {
            // Fired or disarmed while arming
            self.timer.disarm(handle);
            return;
        }
        tracing::trace!("{} Armed the unload timer for {:?}", self.prefix(), delay);
    }

    fn disarm_unload_timer(&self) {
        let armed = self.state.lock().unload_timer.take();
        if let Some(handle) = armed.and_then(|armed| armed.handle) {
            self.timer.disarm(handle);
            tracing::trace!("{} Cleared the unload timer", self.prefix());
        }
    }

    fn on_unload_timer(self: &Arc<Self>, generation: u64) {
        let current_uri = self.source.current_uri();
        tracing::trace!(
            "{} No navigation detected: {:?}",
            self.prefix(),
            current_uri.as_ref().map(Url::as_str)
        );
        self.dispatch(Input::UnloadTimerFired {
            generation,
            current_uri,
        });
    }

    fn on_prompt_opened(self: &Arc<Self>, event: &PromptEvent) {
        tracing::trace!(
            "{} A prompt of type={:?} is open",
            self.prefix(),
            event.prompt.prompt_type
        );
        if event.is_before_unload_for(self.source.top_level_context_id()) {
            self.dispatch(Input::BeforeUnloadPrompt);
        }
    }

    fn on_navigation_failed(self: &Arc<Self>, event: &NavigationFailedEvent) {
        tracing::trace!(
            "{} Received \"navigation-failed\" event with error={} for navigation {}",
            self.prefix(),
            event.error_name,
            event.navigation_id
        );
        self.dispatch(Input::NavigationFailed {
            navigation_id: event.navigation_id.clone(),
            error_name: event.error_name.clone(),
        });
    }
}

impl Drop for ListenerInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(subscription) = state.progress_subscription.take() {
            self.source.remove_listener(subscription);
        }
        if state.completion.take().is_some() {
            registry::unregister(self.id);
        }
        if let (Some(prompts), Some(id)) = (&self.prompts, state.prompt_subscription.take()) {
            prompts.off(id);
        }
        if let (Some(navigations), Some(id)) =
            (&self.navigation_registry, state.failure_subscription.take())
        {
            navigations.off(id);
        }
        if let Some(handle) = state.unload_timer.take().and_then(|armed| armed.handle) {
            self.timer.disarm(handle);
        }
    }
}
