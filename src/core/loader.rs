//! The loading coordinator
//!
//! [`Loader`] owns the load registry and the completion multiplexer behind a
//! single lock, so counter updates and rescans never interleave. Fetcher
//! dispatch and callbacks always run with the lock released; a callback is
//! free to call back into the loader.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use arc_swap::ArcSwap;
use log::{debug, error};

use crate::config::Config;

use super::{
    continuation::Continuation,
    error::FetchFailure,
    multiplexer::CompletionMultiplexer,
    registry::LoadRegistry,
    request::{tokenize, Request},
    settings::Settings,
    traits::{ResourceFetcher, Scheduler, Task},
};

/// Anything usable as a set of labels to wait on.
pub trait IntoLabels {
    fn into_labels(self) -> Vec<String>;
}

impl IntoLabels for &str {
    fn into_labels(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoLabels for String {
    fn into_labels(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoLabels for Vec<String> {
    fn into_labels(self) -> Vec<String> {
        self
    }
}

impl IntoLabels for Vec<&str> {
    fn into_labels(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoLabels for &[String] {
    fn into_labels(self) -> Vec<String> {
        self.to_vec()
    }
}

impl<const N: usize> IntoLabels for [&str; N] {
    fn into_labels(self) -> Vec<String> {
        self.iter().map(|label| label.to_string()).collect()
    }
}

/// What to do once a set of labels is satisfied.
pub enum WhenAction {
    Callback(Task),
    Load(Request),
}

impl WhenAction {
    pub fn callback<F>(callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        WhenAction::Callback(Box::new(callback))
    }
}

impl From<Request> for WhenAction {
    fn from(request: Request) -> Self {
        WhenAction::Load(request)
    }
}

impl fmt::Debug for WhenAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhenAction::Callback(_) => f.write_str("Callback"),
            WhenAction::Load(request) => f.debug_tuple("Load").field(request).finish(),
        }
    }
}

/// Snapshot of coordinator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderStats {
    pub label_count: usize,
    pub written_count: usize,
    pub in_flight_count: usize,
    pub pending_count: usize,
}

#[derive(Default)]
struct State {
    registry: LoadRegistry,
    multiplexer: CompletionMultiplexer,
}

struct Inner {
    state: Mutex<State>,
    settings: ArcSwap<Settings>,
    fetcher: Arc<dyn ResourceFetcher>,
    scheduler: Arc<dyn Scheduler>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(self: &Arc<Self>, requests: &[Request]) -> Vec<String> {
        let tokens = tokenize(requests);
        let dispatches = {
            let settings = self.settings.load();
            self.state().registry.register(&tokens, &settings)
        };

        for dispatch in dispatches {
            let completion = FetchCompletion {
                inner: Some(Arc::downgrade(self)),
                path: dispatch.path,
                url: dispatch.url.clone(),
            };
            self.fetcher.begin_fetch(dispatch.url, completion);
        }

        // flush waiters even when nothing new was dispatched
        self.rescan();
        tokens.labels
    }

    fn complete(&self, path: &str, result: Result<(), FetchFailure>) {
        match result {
            Ok(()) => debug!("Loaded {path}"),
            Err(err) => error!("{err}"),
        }

        let reached_zero = self.state().registry.complete(path);
        if reached_zero {
            self.rescan();
        }
    }

    fn rescan(&self) {
        let callbacks = {
            let mut state = self.state();
            let State {
                registry,
                multiplexer,
            } = &mut *state;
            multiplexer.take_satisfied(|label| registry.is_satisfied(label))
        };

        for callback in callbacks {
            callback();
        }
    }

    fn register(
        self: &Arc<Self>,
        labels: Vec<String>,
        action: WhenAction,
        on_waiting: Option<Box<dyn FnOnce(&[String]) + '_>>,
    ) {
        let labels: Vec<String> = labels.into_iter().filter(|l| !l.is_empty()).collect();
        let callback = self.action_to_task(action);

        let mut state = self.state();
        let missing = state.registry.missing(&labels);
        if missing.is_empty() {
            drop(state);
            debug!("Waiting for {labels:?}: all complete, deferring callback");
            self.scheduler.defer(callback);
            return;
        }
        state.multiplexer.enqueue(&labels, callback);
        drop(state);

        debug!("Waiting for {labels:?}: missing {missing:?}");
        if let Some(on_waiting) = on_waiting {
            on_waiting(&missing);
        }
    }

    fn action_to_task(self: &Arc<Self>, action: WhenAction) -> Task {
        match action {
            WhenAction::Callback(callback) => callback,
            WhenAction::Load(request) => {
                let weak = Arc::downgrade(self);
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.dispatch(std::slice::from_ref(&request));
                    }
                })
            }
        }
    }
}

/// Completion token for one dispatched fetch.
///
/// Consuming it with [`succeed`](Self::succeed), [`fail`](Self::fail) or
/// [`finish`](Self::finish) reports the outcome exactly once. A token dropped
/// without reporting leaves its labels outstanding forever.
pub struct FetchCompletion {
    inner: Option<Weak<Inner>>,
    path: String,
    url: String,
}

impl FetchCompletion {
    /// URL being fetched, query string included.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Report that the resource loaded.
    pub fn succeed(self) {
        self.finish(Ok(()));
    }

    /// Report a failed fetch. The failure is logged and the path still
    /// completes.
    pub fn fail(self, reason: impl Into<String>) {
        let failure = FetchFailure::new(self.url.clone(), reason);
        self.finish(Err(failure));
    }

    /// Report either outcome.
    pub fn finish(mut self, result: Result<(), FetchFailure>) {
        if let Some(inner) = self.inner.take().and_then(|weak| weak.upgrade()) {
            inner.complete(&self.path, result);
        }
    }
}

impl Drop for FetchCompletion {
    fn drop(&mut self) {
        if self.inner.is_some() {
            debug!("Completion for {} dropped without a result", self.url);
        }
    }
}

impl fmt::Debug for FetchCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCompletion")
            .field("path", &self.path)
            .field("url", &self.url)
            .finish()
    }
}

/// Asynchronous resource-loading coordinator.
///
/// Cloning is cheap and every clone drives the same state.
#[derive(Clone)]
pub struct Loader {
    inner: Arc<Inner>,
}

impl Loader {
    /// Create a loader with no base URL or query string
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::with_settings(Settings::default(), fetcher, scheduler)
    }

    /// Create a loader with the given settings
    pub fn with_settings(
        settings: Settings,
        fetcher: Arc<dyn ResourceFetcher>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                settings: ArcSwap::from_pointee(settings),
                fetcher,
                scheduler,
            }),
        }
    }

    /// Build a loader with the base URL and query string from `config`.
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn ResourceFetcher>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self::with_settings(config.settings(), fetcher, scheduler)
    }

    /// Load a request and return a handle on its labels.
    pub fn load<R: Into<Request>>(&self, request: R) -> Continuation {
        self.load_all([request.into()])
    }

    /// Load several requests as one call.
    pub fn load_all<I>(&self, requests: I) -> Continuation
    where
        I: IntoIterator<Item = Request>,
    {
        let requests: Vec<Request> = requests.into_iter().collect();
        let labels = self.inner.dispatch(&requests);
        Continuation::new(self.clone(), labels)
    }

    /// Run `callback` once every label is satisfied.
    pub fn when<L, F>(&self, labels: L, callback: F)
    where
        L: IntoLabels,
        F: FnOnce() + Send + 'static,
    {
        self.inner
            .register(labels.into_labels(), WhenAction::callback(callback), None);
    }

    /// Load `request` once every label is satisfied.
    pub fn when_load<L, R>(&self, labels: L, request: R)
    where
        L: IntoLabels,
        R: Into<Request>,
    {
        self.inner
            .register(labels.into_labels(), WhenAction::Load(request.into()), None);
    }

    /// Like [`when`](Self::when), reporting the unsatisfied labels to
    /// `on_waiting` if the action has to wait.
    pub fn when_waiting<L, W>(&self, labels: L, action: WhenAction, on_waiting: W)
    where
        L: IntoLabels,
        W: FnOnce(&[String]),
    {
        self.inner
            .register(labels.into_labels(), action, Some(Box::new(on_waiting)));
    }

    /// Register the gates and preload requests of `config`. The returned
    /// handle covers the preload labels.
    pub fn preload(&self, config: &Config) -> Continuation {
        for gate in &config.gates {
            self.when_load(gate.when.clone(), gate.load.clone());
        }
        self.load_all(config.preload.iter().cloned())
    }

    /// Applies to loads made after this call.
    pub fn set_base_url(&self, base_url: Option<&str>) {
        let base_url = base_url.map(str::to_string);
        self.inner.settings.rcu(|settings| Settings {
            base_url: base_url.clone(),
            ..Settings::clone(settings)
        });
    }

    /// Get the current base URL
    pub fn base_url(&self) -> Option<String> {
        self.inner.settings.load().base_url.clone()
    }

    /// Applies to loads made after this call.
    pub fn set_querystring(&self, querystring: Option<&str>) {
        let querystring = querystring.map(str::to_string);
        self.inner.settings.rcu(|settings| Settings {
            querystring: querystring.clone(),
            ..Settings::clone(settings)
        });
    }

    /// Get the current query string
    pub fn querystring(&self) -> Option<String> {
        self.inner.settings.load().querystring.clone()
    }

    /// Outstanding count for a label, `None` if it was never registered.
    pub fn outstanding(&self, label: &str) -> Option<usize> {
        self.inner.state().registry.outstanding(label)
    }

    /// Whether a label is registered with nothing outstanding
    pub fn is_satisfied(&self, label: &str) -> bool {
        self.inner.state().registry.is_satisfied(label)
    }

    /// Whether a normalized path was ever dispatched.
    pub fn was_requested(&self, path: &str) -> bool {
        self.inner.state().registry.was_requested(path)
    }

    /// Get a snapshot of registry and pending-callback sizes
    pub fn stats(&self) -> LoaderStats {
        let state = self.inner.state();
        LoaderStats {
            label_count: state.registry.label_count(),
            written_count: state.registry.written_count(),
            in_flight_count: state.registry.in_flight_count(),
            pending_count: state.multiplexer.len(),
        }
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("settings", &**self.inner.settings.load())
            .field("stats", &self.stats())
            .finish()
    }
}
