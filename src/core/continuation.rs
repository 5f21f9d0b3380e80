//! Chainable completion handles
//!
//! Every [`Loader::load`] returns a [`Continuation`] over the labels it just
//! requested. Chaining more loads accumulates labels, so
//! `load(a).then_load(b).then(f)` runs `f` only after both `a` and `b`.

use std::future::Future;

use futures::channel::oneshot;

use super::{
    error::{LoadError, LoadResult},
    loader::Loader,
    request::Request,
};

/// Immutable handle on an ordered list of labels.
#[derive(Clone, Debug)]
pub struct Continuation {
    loader: Loader,
    labels: Vec<String>,
}

impl Continuation {
    pub(crate) fn new(loader: Loader, labels: Vec<String>) -> Self {
        Self { loader, labels }
    }

    /// Labels this handle waits on.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Run `callback` once every label is satisfied. The dependency list is
    /// unchanged.
    pub fn then<F>(&self, callback: F) -> Continuation
    where
        F: FnOnce() + Send + 'static,
    {
        self.loader.when(self.labels.clone(), callback);
        self.clone()
    }

    /// Load `request` once every label is satisfied. The returned handle also
    /// waits on the labels of `request`.
    pub fn then_load<R: Into<Request>>(&self, request: R) -> Continuation {
        let request = request.into();
        let mut labels = self.labels.clone();
        labels.extend(request.labels());

        self.loader.when_load(self.labels.clone(), request);
        Continuation::new(self.loader.clone(), labels)
    }

    /// [`then_load`](Self::then_load) for several requests at once.
    pub fn then_load_all<I>(&self, requests: I) -> Continuation
    where
        I: IntoIterator<Item = Request>,
    {
        self.then_load(Request::Nested(requests.into_iter().collect()))
    }

    /// Resolves once every label is satisfied.
    ///
    /// The gate is registered when this is called, not when the future is
    /// first polled. Resolves to [`LoadError::Abandoned`] if the loader is
    /// dropped first.
    pub fn wait(&self) -> impl Future<Output = LoadResult<()>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.loader.when(self.labels.clone(), move || {
            let _ = tx.send(());
        });
        async move { rx.await.map_err(LoadError::from) }
    }
}
