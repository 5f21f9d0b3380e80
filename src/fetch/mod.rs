//! Resource fetchers
//!
//! [`SpawnFetcher`] adapts any async [`Fetch`] implementation onto a tokio
//! runtime so it can serve as the loader's [`ResourceFetcher`].

pub mod fs;

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::core::{
    error::LoadResult,
    loader::FetchCompletion,
    traits::{Fetch, ResourceFetcher},
};

pub use fs::FsFetcher;

/// Runs each fetch as its own task on a tokio runtime.
pub struct SpawnFetcher<F> {
    fetch: Arc<F>,
    handle: Handle,
}

impl<F: Fetch> SpawnFetcher<F> {
    /// Create a fetcher spawning onto `handle`
    pub fn new(fetch: F, handle: Handle) -> Self {
        Self {
            fetch: Arc::new(fetch),
            handle,
        }
    }

    /// Fetcher bound to the runtime of the calling context.
    pub fn current(fetch: F) -> LoadResult<Self> {
        Ok(Self::new(fetch, Handle::try_current()?))
    }
}

impl<F: Fetch> ResourceFetcher for SpawnFetcher<F> {
    fn begin_fetch(&self, url: String, completion: FetchCompletion) {
        let fetch = self.fetch.clone();
        self.handle.spawn(async move {
            let result = fetch.fetch(&url).await;
            completion.finish(result);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::core::{FetchFailure, Loader, Request, TokioScheduler};

    /// Sleeps briefly, fails any URL containing "missing".
    #[derive(Default)]
    struct SlowFetch {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetch for Arc<SlowFetch> {
        async fn fetch(&self, url: &str) -> Result<(), FetchFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            if url.contains("missing") {
                Err(FetchFailure::new(url, "not found"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_loads_complete_once() {
        let _ = env_logger::builder().is_test(true).try_init();
        let fetch = Arc::new(SlowFetch::default());
        let loader = Loader::new(
            Arc::new(SpawnFetcher::current(fetch.clone()).unwrap()),
            Arc::new(TokioScheduler::current().unwrap()),
        );

        let fired = Arc::new(AtomicUsize::new(0));
        let mut waits = Vec::new();
        for i in 0..20 {
            let counter = fired.clone();
            let handle = loader
                .load(vec![
                    format!("lib/shared{}.js", i % 3),
                    format!("app/page{i}.js"),
                ])
                .then_load(Request::labeled("missing", ["missing.js"]))
                .then(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            waits.push(handle.wait());
        }

        for wait in waits {
            tokio::time::timeout(Duration::from_secs(5), wait)
                .await
                .unwrap()
                .unwrap();
        }

        // three shared files, twenty pages, one failing file
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 24);
        assert_eq!(loader.stats().in_flight_count, 0);
        assert!(loader.is_satisfied("missing"));

        // `then` callbacks and `wait` gates share label sets; give the
        // remaining callbacks a moment to land
        tokio::time::timeout(Duration::from_secs(5), async {
            while fired.load(Ordering::SeqCst) < 20 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }
}
