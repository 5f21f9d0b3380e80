//! Seams between the coordinator and its collaborators
//!
//! The coordinator never fetches anything or schedules work itself. It hands
//! URLs to a [`ResourceFetcher`] and deferred callbacks to a [`Scheduler`].

use async_trait::async_trait;

use super::{error::FetchFailure, loader::FetchCompletion};

/// Deferred unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks on a later cooperative tick.
pub trait Scheduler: Send + Sync {
    /// Queue `task`. Implementations must never run it inside this call.
    fn defer(&self, task: Task);
}

/// Starts resource fetches.
pub trait ResourceFetcher: Send + Sync {
    /// Begin loading `url`. The fetcher reports the outcome by consuming
    /// `completion`; dropping it unsignalled leaves the resource pending.
    fn begin_fetch(&self, url: String, completion: FetchCompletion);
}

/// Async form of a fetcher, adapted onto a runtime by
/// [`SpawnFetcher`](crate::fetch::SpawnFetcher).
#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<(), FetchFailure>;
}
