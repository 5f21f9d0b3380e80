//! Core abstractions for scriptload
//!
//! This module holds the dependency-tracking engine: request tokenization,
//! the load registry, the completion multiplexer and the continuation
//! handles, tied together by the [`Loader`] coordinator.

pub mod continuation;
pub mod error;
pub mod loader;
pub mod multiplexer;
pub mod registry;
pub mod request;
pub mod scheduler;
pub mod settings;
pub mod traits;


// Re-export commonly used types
pub use continuation::Continuation;
pub use error::{FetchFailure, LoadError, LoadResult};
pub use loader::{FetchCompletion, IntoLabels, Loader, LoaderStats, WhenAction};
pub use request::{label_from_file, tokenize, Request, Tokens};
pub use scheduler::{QueueScheduler, TokioScheduler};
pub use settings::Settings;
pub use traits::*;
