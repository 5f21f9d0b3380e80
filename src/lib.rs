//! scriptload: an asynchronous resource-loading coordinator.
//!
//! Resources are requested in labelled groups. The [`Loader`] dispatches each
//! distinct path once, counts outstanding resources per label, and fires
//! callbacks once the label sets they wait on are complete.

pub mod config;
pub mod core;
pub mod fetch;
pub mod logging;

pub use crate::core::{Continuation, Loader, Request};
