//! Load registry
//!
//! Owns the written-set of dispatched paths and the per-label outstanding
//! counters. It never talks to the fetcher itself: [`LoadRegistry::register`]
//! returns the dispatches the caller must start once the lock is released.

use std::collections::HashMap;

use log::{debug, warn};

use super::{request::Tokens, settings::Settings};

/// Dispatch state of a normalized path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathState {
    /// Fetch running; completion decrements every listed label.
    InFlight(Vec<String>),
    Complete,
}

/// A fetch to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Normalized path, the written-set key.
    pub path: String,
    /// Path with the query string appended.
    pub url: String,
}

/// Written-set and outstanding-count table.
#[derive(Debug, Default)]
pub struct LoadRegistry {
    remaining: HashMap<String, usize>,
    written: HashMap<String, PathState>,
}

impl LoadRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register tokenized requests, returning the paths that must be fetched.
    pub fn register(&mut self, tokens: &Tokens, settings: &Settings) -> Vec<Dispatch> {
        let mut dispatches = Vec::new();

        for (label, files) in tokens.pairs() {
            self.remaining.entry(label.to_string()).or_insert(0);

            for file in files {
                let path = settings.resolve(file);
                if path.is_empty() {
                    continue;
                }

                match self.written.get_mut(&path) {
                    Some(PathState::InFlight(labels)) => {
                        if !labels.iter().any(|l| l == label) {
                            labels.push(label.to_string());
                            *self.remaining.entry(label.to_string()).or_insert(0) += 1;
                        }
                        debug!("Path {path} already in flight, attached label {label}");
                    }
                    Some(PathState::Complete) => {
                        debug!("Path {path} already loaded");
                    }
                    None => {
                        *self.remaining.entry(label.to_string()).or_insert(0) += 1;
                        self.written
                            .insert(path.clone(), PathState::InFlight(vec![label.to_string()]));
                        let url = settings.url_for(&path);
                        debug!("Loading {url} with label {label}");
                        dispatches.push(Dispatch { path, url });
                    }
                }
            }
        }

        dispatches
    }

    /// Mark a path finished. Returns true if any label reached zero.
    pub fn complete(&mut self, path: &str) -> bool {
        let labels = match self.written.get_mut(path) {
            Some(state) => match std::mem::replace(state, PathState::Complete) {
                PathState::InFlight(labels) => labels,
                PathState::Complete => {
                    warn!("Ignoring repeated completion for {path}");
                    return false;
                }
            },
            None => {
                warn!("Ignoring completion for unknown path {path}");
                return false;
            }
        };

        let mut reached_zero = false;
        for label in labels {
            match self.remaining.get_mut(&label) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    if *count == 0 {
                        debug!("Label {label} complete");
                        reached_zero = true;
                    }
                }
                _ => warn!("Outstanding count for label {label} would go negative"),
            }
        }
        reached_zero
    }

    /// Outstanding count for a label, `None` if never registered.
    pub fn outstanding(&self, label: &str) -> Option<usize> {
        self.remaining.get(label).copied()
    }

    /// Registered and nothing outstanding.
    pub fn is_satisfied(&self, label: &str) -> bool {
        self.remaining.get(label) == Some(&0)
    }

    /// Unsatisfied labels, deduplicated, in first-seen order.
    pub fn missing(&self, labels: &[String]) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for label in labels {
            if !self.is_satisfied(label) && !missing.contains(label) {
                missing.push(label.clone());
            }
        }
        missing
    }

    /// Whether a normalized path was ever dispatched
    pub fn was_requested(&self, path: &str) -> bool {
        self.written.contains_key(path)
    }

    /// Get the number of registered labels
    pub fn label_count(&self) -> usize {
        self.remaining.len()
    }

    /// Get the number of paths ever dispatched
    pub fn written_count(&self) -> usize {
        self.written.len()
    }

    /// Get the number of paths still being fetched
    pub fn in_flight_count(&self) -> usize {
        self.written
            .values()
            .filter(|state| matches!(state, PathState::InFlight(_)))
            .count()
    }
}
