//! Completion multiplexer
//!
//! Pending callbacks are grouped by the canonical form of the label set they
//! wait on. A rescan drains every group whose labels are all satisfied.

use std::collections::BTreeMap;

use log::debug;

use super::traits::Task;

/// Separator used to join labels into a printable fingerprint.
pub const FINGERPRINT_SEPARATOR: &str = "|";

/// Printable key for a label set: deduplicated, sorted, joined. Only used
/// for logging, since labels may themselves contain the separator.
pub fn fingerprint(labels: &[String]) -> String {
    canonical_labels(labels).join(FINGERPRINT_SEPARATOR)
}

fn canonical_labels(labels: &[String]) -> Vec<String> {
    let mut labels = labels.to_vec();
    labels.sort();
    labels.dedup();
    labels
}

/// Table of callbacks waiting on label sets.
///
/// Keyed by the canonical label list, so `["a|b"]` and `["a", "b"]` stay
/// in separate groups. Callbacks within a group run last registered first.
#[derive(Default)]
pub struct CompletionMultiplexer {
    pending: BTreeMap<Vec<String>, Vec<Task>>,
}

impl CompletionMultiplexer {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a callback behind `labels`.
    pub fn enqueue(&mut self, labels: &[String], callback: Task) {
        let labels = canonical_labels(labels);
        debug!("Queuing callback for {}", labels.join(FINGERPRINT_SEPARATOR));
        self.pending.entry(labels).or_default().push(callback);
    }

    /// Remove every group whose labels are all satisfied and return its
    /// callbacks in firing order.
    pub fn take_satisfied<F>(&mut self, is_satisfied: F) -> Vec<Task>
    where
        F: Fn(&str) -> bool,
    {
        let ready: Vec<Vec<String>> = self
            .pending
            .keys()
            .filter(|labels| labels.iter().all(|label| is_satisfied(label.as_str())))
            .cloned()
            .collect();

        let mut callbacks = Vec::new();
        for labels in ready {
            if let Some(group) = self.pending.remove(&labels) {
                debug!(
                    "Dependencies complete for {}, firing {} callbacks",
                    labels.join(FINGERPRINT_SEPARATOR),
                    group.len()
                );
                callbacks.extend(group.into_iter().rev());
            }
        }
        callbacks
    }

    /// Number of label sets with queued callbacks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether callbacks are queued behind exactly this label set.
    pub fn contains(&self, labels: &[String]) -> bool {
        self.pending.contains_key(&canonical_labels(labels))
    }
}
