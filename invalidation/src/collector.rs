//! Thread-safe collection of per-key sync outcomes.
//!
//! A [`PrefixCoverTree`](prefix_cover::PrefixCoverTree) has a single writer,
//! while uploads usually run in parallel. Workers report into a shared
//! [`Collector`]; the tree is built from its [`Classification`] afterwards.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::debug;

/// Outcome of syncing one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Uploaded, replaced or deleted: must be invalidated.
    Changed,
    /// Present and untouched: must stay cached.
    Unchanged,
}

/// Collects key statuses from any number of threads.
///
/// A key reported both ways ends up [`Status::Changed`].
#[derive(Debug, Default)]
pub struct Collector {
    inner: Mutex<BTreeMap<String, Status>>,
}

impl Collector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `key` as changed.
    pub fn changed(&self, key: impl Into<String>) {
        self.record(key.into(), Status::Changed);
    }

    /// Report `key` as unchanged.
    pub fn unchanged(&self, key: impl Into<String>) {
        self.record(key.into(), Status::Unchanged);
    }

    /// Report `key` with an explicit status.
    pub fn record(&self, key: String, status: Status) {
        let mut map = self.inner.lock();
        match map.entry(key) {
            Entry::Vacant(e) => {
                e.insert(status);
            }
            Entry::Occupied(mut e) => {
                if status == Status::Changed && *e.get() == Status::Unchanged {
                    debug!(key = %e.key(), "key reported changed after unchanged");
                    e.insert(Status::Changed);
                }
            }
        }
    }

    /// Number of distinct keys reported.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Number of keys currently classified as changed.
    pub fn changed_count(&self) -> usize {
        self.inner
            .lock()
            .values()
            .filter(|&&s| s == Status::Changed)
            .count()
    }

    /// Consume the collector, splitting keys by status.
    pub fn into_classification(self) -> Classification {
        let mut classification = Classification::default();
        for (key, status) in self.inner.into_inner() {
            match status {
                Status::Changed => classification.changed.push(key),
                Status::Unchanged => classification.unchanged.push(key),
            }
        }
        classification
    }
}

/// Keys split by sync outcome. Each list is sorted and the two are disjoint
/// when produced by a [`Collector`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Keys to invalidate.
    pub changed: Vec<String>,
    /// Keys that must not be invalidated.
    pub unchanged: Vec<String>,
}

impl Classification {
    /// Build a classification from two key lists, resolving overlaps the way
    /// a [`Collector`] does.
    pub fn from_lists<C, U>(changed: C, unchanged: U) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        U: IntoIterator,
        U::Item: Into<String>,
    {
        let collector = Collector::new();
        for key in changed {
            collector.changed(key);
        }
        for key in unchanged {
            collector.unchanged(key);
        }
        collector.into_classification()
    }

    /// Total number of keys.
    pub fn len(&self) -> usize {
        self.changed.len() + self.unchanged.len()
    }

    /// Check if there are no keys at all.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.unchanged.is_empty()
    }
}
