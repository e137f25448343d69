//! Identifier types for the tracking layer.
//!
//! A `RevisionKey` identifies one revision counter; a `SubscriberId`
//! identifies one computation that reads counters. Both are plain atomic
//! sequence numbers, unique for the lifetime of the process.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a revision counter.
///
/// This is the handle the tracking layer works in terms of: reads register
/// a dependency on a key, writes notify every subscriber of a key. The
/// counter's actual value lives with its owning scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevisionKey(u64);

impl RevisionKey {
    /// Generate a new unique key.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw key value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for RevisionKey {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a subscriber.
///
/// Each subscriber (computed cell, watcher, or other dependent computation)
/// gets a unique ID when created. The ID is used to record dependencies and
/// avoid duplicate subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}
