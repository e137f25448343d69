//! Tracker
//!
//! The tracker is the coordinator between revision counters and their
//! dependents. It owns two registries:
//!
//! 1. subscriber ID -> weak reference to the dependent computation
//! 2. revision key -> set of subscriber IDs that read it
//!
//! Touching a counter inside a tracking frame records the dependency here;
//! bumping a counter looks up the key's subscribers, marks every one stale,
//! and synchronously re-runs the eager ones (watchers). Lazy dependents
//! (computed cells) recompute on their next read.
//!
//! There is no batching or coalescing: a bump returns only after every
//! dependent has been notified, so a tracking read issued strictly after a
//! bump always sees the new state.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;

use super::frame::TrackingFrame;
use super::key::{RevisionKey, SubscriberId};

/// A computation that depends on revision counters.
pub trait Dependent: Send + Sync {
    /// The subscriber ID for this dependent.
    fn subscriber_id(&self) -> SubscriberId;

    /// Mark this dependent as potentially out of date.
    fn mark_stale(&self);

    /// Re-run this dependent (eager dependents only).
    fn schedule(&self);

    /// Whether this dependent re-runs on notification (watcher) or waits
    /// for its next read (computed cell).
    fn is_eager(&self) -> bool;
}

/// Handle to a registered dependent.
///
/// Dropping this handle unregisters the dependent from the tracker.
pub struct TrackHandle {
    subscriber_id: SubscriberId,
}

impl Drop for TrackHandle {
    fn drop(&mut self) {
        Tracker::unregister(self.subscriber_id);
    }
}

/// The global tracking coordinator.
pub struct Tracker;

static REGISTRY: OnceLock<DashMap<SubscriberId, Weak<dyn Dependent>>> = OnceLock::new();
static KEY_SUBSCRIBERS: OnceLock<DashMap<RevisionKey, HashSet<SubscriberId>>> = OnceLock::new();

fn registry() -> &'static DashMap<SubscriberId, Weak<dyn Dependent>> {
    REGISTRY.get_or_init(DashMap::new)
}

fn key_subscribers() -> &'static DashMap<RevisionKey, HashSet<SubscriberId>> {
    KEY_SUBSCRIBERS.get_or_init(DashMap::new)
}

impl Tracker {
    /// Register a dependent with the tracker.
    ///
    /// Returns a handle that unregisters the dependent when dropped.
    pub fn register(dependent: Arc<dyn Dependent>) -> TrackHandle {
        let id = dependent.subscriber_id();
        registry().insert(id, Arc::downgrade(&dependent));
        TrackHandle { subscriber_id: id }
    }

    /// Unregister a dependent and drop all of its key subscriptions.
    fn unregister(id: SubscriberId) {
        registry().remove(&id);
        Self::clear_subscriber(id);
    }

    /// Record a read of `key` by the currently-running computation.
    ///
    /// No-op outside of a tracking frame, so plain untracked reads cost a
    /// thread-local check and nothing more.
    pub fn track_read(key: RevisionKey) {
        if let Some(subscriber) = TrackingFrame::current_subscriber() {
            TrackingFrame::record(key);
            key_subscribers().entry(key).or_default().insert(subscriber);
        }
    }

    /// Drop every key subscription held by `subscriber`.
    ///
    /// Called before a dependent re-runs, so stale dependencies from the
    /// previous run do not keep re-triggering it.
    pub fn clear_subscriber(subscriber: SubscriberId) {
        for mut entry in key_subscribers().iter_mut() {
            entry.value_mut().remove(&subscriber);
        }
    }

    /// Notify every subscriber of `key` that it changed.
    pub fn notify_write(key: RevisionKey) {
        Self::notify_many([key]);
    }

    /// Notify the subscribers of several keys, each dependent at most
    /// once.
    ///
    /// All reached dependents are marked stale first; eager dependents are
    /// then re-run. Guards are released before any dependent code runs, so
    /// a dependent may itself bump counters (invalidation cascades).
    pub fn notify_many(keys: impl IntoIterator<Item = RevisionKey>) {
        let mut seen: HashSet<SubscriberId> = HashSet::new();
        let mut eager = Vec::new();

        for key in keys {
            let subscribers: Vec<SubscriberId> = key_subscribers()
                .get(&key)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();

            for id in subscribers {
                if !seen.insert(id) {
                    continue;
                }
                let weak = registry().get(&id).map(|entry| entry.value().clone());
                if let Some(dependent) = weak.and_then(|w| w.upgrade()) {
                    dependent.mark_stale();
                    if dependent.is_eager() {
                        eager.push(dependent);
                    }
                }
            }
        }

        for dependent in eager {
            dependent.schedule();
        }
    }

    /// Whether a tracking frame is active on this thread.
    pub fn is_tracking() -> bool {
        TrackingFrame::is_active()
    }
}
