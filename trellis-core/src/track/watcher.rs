//! Watcher
//!
//! A watcher is an eager dependent: it runs a closure inside a tracking
//! frame and re-runs it synchronously whenever any revision counter it
//! touched is bumped. Framework adapters build re-render triggers out of
//! watchers; tests use them to observe notification behavior.
//!
//! Before each run the watcher's old subscriptions are cleared, so a run
//! that takes a different branch stops depending on counters it no longer
//! reads.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::frame::TrackingFrame;
use super::key::SubscriberId;
use super::tracker::{Dependent, TrackHandle, Tracker};

struct WatcherInner {
    subscriber_id: SubscriberId,
    run: Box<dyn Fn() + Send + Sync>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl WatcherInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        Tracker::clear_subscriber(self.subscriber_id);

        let _frame = TrackingFrame::enter(self.subscriber_id);
        (self.run)();

        self.run_count.fetch_add(1, Ordering::SeqCst);
    }
}

impl Dependent for WatcherInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_stale(&self) {
        // Eager: nothing to record, schedule() follows immediately.
    }

    fn schedule(&self) {
        self.execute();
    }

    fn is_eager(&self) -> bool {
        true
    }
}

/// An eagerly re-running observer of revision counters.
///
/// # Example
///
/// ```rust,ignore
/// let scope = Scope::new(None);
/// scope.define("count", VarOptions::value(0))?;
///
/// let s = scope.clone();
/// let watcher = Watcher::new(move || {
///     println!("count is {:?}", s.get("count"));
/// });
///
/// scope.set("count", 5); // watcher re-runs, prints the new value
/// ```
pub struct Watcher {
    inner: Arc<WatcherInner>,
    _registration: TrackHandle,
}

impl Watcher {
    /// Create a watcher and run it once to establish its subscriptions.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new(WatcherInner {
            subscriber_id: SubscriberId::new(),
            run: Box::new(run),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        let registration = Tracker::register(inner.clone());
        inner.execute();

        Self {
            inner,
            _registration: registration,
        }
    }

    /// The watcher's subscriber ID.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// How many times the closure has run (including the initial run).
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Stop the watcher. It will never run again.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    /// Whether the watcher has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("subscriber_id", &self.inner.subscriber_id)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
