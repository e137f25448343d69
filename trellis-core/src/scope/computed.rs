//! Computed Cells
//!
//! A computed cell derives its value from a getter and caches the result.
//!
//! 1. On first read, the getter runs inside a tracking frame; every counter
//!    it touches becomes a dependency.
//!
//! 2. Later reads return the cache while no dependency has changed.
//!
//! 3. When a dependency is bumped, the cell is marked stale and the owning
//!    descriptor's revision counter is bumped once, so consumers of the
//!    variable re-evaluate. The getter itself does not re-run until the
//!    next read (lazy recomputation).
//!
//! An optional setter makes the variable writable; the setter writes
//! through to other variables, which bump their own counters. Without a
//! setter, a write is accepted but has no durable effect and is surfaced
//! with a warning so the mistake is discoverable.

use std::sync::Arc;

use parking_lot::RwLock;

use super::revision::RevisionCounter;
use crate::track::{Dependent, SubscriberId, TrackHandle, Tracker, TrackingFrame};
use crate::value::Value;

pub(crate) type Getter = Box<dyn Fn() -> Value + Send + Sync>;
pub(crate) type Setter = Box<dyn Fn(Value) + Send + Sync>;

/// Staleness of the cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComputedState {
    /// Cache is up to date.
    Clean,
    /// A dependency was bumped; the cache may be out of date.
    MaybeDirty,
    /// The cell has never computed (or was explicitly invalidated).
    Dirty,
}

struct ComputedInner {
    subscriber_id: SubscriberId,
    name: String,
    get: Getter,
    set: Option<Setter>,
    cached: RwLock<Option<Value>>,
    state: RwLock<ComputedState>,
    /// The owning descriptor's revision counter, bumped on invalidation.
    counter: Arc<RevisionCounter>,
}

impl Dependent for ComputedInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_stale(&self) {
        let mut state = self.state.write();
        if *state == ComputedState::Clean {
            *state = ComputedState::MaybeDirty;
            drop(state);
            // One bump per invalidation: consumers of the variable get
            // notified, and the next read recomputes.
            self.counter.bump();
        }
    }

    fn schedule(&self) {
        // Lazy: recomputation happens on the next read.
    }

    fn is_eager(&self) -> bool {
        false
    }
}

impl ComputedInner {
    fn read(&self) -> Value {
        if *self.state.read() == ComputedState::Clean {
            if let Some(value) = self.cached.read().clone() {
                return value;
            }
        }
        self.recompute()
    }

    fn recompute(&self) -> Value {
        // Re-collect dependencies from scratch: a getter that branches may
        // read different variables on different runs.
        Tracker::clear_subscriber(self.subscriber_id);

        let _frame = TrackingFrame::enter(self.subscriber_id);
        let value = (self.get)();

        *self.cached.write() = Some(value.clone());
        *self.state.write() = ComputedState::Clean;

        value
    }

    fn write(&self, value: Value) {
        match &self.set {
            Some(set) => set(value),
            None => {
                tracing::warn!(
                    variable = %self.name,
                    "write to computed variable without a setter has no effect"
                );
            }
        }
    }
}

/// A memoized derived cell. Cloning shares state.
pub(crate) struct ComputedCell {
    inner: Arc<ComputedInner>,
    _registration: TrackHandle,
}

impl ComputedCell {
    /// Create a computed cell. `get` may be omitted for set-only variables,
    /// whose reads yield `Undefined`.
    pub(crate) fn new(
        name: String,
        counter: Arc<RevisionCounter>,
        get: Option<Getter>,
        set: Option<Setter>,
    ) -> Self {
        let inner = Arc::new(ComputedInner {
            subscriber_id: SubscriberId::new(),
            name,
            get: get.unwrap_or_else(|| Box::new(|| Value::Undefined)),
            set,
            cached: RwLock::new(None),
            state: RwLock::new(ComputedState::Dirty),
            counter,
        });

        let registration = Tracker::register(inner.clone());

        Self {
            inner,
            _registration: registration,
        }
    }

    pub(crate) fn get(&self) -> Value {
        self.inner.read()
    }

    pub(crate) fn set(&self, value: Value) {
        self.inner.write(value)
    }

    #[cfg(test)]
    fn state(&self) -> ComputedState {
        *self.inner.state.read()
    }
}
