//! Revision Ledger
//!
//! Every scope keeps one revision counter per variable name, plus a
//! key-set counter standing for "the set of names itself changed".
//!
//! Counters are the bridge to the tracking layer: an accessor read touches
//! the counter (subscribing the current computation), a value write or a
//! redeclaration bumps it (notifying every subscriber). The numeric
//! revision only ever grows.
//!
//! A name's counter is created on first demand and survives
//! redeclarations, so a consumer subscribed to `count` keeps its
//! subscription when `count` is redeclared with a different backing cell.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::track::{RevisionKey, Tracker};

/// A monotonically-increasing revision counter for one ledger slot.
pub struct RevisionCounter {
    key: RevisionKey,
    revision: AtomicU64,
}

impl RevisionCounter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            key: RevisionKey::new(),
            revision: AtomicU64::new(0),
        })
    }

    /// The tracking key for this counter.
    pub fn key(&self) -> RevisionKey {
        self.key
    }

    /// The current revision number.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Register a read of this counter with the tracking layer.
    pub fn touch(&self) {
        Tracker::track_read(self.key);
    }

    /// Increment the revision without notifying. Callers that batch
    /// several counters advance them all, then notify once.
    pub(crate) fn advance(&self) {
        self.revision.fetch_add(1, Ordering::Release);
    }

    /// Increment the revision and notify every subscriber.
    pub fn bump(&self) {
        self.advance();
        Tracker::notify_write(self.key);
    }
}

impl std::fmt::Debug for RevisionCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionCounter")
            .field("key", &self.key)
            .field("revision", &self.revision())
            .finish()
    }
}

/// Per-scope name -> counter map plus the key-set fallback counter.
pub struct RevisionLedger {
    counters: RwLock<HashMap<String, Arc<RevisionCounter>>>,
    key_set: Arc<RevisionCounter>,
}

impl RevisionLedger {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            key_set: RevisionCounter::new(),
        }
    }

    /// The counter for `name`, created on first use.
    pub fn counter(&self, name: &str) -> Arc<RevisionCounter> {
        if let Some(counter) = self.counters.read().get(name) {
            return counter.clone();
        }

        self.counters
            .write()
            .entry(name.to_owned())
            .or_insert_with(RevisionCounter::new)
            .clone()
    }

    /// The counter standing for "this scope's key set changed".
    ///
    /// Consumers that enumerate names subscribe here; declarations that
    /// add or re-alias names bump it.
    pub fn key_set(&self) -> &Arc<RevisionCounter> {
        &self.key_set
    }

    /// Advance every counter in the ledger (key-set counter included) and
    /// notify their subscribers once each.
    ///
    /// Used on re-parenting: anything resolved through this scope may now
    /// resolve differently, and every chained lookup subscribed to one of
    /// these counters on its way past.
    pub fn bump_all(&self) {
        let mut counters: Vec<Arc<RevisionCounter>> =
            self.counters.read().values().cloned().collect();
        counters.push(self.key_set.clone());

        for counter in &counters {
            counter.advance();
        }
        Tracker::notify_many(counters.iter().map(|counter| counter.key()));
    }
}

impl Default for RevisionLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RevisionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionLedger")
            .field("names", &self.counters.read().len())
            .field("key_set", &self.key_set)
            .finish()
    }
}
