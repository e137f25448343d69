//! Variable Descriptors
//!
//! A descriptor binds a name to a backing cell and a revision counter. It
//! is the unit the tables store and the accessor dispatches through: a
//! read touches the counter (subscribing the current computation) and then
//! reads the cell; a write hands the counter to the cell so value slots
//! can bump it.
//!
//! Redeclaring a name replaces the whole descriptor; the name's counter is
//! shared between old and new descriptor through the ledger, so existing
//! subscribers survive the swap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::cell::Cell;
use super::revision::RevisionCounter;
use crate::value::Value;

#[cfg(feature = "devtools")]
use super::context::ScopeId;
#[cfg(feature = "devtools")]
use parking_lot::Mutex;
#[cfg(feature = "devtools")]
use std::collections::HashSet;

/// Unique identifier for a variable descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u64);

impl VarId {
    /// Generate a new unique descriptor ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for VarId {
    fn default() -> Self {
        Self::new()
    }
}

/// What kind of cell backs a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Mutable value slot.
    Value,
    /// Derived value with memoized caching.
    Computed,
    /// Indirection resolved from the ancestor chain on each access.
    Inherited,
}

/// One declared variable: name, exposure, backing cell, revision counter.
pub(crate) struct VarDescriptor {
    id: VarId,
    name: String,
    expose_as: Option<String>,
    cell: Cell,
    counter: Arc<RevisionCounter>,
    #[cfg(feature = "devtools")]
    debug: VarDebugState,
}

impl VarDescriptor {
    pub(crate) fn new(
        id: VarId,
        name: String,
        expose_as: Option<String>,
        cell: Cell,
        counter: Arc<RevisionCounter>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            name,
            expose_as,
            cell,
            counter,
            #[cfg(feature = "devtools")]
            debug: VarDebugState::new(),
        })
    }

    #[cfg_attr(not(feature = "devtools"), allow(dead_code))]
    pub(crate) fn id(&self) -> VarId {
        self.id
    }

    #[cfg_attr(not(feature = "devtools"), allow(dead_code))]
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// The name descendants see this variable under, `None` if private.
    pub(crate) fn expose_as(&self) -> Option<&str> {
        self.expose_as.as_deref()
    }

    pub(crate) fn kind(&self) -> CellKind {
        self.cell.kind()
    }

    #[cfg_attr(not(feature = "devtools"), allow(dead_code))]
    pub(crate) fn cell(&self) -> &Cell {
        &self.cell
    }

    pub(crate) fn counter(&self) -> &Arc<RevisionCounter> {
        &self.counter
    }

    /// Accessor read: subscribe, then produce the cell's current value.
    pub(crate) fn read(&self) -> Value {
        self.counter.touch();
        self.cell.read()
    }

    /// Accessor write: dispatch to the cell with this descriptor's counter.
    pub(crate) fn write(&self, value: Value) {
        self.cell.write(value, &self.counter);
    }

    #[cfg(feature = "devtools")]
    pub(crate) fn debug(&self) -> &VarDebugState {
        &self.debug
    }
}

impl std::fmt::Debug for VarDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VarDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("expose_as", &self.expose_as)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Usage and inheritance bookkeeping for one descriptor.
///
/// `used_by` holds every scope that currently reads or writes through this
/// descriptor; `inherited_by` holds every inherited variable currently
/// resolving to it. Both are ordinary sets: ownership in the engine is
/// expressed through explicit scope lifecycles, so removal on dispose is
/// the engine's responsibility.
#[cfg(feature = "devtools")]
pub(crate) struct VarDebugState {
    used_by: Mutex<HashSet<ScopeId>>,
    inherited_by: Mutex<HashSet<VarId>>,
}

#[cfg(feature = "devtools")]
impl VarDebugState {
    fn new() -> Self {
        Self {
            used_by: Mutex::new(HashSet::new()),
            inherited_by: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn insert_used_by(&self, scope: ScopeId) {
        self.used_by.lock().insert(scope);
    }

    pub(crate) fn remove_used_by(&self, scope: ScopeId) {
        self.used_by.lock().remove(&scope);
    }

    pub(crate) fn used_by_snapshot(&self) -> Vec<ScopeId> {
        let mut scopes: Vec<ScopeId> = self.used_by.lock().iter().copied().collect();
        scopes.sort();
        scopes
    }

    pub(crate) fn insert_inherited_by(&self, var: VarId) {
        self.inherited_by.lock().insert(var);
    }

    pub(crate) fn remove_inherited_by(&self, var: VarId) {
        self.inherited_by.lock().remove(&var);
    }

    pub(crate) fn clear_inherited_by(&self) {
        self.inherited_by.lock().clear();
    }

    pub(crate) fn inherited_by_snapshot(&self) -> Vec<VarId> {
        let mut vars: Vec<VarId> = self.inherited_by.lock().iter().copied().collect();
        vars.sort();
        vars
    }
}
