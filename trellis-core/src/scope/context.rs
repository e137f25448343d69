//! Scope Nodes
//!
//! A scope is one node in the variable-scope tree, one per component
//! instance. It owns:
//!
//! - the self table: every variable declared in this scope, private ones
//!   included;
//! - the gateway table: only the exposed subset, under exposure names;
//!   this, not the self table, is what children chain onto;
//! - the revision ledger for its names;
//! - a parent link, swappable for adapter-driven remounts.
//!
//! [`Scope`] is a cheap-to-clone handle; the handle itself is the stable
//! identity consumers hold (`Scope::id`, `Scope::ptr_eq`), no matter how
//! the host framework wraps it.
//!
//! Reads resolve through the self table's fallback chain: own declarations
//! shadow ancestors totally, unshadowed names fall through to the nearest
//! ancestor exposing them. A read that resolves nothing yields
//! [`Value::Undefined`] but stays subscribed to the name along the chain,
//! so the reader is re-notified when some scope later declares it.
//!
//! Disposal is terminal: it unlinks this scope from the usage and
//! inheritance bookkeeping and must come after the scope's own subtree is
//! disposed (children are not disposed recursively). Reading from or
//! declaring into a disposed scope is unsupported; dev builds assert.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::define::{self, DefineError, VarOptions};
use super::revision::RevisionLedger;
use super::table::VarTable;
use crate::value::Value;

#[cfg(feature = "devtools")]
use super::cell::Cell;
#[cfg(feature = "devtools")]
use super::descriptor::{VarDescriptor, VarId};
#[cfg(feature = "devtools")]
use parking_lot::Mutex;
#[cfg(feature = "devtools")]
use std::collections::HashMap;
#[cfg(feature = "devtools")]
use std::sync::Weak;

/// Unique identifier for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    /// Generate a new unique scope ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct ScopeInner {
    id: ScopeId,
    parent: RwLock<Option<Scope>>,
    /// Self table: all variables declared here.
    pub(crate) vars: Arc<VarTable>,
    /// Gateway table: the exposed subset, what children chain onto.
    pub(crate) exposed: Arc<VarTable>,
    pub(crate) ledger: Arc<RevisionLedger>,
    disposed: AtomicBool,
    /// Descriptors this scope has read or written, for dispose cleanup.
    #[cfg(feature = "devtools")]
    used: Mutex<HashMap<VarId, Weak<VarDescriptor>>>,
    /// Own descriptors backed by inherited cells, for dispose cleanup.
    #[cfg(feature = "devtools")]
    pub(crate) inheriting: Mutex<Vec<Weak<VarDescriptor>>>,
}

impl ScopeInner {
    pub(crate) fn parent(&self) -> Option<Scope> {
        self.parent.read().clone()
    }
}

/// Handle to one node in the scope tree.
#[derive(Clone)]
pub struct Scope {
    pub(crate) inner: Arc<ScopeInner>,
}

impl Scope {
    /// Create a scope, chained onto `parent`'s gateway table if given.
    ///
    /// O(1): no variables are copied; unshadowed reads fall through the
    /// chain at access time.
    pub fn new(parent: Option<&Scope>) -> Self {
        let fallback = parent.map(|p| p.inner.exposed.clone());
        let ledger = Arc::new(RevisionLedger::new());

        Self {
            inner: Arc::new(ScopeInner {
                id: ScopeId::new(),
                parent: RwLock::new(parent.cloned()),
                vars: VarTable::new(ledger.clone(), fallback.clone()),
                exposed: VarTable::new(ledger.clone(), fallback),
                ledger,
                disposed: AtomicBool::new(false),
                #[cfg(feature = "devtools")]
                used: Mutex::new(HashMap::new()),
                #[cfg(feature = "devtools")]
                inheriting: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create a child of this scope.
    pub fn child(&self) -> Scope {
        Scope::new(Some(self))
    }

    pub(crate) fn from_inner(inner: Arc<ScopeInner>) -> Self {
        Self { inner }
    }

    /// This scope's identity.
    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    /// The current parent, if any.
    pub fn parent(&self) -> Option<Scope> {
        self.inner.parent()
    }

    /// Whether two handles refer to the same scope.
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Declare (or redeclare) one variable.
    pub fn define(&self, name: &str, options: VarOptions) -> Result<(), DefineError> {
        define::define_vars(self, [(name, options)])
    }

    /// Declare many variables in one call.
    ///
    /// All table mutations are applied before any counter bumps, so
    /// dependents observe a single consistent update.
    pub fn define_many<I, N>(&self, vars: I) -> Result<(), DefineError>
    where
        I: IntoIterator<Item = (N, VarOptions)>,
        N: Into<String>,
    {
        define::define_vars(self, vars)
    }

    /// Read a variable, subscribing the current computation to it.
    ///
    /// Resolves through the self table and the ancestor gateway chain;
    /// yields [`Value::Undefined`] when nothing declares the name. A
    /// tracked miss stays subscribed along the chain, so the reader is
    /// re-notified when some scope later declares the name.
    pub fn get(&self, name: &str) -> Value {
        self.assert_live("read from");

        match self.inner.vars.resolve(name) {
            Some(descriptor) => {
                #[cfg(feature = "devtools")]
                self.record_use(&descriptor);
                descriptor.read()
            }
            None => Value::Undefined,
        }
    }

    /// Write a variable through its backing cell.
    ///
    /// Writes to names nothing declares are dropped with a warning; a
    /// render pass is never aborted by ordinary variable access.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.assert_live("write to");

        match self.inner.vars.resolve(name) {
            Some(descriptor) => {
                #[cfg(feature = "devtools")]
                self.record_use(&descriptor);
                descriptor.write(value.into());
            }
            None => {
                tracing::warn!(
                    scope = self.id().raw(),
                    variable = %name,
                    "write to undeclared variable has no effect"
                );
            }
        }
    }

    /// Every name readable from this scope, own declarations first, then
    /// ancestor exposures in chain order, shadowed names deduplicated.
    ///
    /// Subscribes to the key-set counters along the chain, so enumerating
    /// consumers re-run when the visible set changes.
    pub fn keys(&self) -> Vec<String> {
        self.assert_live("enumerate");

        let mut seen = indexmap::IndexSet::new();

        self.inner.ledger.key_set().touch();
        for name in self.inner.vars.own_keys() {
            seen.insert(name);
        }

        let mut cursor = self.parent();
        while let Some(scope) = cursor {
            scope.inner.ledger.key_set().touch();
            for name in scope.inner.exposed.own_keys() {
                seen.insert(name);
            }
            cursor = scope.parent();
        }

        seen.into_iter().collect()
    }

    /// Move this scope under a new parent (or detach it).
    ///
    /// Supported for adapter remounts: the fallback chain is swapped and
    /// every counter in the ledger bumped, so chained and inherited reads
    /// resolve against the new ancestry on their next access and their
    /// consumers are re-notified.
    pub fn reparent(&self, parent: Option<&Scope>) {
        self.assert_live("reparent");

        *self.inner.parent.write() = parent.cloned();

        let fallback = parent.map(|p| p.inner.exposed.clone());
        self.inner.vars.set_fallback(fallback.clone());
        self.inner.exposed.set_fallback(fallback);

        self.inner.ledger.bump_all();
    }

    /// Tear this scope down.
    ///
    /// Removes the scope from every descriptor it used and unlinks the
    /// inheritance edges of its own inherited variables. Children are not
    /// disposed; the caller tears the subtree down bottom-up. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        #[cfg(feature = "devtools")]
        {
            for (_, weak) in self.inner.used.lock().drain() {
                if let Some(descriptor) = weak.upgrade() {
                    descriptor.debug().remove_used_by(self.id());
                }
            }

            for weak in self.inner.inheriting.lock().drain(..) {
                if let Some(descriptor) = weak.upgrade() {
                    if let Cell::Inherited(cell) = descriptor.cell() {
                        cell.unlink();
                    }
                }
            }
        }

        // TODO: detect child scopes still chained onto a disposed parent.
        // Needs a child registry; today such reads see stale tables.
    }

    /// Whether this scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Record that this scope uses `descriptor`, for dispose cleanup and
    /// leak detection.
    #[cfg(feature = "devtools")]
    pub(crate) fn record_use(&self, descriptor: &Arc<VarDescriptor>) {
        descriptor.debug().insert_used_by(self.id());
        self.inner
            .used
            .lock()
            .entry(descriptor.id())
            .or_insert_with(|| Arc::downgrade(descriptor));
    }

    /// Drop the usage record for a replaced descriptor.
    #[cfg(feature = "devtools")]
    pub(crate) fn forget_use(&self, id: VarId) {
        self.inner.used.lock().remove(&id);
    }

    fn assert_live(&self, action: &str) {
        debug_assert!(
            !self.is_disposed(),
            "attempt to {action} a disposed scope {:?}",
            self.id()
        );
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("vars", &self.inner.vars.len())
            .field("exposed", &self.inner.exposed.len())
            .field("has_parent", &self.parent().is_some())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_share_identity() {
        let scope = Scope::new(None);
        let alias = scope.clone();

        assert_eq!(scope.id(), alias.id());
        assert!(scope.ptr_eq(&alias));
        assert!(!scope.ptr_eq(&Scope::new(None)));
    }

    #[test]
    fn creation_is_chained_not_copied() {
        let parent = Scope::new(None);
        parent.define("x", VarOptions::value(1)).unwrap();

        let child = parent.child();
        assert_eq!(child.inner.vars.len(), 0);
        assert_eq!(child.get("x"), Value::from(1));

        // Declared after child creation, still visible: chained lookup.
        parent.define("late", VarOptions::value(2)).unwrap();
        assert_eq!(child.get("late"), Value::from(2));
    }

    #[test]
    fn unresolved_reads_yield_undefined() {
        let scope = Scope::new(None);
        assert_eq!(scope.get("ghost"), Value::Undefined);

        // Undeclared writes are dropped.
        scope.set("ghost", 1);
        assert_eq!(scope.get("ghost"), Value::Undefined);
    }

    #[test]
    fn keys_enumerate_own_then_exposed_ancestors() {
        let root = Scope::new(None);
        root.define_many([
            ("shown", VarOptions::value(1)),
            ("hidden", VarOptions::value(2).private()),
            ("renamed", VarOptions::value(3).expose_as("alias")),
        ])
        .unwrap();

        let child = root.child();
        child.define("own", VarOptions::value(4)).unwrap();
        child.define("shown", VarOptions::value(5)).unwrap();

        assert_eq!(
            child.keys(),
            vec!["own".to_owned(), "shown".to_owned(), "alias".to_owned()]
        );
        assert_eq!(
            root.keys(),
            vec!["shown".to_owned(), "hidden".to_owned(), "renamed".to_owned()]
        );
    }

    #[test]
    fn dispose_is_idempotent_and_observable() {
        let scope = Scope::new(None);
        assert!(!scope.is_disposed());

        scope.dispose();
        scope.dispose();
        assert!(scope.is_disposed());
    }
}
