//! Descriptor Tables
//!
//! A table maps names to descriptors and chains onto a fallback table for
//! unset names. Each scope owns two: the self table (every variable
//! declared in the scope) and the gateway table (only the exposed subset,
//! under exposure names). A child's tables chain onto the parent's
//! *gateway* table, so unshadowed reads fall through the ancestor chain
//! without any copying.
//!
//! Resolution is an explicit loop and memoizes nothing. That keeps
//! shadowing trivially correct (the first own entry wins) and keeps
//! dynamic re-parenting correct (the fallback link can be swapped and the
//! next resolution simply walks the new chain).
//!
//! Every table carries its scope's revision ledger. A tracked resolution
//! touches the looked-up name's counter at every level it visits, hit or
//! miss, so the reader is re-notified when any visited scope later
//! declares, re-aliases, or hides that name. This is what makes missed
//! lookups and intermediate-scope shadowing reactive without any eager
//! bookkeeping.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::descriptor::VarDescriptor;
use super::revision::RevisionLedger;
use crate::track::Tracker;

/// An insertion-ordered name -> descriptor map with a fallback chain.
pub(crate) struct VarTable {
    own: RwLock<IndexMap<String, Arc<VarDescriptor>>>,
    fallback: RwLock<Option<Arc<VarTable>>>,
    /// The owning scope's ledger, shared by both of its tables.
    ledger: Arc<RevisionLedger>,
}

impl VarTable {
    pub(crate) fn new(ledger: Arc<RevisionLedger>, fallback: Option<Arc<VarTable>>) -> Arc<Self> {
        Arc::new(Self {
            own: RwLock::new(IndexMap::new()),
            fallback: RwLock::new(fallback),
            ledger,
        })
    }

    /// Look up an own entry, ignoring the fallback chain.
    pub(crate) fn get_own(&self, name: &str) -> Option<Arc<VarDescriptor>> {
        self.own.read().get(name).cloned()
    }

    /// Look up a name through the fallback chain. First own entry wins.
    ///
    /// Inside a tracking frame, subscribes the reader to the name's
    /// counter at every visited level. Outside one, pure lookup.
    pub(crate) fn resolve(&self, name: &str) -> Option<Arc<VarDescriptor>> {
        let tracking = Tracker::is_tracking();

        if tracking {
            self.ledger.counter(name).touch();
        }
        if let Some(descriptor) = self.get_own(name) {
            return Some(descriptor);
        }

        let mut next = self.fallback.read().clone();
        while let Some(table) = next {
            if tracking {
                table.ledger.counter(name).touch();
            }
            if let Some(descriptor) = table.get_own(name) {
                return Some(descriptor);
            }
            next = table.fallback.read().clone();
        }

        None
    }

    /// Insert or replace an own entry.
    pub(crate) fn insert(&self, name: &str, descriptor: Arc<VarDescriptor>) {
        self.own.write().insert(name.to_owned(), descriptor);
    }

    /// Remove an own entry, preserving insertion order of the rest.
    pub(crate) fn remove(&self, name: &str) -> Option<Arc<VarDescriptor>> {
        self.own.write().shift_remove(name)
    }

    /// Own names in declaration order.
    pub(crate) fn own_keys(&self) -> Vec<String> {
        self.own.read().keys().cloned().collect()
    }

    /// Own descriptors in declaration order.
    #[cfg_attr(not(feature = "devtools"), allow(dead_code))]
    pub(crate) fn own_descriptors(&self) -> Vec<Arc<VarDescriptor>> {
        self.own.read().values().cloned().collect()
    }

    /// Swap the fallback link (re-parenting).
    pub(crate) fn set_fallback(&self, fallback: Option<Arc<VarTable>>) {
        *self.fallback.write() = fallback;
    }

    pub(crate) fn len(&self) -> usize {
        self.own.read().len()
    }
}

impl std::fmt::Debug for VarTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VarTable")
            .field("own", &self.own_keys())
            .field("chained", &self.fallback.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::cell::{Cell, ValueSlot};
    use crate::scope::descriptor::VarId;
    use crate::scope::revision::RevisionLedger;
    use crate::value::Value;

    fn ledger() -> Arc<RevisionLedger> {
        Arc::new(RevisionLedger::new())
    }

    fn descriptor(ledger: &RevisionLedger, name: &str, value: i64) -> Arc<VarDescriptor> {
        VarDescriptor::new(
            VarId::new(),
            name.to_owned(),
            Some(name.to_owned()),
            Cell::Slot(ValueSlot::new(Value::from(value), false)),
            ledger.counter(name),
        )
    }

    #[test]
    fn own_entry_shadows_fallback() {
        let shared = ledger();
        let parent = VarTable::new(shared.clone(), None);
        parent.insert("x", descriptor(&shared, "x", 1));

        let child = VarTable::new(ledger(), Some(parent.clone()));
        assert_eq!(child.resolve("x").unwrap().read(), Value::from(1));

        child.insert("x", descriptor(&shared, "x", 2));
        assert_eq!(child.resolve("x").unwrap().read(), Value::from(2));
        assert_eq!(parent.resolve("x").unwrap().read(), Value::from(1));
    }

    #[test]
    fn resolution_walks_the_whole_chain() {
        let shared = ledger();
        let grandparent = VarTable::new(shared.clone(), None);
        grandparent.insert("deep", descriptor(&shared, "deep", 3));

        let parent = VarTable::new(ledger(), Some(grandparent));
        let child = VarTable::new(ledger(), Some(parent));

        assert_eq!(child.resolve("deep").unwrap().read(), Value::from(3));
        assert!(child.resolve("absent").is_none());
    }

    #[test]
    fn swapping_fallback_changes_resolution() {
        let shared = ledger();
        let a = VarTable::new(shared.clone(), None);
        a.insert("x", descriptor(&shared, "x", 10));
        let b = VarTable::new(shared.clone(), None);
        b.insert("x", descriptor(&shared, "x", 20));

        let child = VarTable::new(ledger(), Some(a));
        assert_eq!(child.resolve("x").unwrap().read(), Value::from(10));

        child.set_fallback(Some(b));
        assert_eq!(child.resolve("x").unwrap().read(), Value::from(20));

        child.set_fallback(None);
        assert!(child.resolve("x").is_none());
    }

    #[test]
    fn remove_preserves_order() {
        let shared = ledger();
        let table = VarTable::new(shared.clone(), None);
        table.insert("a", descriptor(&shared, "a", 1));
        table.insert("b", descriptor(&shared, "b", 2));
        table.insert("c", descriptor(&shared, "c", 3));

        table.remove("b");
        assert_eq!(table.own_keys(), vec!["a".to_owned(), "c".to_owned()]);
        assert_eq!(table.len(), 2);
    }
}
