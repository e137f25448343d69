//! Inherited Cells
//!
//! An inherited cell stores nothing locally: every read and write resolves
//! the nearest ancestor exposing the source name and forwards to that
//! variable's own accessor. Writes therefore propagate to the ancestor's
//! backing cell, giving two-way binding across scope boundaries.
//!
//! The walk is redone on every access, never cached: a scope's parent may
//! be reassigned between accesses (double-invoked setup, remount), and
//! inherited bindings must reflect the current ancestry, not the ancestry
//! at declaration time. The source name's counter is touched at each
//! visited ancestor on the way, so a consumer re-evaluates when any
//! ancestor later exposes, hides, or re-aliases the source name.
//!
//! When no ancestor exposes the source, reads fall back to the declared
//! default, or to the default initializer (evaluated at most once, the
//! result cached), or to `Undefined`.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::context::{Scope, ScopeInner};
use super::descriptor::{VarDescriptor, VarId};
use crate::track::Tracker;
use crate::value::Value;

pub(crate) type DefaultInit = Box<dyn Fn(&Scope) -> Value + Send + Sync>;

/// A lazily-resolved indirection to an ancestor's exposed variable.
pub(crate) struct InheritedCell {
    /// Own variable name, for diagnostics.
    name: String,
    /// The exposed name looked up in ancestor gateway tables.
    source: String,
    default: Option<Value>,
    default_init: Option<DefaultInit>,
    default_cache: RwLock<Option<Value>>,
    /// The declaring scope; the walk starts from its current parent.
    owner: Weak<ScopeInner>,
    /// Identity of the owning descriptor, for inheritance edges.
    #[cfg_attr(not(feature = "devtools"), allow(dead_code))]
    self_id: VarId,
    /// The target resolved by the most recent access.
    #[cfg(feature = "devtools")]
    link: RwLock<Option<Weak<VarDescriptor>>>,
}

impl InheritedCell {
    pub(crate) fn new(
        name: String,
        source: String,
        default: Option<Value>,
        default_init: Option<DefaultInit>,
        owner: Weak<ScopeInner>,
        self_id: VarId,
    ) -> Self {
        Self {
            name,
            source,
            default,
            default_init,
            default_cache: RwLock::new(None),
            owner,
            self_id,
            #[cfg(feature = "devtools")]
            link: RwLock::new(None),
        }
    }

    pub(crate) fn read(&self) -> Value {
        match self.resolve(true) {
            Some(target) => target.read(),
            None => self.default_value(),
        }
    }

    pub(crate) fn write(&self, value: Value) {
        match self.resolve(true) {
            Some(target) => target.write(value),
            None => {
                tracing::warn!(
                    variable = %self.name,
                    source = %self.source,
                    "write to inherited variable with no resolvable source has no effect"
                );
            }
        }
    }

    /// Walk the ancestor chain for the nearest scope exposing `source`.
    ///
    /// When tracking, the source name's counter is touched at every
    /// visited ancestor, hit or miss, so the current computation
    /// re-evaluates when the resolution topology changes (a nearer
    /// ancestor exposes the name, the resolved alias is removed, a scope
    /// on the path is re-parented).
    fn resolve(&self, track: bool) -> Option<Arc<VarDescriptor>> {
        let owner = self.owner.upgrade()?;
        let track = track && Tracker::is_tracking();

        let mut cursor = owner.parent();
        while let Some(scope) = cursor {
            if track {
                scope.inner.ledger.counter(&self.source).touch();
            }
            if let Some(target) = scope.inner.exposed.get_own(&self.source) {
                #[cfg(feature = "devtools")]
                self.refresh_link(&target);
                return Some(target);
            }
            cursor = scope.parent();
        }

        #[cfg(feature = "devtools")]
        self.drop_link();
        None
    }

    fn default_value(&self) -> Value {
        if let Some(value) = &self.default {
            return value.clone();
        }

        if self.default_init.is_some() {
            let mut cache = self.default_cache.write();
            if cache.is_none() {
                if let (Some(init), Some(owner)) = (self.default_init.as_ref(), self.owner.upgrade())
                {
                    *cache = Some(init(&Scope::from_inner(owner)));
                }
            }
            return cache.clone().unwrap_or(Value::Undefined);
        }

        Value::Undefined
    }

    /// Re-run resolution without tracking, to refresh inheritance edges
    /// right after declaration.
    #[cfg(feature = "devtools")]
    pub(crate) fn refresh_edges(&self) {
        let _ = self.resolve(false);
    }

    /// Remove the inheritance edge, if any. Used on dispose and redeclare.
    #[cfg(feature = "devtools")]
    pub(crate) fn unlink(&self) {
        let mut link = self.link.write();
        if let Some(target) = link.take().and_then(|weak| weak.upgrade()) {
            target.debug().remove_inherited_by(self.self_id);
        }
    }

    #[cfg(feature = "devtools")]
    fn refresh_link(&self, target: &Arc<VarDescriptor>) {
        let mut link = self.link.write();
        if let Some(old) = link.as_ref().and_then(Weak::upgrade) {
            if Arc::ptr_eq(&old, target) {
                return;
            }
            old.debug().remove_inherited_by(self.self_id);
        }
        target.debug().insert_inherited_by(self.self_id);
        *link = Some(Arc::downgrade(target));
    }

    #[cfg(feature = "devtools")]
    fn drop_link(&self) {
        let mut link = self.link.write();
        if let Some(old) = link.take().and_then(|weak| weak.upgrade()) {
            tracing::warn!(
                variable = %self.name,
                source = %self.source,
                "inherited source is no longer exposed by any ancestor"
            );
            old.debug().remove_inherited_by(self.self_id);
        }
    }
}
