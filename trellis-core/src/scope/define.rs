//! Variable Declaration
//!
//! The entry point component setup code calls to declare value, computed,
//! and inherited variables against a scope. Declarations go through three
//! phases:
//!
//! 1. validate every option shape (structural errors fail fast, before
//!    any mutation),
//! 2. build descriptors and apply all table mutations,
//! 3. bump the affected revision counters, each at most once.
//!
//! The batched [`Scope::define_many`] shares the pipeline, which is what
//! gives it its guarantee: dependents see one consistent update instead of
//! N partial ones.
//!
//! Redeclaring a name is allowed at any time (setup code may run again
//! after the initial render). The new descriptor entirely replaces the old
//! one; if the exposure alias changed, the stale alias entry is removed
//! from the gateway table first. Inherited variables resolving to the old
//! descriptor are not re-pointed eagerly; their own lazy resolver finds
//! the new descriptor on its next access.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use super::cell::{Cell, ValueSlot};
use super::computed::{ComputedCell, Getter, Setter};
use super::context::Scope;
use super::descriptor::{VarDescriptor, VarId};
use super::inherit::{DefaultInit, InheritedCell};
use super::revision::RevisionCounter;
use crate::track::{RevisionKey, Tracker};
use crate::value::Value;

/// A structural error in a variable declaration.
///
/// These indicate a bug in the calling (generated) code, not a runtime
/// condition: the declaration is rejected synchronously and the scope's
/// tables are left untouched.
#[derive(Debug, Error)]
pub enum DefineError {
    /// More than one of value / computed / inherited was declared.
    #[error("variable `{name}` declares more than one backing kind")]
    ConflictingKinds { name: String },

    /// `private` and `expose_as` are mutually exclusive.
    #[error("variable `{name}` cannot be both private and exposed under an alias")]
    PrivateExposeAs { name: String },

    /// A default only makes sense on an inherited variable.
    #[error("variable `{name}` sets a default but is not inherited")]
    DefaultWithoutInherited { name: String },

    /// `shallow` only applies to value slots.
    #[error("variable `{name}` is marked shallow but holds no value slot")]
    ShallowWithoutValue { name: String },
}

/// Options for one variable declaration.
///
/// Start from one of [`VarOptions::value`], [`VarOptions::computed`],
/// [`VarOptions::write_only`], or [`VarOptions::inherited`], then chain
/// modifiers. Incompatible combinations are rejected by
/// [`Scope::define`].
pub struct VarOptions {
    value: Option<Value>,
    shallow: bool,
    get: Option<Getter>,
    set: Option<Setter>,
    inherited: Option<String>,
    default: Option<Value>,
    default_init: Option<DefaultInit>,
    private: bool,
    expose_as: Option<String>,
}

impl VarOptions {
    fn empty() -> Self {
        Self {
            value: None,
            shallow: false,
            get: None,
            set: None,
            inherited: None,
            default: None,
            default_init: None,
            private: false,
            expose_as: None,
        }
    }

    /// A mutable value slot with the given initial value.
    pub fn value(initial: impl Into<Value>) -> Self {
        Self {
            value: Some(initial.into()),
            ..Self::empty()
        }
    }

    /// A derived variable computed by `get`.
    pub fn computed<F>(get: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            get: Some(Box::new(get)),
            ..Self::empty()
        }
    }

    /// A set-only variable: writes run `set`, reads yield `Undefined`.
    pub fn write_only<F>(set: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        Self {
            set: Some(Box::new(set)),
            ..Self::empty()
        }
    }

    /// An inherited variable resolving `source` from the ancestor chain.
    pub fn inherited(source: impl Into<String>) -> Self {
        Self {
            inherited: Some(source.into()),
            ..Self::empty()
        }
    }

    /// Skip the equality check on writes; every write notifies.
    pub fn shallow(mut self) -> Self {
        self.shallow = true;
        self
    }

    /// Add a setter to a computed variable.
    pub fn setter<F>(mut self, set: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.set = Some(Box::new(set));
        self
    }

    /// Value used when an inherited variable resolves no source.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Lazily-computed fallback for an inherited variable; runs at most
    /// once, only when resolution fails and no plain default is set.
    pub fn default_with<F>(mut self, init: F) -> Self
    where
        F: Fn(&Scope) -> Value + Send + Sync + 'static,
    {
        self.default_init = Some(Box::new(init));
        self
    }

    /// Keep the variable out of the gateway table entirely.
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Expose the variable to descendants under a different name.
    pub fn expose_as(mut self, name: impl Into<String>) -> Self {
        self.expose_as = Some(name.into());
        self
    }

    fn validate(&self, name: &str) -> Result<(), DefineError> {
        let shapes = [
            self.value.is_some(),
            self.get.is_some() || self.set.is_some(),
            self.inherited.is_some(),
        ];
        if shapes.iter().filter(|present| **present).count() > 1 {
            return Err(DefineError::ConflictingKinds { name: name.into() });
        }

        if self.private && self.expose_as.is_some() {
            return Err(DefineError::PrivateExposeAs { name: name.into() });
        }

        if (self.default.is_some() || self.default_init.is_some()) && self.inherited.is_none() {
            return Err(DefineError::DefaultWithoutInherited { name: name.into() });
        }

        if self.shallow && self.value.is_none() {
            return Err(DefineError::ShallowWithoutValue { name: name.into() });
        }

        Ok(())
    }
}

impl std::fmt::Debug for VarOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VarOptions")
            .field("value", &self.value)
            .field("computed", &(self.get.is_some() || self.set.is_some()))
            .field("inherited", &self.inherited)
            .field("private", &self.private)
            .field("expose_as", &self.expose_as)
            .finish()
    }
}

struct DefinePlan {
    name: String,
    expose_as: Option<String>,
    descriptor: Arc<VarDescriptor>,
}

pub(crate) fn define_vars<I, N>(scope: &Scope, vars: I) -> Result<(), DefineError>
where
    I: IntoIterator<Item = (N, VarOptions)>,
    N: Into<String>,
{
    debug_assert!(
        !scope.is_disposed(),
        "attempt to declare into a disposed scope {:?}",
        scope.id()
    );

    let vars: Vec<(String, VarOptions)> =
        vars.into_iter().map(|(name, options)| (name.into(), options)).collect();

    for (name, options) in &vars {
        options.validate(name)?;
    }

    let planned: Vec<DefinePlan> = vars
        .into_iter()
        .map(|(name, options)| build(scope, name, options))
        .collect();

    let mut bumps: Vec<Arc<RevisionCounter>> = Vec::new();
    let mut bumped: HashSet<RevisionKey> = HashSet::new();
    for plan in planned {
        apply(scope, plan, &mut bumps, &mut bumped);
    }

    // Tables are consistent across the whole batch; advance every affected
    // counter, then notify each dependent once.
    for counter in &bumps {
        counter.advance();
    }
    Tracker::notify_many(bumps.iter().map(|counter| counter.key()));

    Ok(())
}

fn build(scope: &Scope, name: String, options: VarOptions) -> DefinePlan {
    // The name's counter survives redeclaration, keeping subscribers.
    let counter = scope.inner.ledger.counter(&name);
    let id = VarId::new();

    let cell = if let Some(source) = options.inherited {
        Cell::Inherited(InheritedCell::new(
            name.clone(),
            source,
            options.default,
            options.default_init,
            Arc::downgrade(&scope.inner),
            id,
        ))
    } else if options.get.is_some() || options.set.is_some() {
        Cell::Computed(ComputedCell::new(
            name.clone(),
            counter.clone(),
            options.get,
            options.set,
        ))
    } else {
        Cell::Slot(ValueSlot::new(
            options.value.unwrap_or_default(),
            options.shallow,
        ))
    };

    let expose_as = if options.private {
        None
    } else {
        Some(options.expose_as.unwrap_or_else(|| name.clone()))
    };

    let descriptor = VarDescriptor::new(id, name.clone(), expose_as.clone(), cell, counter);

    DefinePlan {
        name,
        expose_as,
        descriptor,
    }
}

fn apply(
    scope: &Scope,
    plan: DefinePlan,
    bumps: &mut Vec<Arc<RevisionCounter>>,
    bumped: &mut HashSet<RevisionKey>,
) {
    let DefinePlan {
        name,
        expose_as,
        descriptor,
    } = plan;
    let inner = &scope.inner;

    let mut key_set_changed = false;

    if let Some(previous) = inner.vars.get_own(&name) {
        let previous_alias = previous.expose_as().map(str::to_owned);
        if previous_alias.as_deref() != expose_as.as_deref() {
            // The exposure entry moves: notify lookups subscribed under
            // the old and the new exposure names.
            if let Some(old_alias) = previous_alias {
                inner.exposed.remove(&old_alias);
                push_bump(bumps, bumped, &inner.ledger.counter(&old_alias));
            }
            if let Some(new_alias) = &expose_as {
                push_bump(bumps, bumped, &inner.ledger.counter(new_alias));
            }
            key_set_changed = true;
        }

        #[cfg(feature = "devtools")]
        retire(scope, &previous);
    } else {
        key_set_changed = true;
        if let Some(alias) = &expose_as {
            if alias != &name {
                push_bump(bumps, bumped, &inner.ledger.counter(alias));
            }
        }
    }

    inner.vars.insert(&name, descriptor.clone());
    if let Some(alias) = &expose_as {
        inner.exposed.insert(alias, descriptor.clone());
    }

    #[cfg(feature = "devtools")]
    enroll(scope, &descriptor);

    // The name now points at a new definition; readers subscribed to it
    // (resolved or missed) get re-notified.
    push_bump(bumps, bumped, descriptor.counter());

    if key_set_changed {
        push_bump(bumps, bumped, inner.ledger.key_set());
    }
}

fn push_bump(
    bumps: &mut Vec<Arc<RevisionCounter>>,
    bumped: &mut HashSet<RevisionKey>,
    counter: &Arc<RevisionCounter>,
) {
    if bumped.insert(counter.key()) {
        bumps.push(counter.clone());
    }
}

/// Devtools bookkeeping for a descriptor being replaced.
#[cfg(feature = "devtools")]
fn retire(scope: &Scope, previous: &Arc<VarDescriptor>) {
    // Inheriting descendants re-resolve lazily; their edges into the old
    // descriptor are stale the moment it leaves the tables.
    previous.debug().clear_inherited_by();
    previous.debug().remove_used_by(scope.id());
    scope.forget_use(previous.id());

    if let Cell::Inherited(cell) = previous.cell() {
        cell.unlink();
        scope.inner.inheriting.lock().retain(|weak| {
            weak.upgrade()
                .map(|descriptor| !Arc::ptr_eq(&descriptor, previous))
                .unwrap_or(false)
        });
    }
}

/// Devtools bookkeeping for a freshly-installed descriptor.
#[cfg(feature = "devtools")]
fn enroll(scope: &Scope, descriptor: &Arc<VarDescriptor>) {
    scope.record_use(descriptor);

    if let Cell::Inherited(cell) = descriptor.cell() {
        scope
            .inner
            .inheriting
            .lock()
            .push(Arc::downgrade(descriptor));
        // Resolve once, untracked, so the inheritance edge shows up in
        // devtools before the first real read.
        cell.refresh_edges();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_kinds_are_rejected() {
        let scope = Scope::new(None);

        let options = VarOptions::value(1).setter(|_| {});
        let err = scope.define("x", options).unwrap_err();
        assert!(matches!(err, DefineError::ConflictingKinds { .. }));

        // Nothing landed in the tables.
        assert_eq!(scope.get("x"), Value::Undefined);
    }

    #[test]
    fn private_with_alias_is_rejected() {
        let scope = Scope::new(None);
        let err = scope
            .define("x", VarOptions::value(1).private().expose_as("y"))
            .unwrap_err();
        assert!(matches!(err, DefineError::PrivateExposeAs { .. }));
    }

    #[test]
    fn default_requires_inherited() {
        let scope = Scope::new(None);
        let err = scope
            .define("x", VarOptions::value(1).default_value(2))
            .unwrap_err();
        assert!(matches!(err, DefineError::DefaultWithoutInherited { .. }));
    }

    #[test]
    fn shallow_requires_value() {
        let scope = Scope::new(None);
        let err = scope
            .define("x", VarOptions::computed(|| Value::from(1)).shallow())
            .unwrap_err();
        assert!(matches!(err, DefineError::ShallowWithoutValue { .. }));
    }

    #[test]
    fn batched_define_rejects_all_or_applies_all() {
        let scope = Scope::new(None);

        let result = scope.define_many([
            ("ok", VarOptions::value(1)),
            ("bad", VarOptions::value(2).private().expose_as("y")),
        ]);
        assert!(result.is_err());

        // The valid entry was not applied either.
        assert_eq!(scope.get("ok"), Value::Undefined);
    }

    #[test]
    fn redeclare_replaces_descriptor_and_stale_alias() {
        let root = Scope::new(None);
        root.define("x", VarOptions::value(1).expose_as("one")).unwrap();

        let child = root.child();
        assert_eq!(child.get("one"), Value::from(1));

        root.define("x", VarOptions::value(2).expose_as("two")).unwrap();

        assert_eq!(child.get("two"), Value::from(2));
        // The stale alias is gone from the gateway table.
        assert_eq!(child.get("one"), Value::Undefined);
        assert_eq!(root.get("x"), Value::from(2));
    }

    #[test]
    fn redeclare_bumps_even_with_equal_value() {
        let scope = Scope::new(None);
        scope.define("x", VarOptions::value(1)).unwrap();

        let counter = scope.inner.ledger.counter("x");
        let before = counter.revision();

        scope.define("x", VarOptions::value(1)).unwrap();
        assert!(counter.revision() > before);
    }
}
