//! Devtools Introspection
//!
//! Snapshot surface over the usage/inheritance bookkeeping, for devtools
//! panels and leak detection in tests. Compiled only with the `devtools`
//! feature; production builds pay nothing.

use super::context::{Scope, ScopeId};
use super::descriptor::{CellKind, VarDescriptor, VarId};

/// A point-in-time snapshot of one declared variable.
#[derive(Debug, Clone)]
pub struct VarDebug {
    /// Descriptor identity (changes on redeclare).
    pub id: VarId,
    /// Declared name in the owning scope.
    pub name: String,
    /// Name descendants see it under, `None` if private.
    pub expose_as: Option<String>,
    /// Backing cell kind.
    pub kind: CellKind,
    /// Current revision of the name's counter.
    pub revision: u64,
    /// Scopes currently reading or writing through this descriptor.
    pub used_by: Vec<ScopeId>,
    /// Inherited variables currently resolving to this descriptor.
    pub inherited_by: Vec<VarId>,
}

fn snapshot(descriptor: &VarDescriptor) -> VarDebug {
    VarDebug {
        id: descriptor.id(),
        name: descriptor.name().to_owned(),
        expose_as: descriptor.expose_as().map(str::to_owned),
        kind: descriptor.kind(),
        revision: descriptor.counter().revision(),
        used_by: descriptor.debug().used_by_snapshot(),
        inherited_by: descriptor.debug().inherited_by_snapshot(),
    }
}

impl Scope {
    /// Snapshot one of this scope's own variables.
    pub fn debug_var(&self, name: &str) -> Option<VarDebug> {
        self.inner
            .vars
            .get_own(name)
            .map(|descriptor| snapshot(&descriptor))
    }

    /// Snapshot every variable declared in this scope, in declaration
    /// order.
    pub fn debug_vars(&self) -> Vec<VarDebug> {
        self.inner
            .vars
            .own_descriptors()
            .iter()
            .map(|descriptor| snapshot(descriptor))
            .collect()
    }
}
