//! Backing Cells
//!
//! Every variable descriptor is backed by exactly one cell, an explicit
//! tagged variant dispatched on read and write:
//!
//! - [`ValueSlot`]: a mutable slot holding a [`Value`].
//! - `Computed`: a derived value with memoized caching (see `computed`).
//! - `Inherited`: an indirection resolved by walking the ancestor chain on
//!   every access (see `inherit`).
//!
//! The dispatch lives here so the whole read/write state machine is
//! auditable in one place instead of being spread across closures.

use parking_lot::RwLock;

use super::computed::ComputedCell;
use super::descriptor::CellKind;
use super::inherit::InheritedCell;
use super::revision::RevisionCounter;
use crate::value::Value;

/// The backing storage of one variable descriptor.
pub(crate) enum Cell {
    Slot(ValueSlot),
    Computed(ComputedCell),
    Inherited(InheritedCell),
}

impl Cell {
    pub(crate) fn read(&self) -> Value {
        match self {
            Cell::Slot(slot) => slot.get(),
            Cell::Computed(computed) => computed.get(),
            Cell::Inherited(inherited) => inherited.read(),
        }
    }

    pub(crate) fn write(&self, value: Value, counter: &RevisionCounter) {
        match self {
            Cell::Slot(slot) => slot.set(value, counter),
            // A computed setter writes through to other variables; this
            // descriptor's own counter is not bumped.
            Cell::Computed(computed) => computed.set(value),
            Cell::Inherited(inherited) => inherited.write(value),
        }
    }

    pub(crate) fn kind(&self) -> CellKind {
        match self {
            Cell::Slot(_) => CellKind::Value,
            Cell::Computed(_) => CellKind::Computed,
            Cell::Inherited(_) => CellKind::Inherited,
        }
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cell::{:?}", self.kind())
    }
}

/// A mutable value slot.
///
/// A plain slot compares the incoming value against the stored one and
/// skips the notification when nothing changed. A shallow slot skips the
/// comparison and notifies on every write; for large opaque payloads the
/// comparison buys nothing.
pub(crate) struct ValueSlot {
    value: RwLock<Value>,
    shallow: bool,
}

impl ValueSlot {
    pub(crate) fn new(initial: Value, shallow: bool) -> Self {
        Self {
            value: RwLock::new(initial),
            shallow,
        }
    }

    pub(crate) fn get(&self) -> Value {
        self.value.read().clone()
    }

    pub(crate) fn set(&self, value: Value, counter: &RevisionCounter) {
        if !self.shallow && *self.value.read() == value {
            return;
        }
        *self.value.write() = value;
        counter.bump();
    }
}
