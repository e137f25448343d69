//! Trellis Core
//!
//! This crate provides the scope engine at the heart of the Trellis
//! reactive UI framework: a tree of nested variable scopes in which
//! component setup code declares value, computed, and inherited variables,
//! and every variable access is individually trackable so consumers
//! re-render exactly when the variables they read change.
//!
//! # Architecture
//!
//! The crate is organized into three modules:
//!
//! - [`scope`]: scope nodes, descriptor tables, the declaration API, the
//!   inherited-lookup resolver, and revision ledgers
//! - [`track`]: the minimal dependency-tracking substrate (tracking
//!   frames, the tracker, watchers)
//! - [`value`]: the dynamic value model scope variables hold
//!
//! Framework adapters create a scope when a component instance mounts,
//! run the (macro-generated) setup code against it, drive re-renders with
//! a [`Watcher`], and dispose the scope on unmount. None of that adapter
//! machinery lives here; the engine is the call surface below and nothing
//! else.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::{Scope, Value, VarOptions, Watcher};
//!
//! let root = Scope::new(None);
//! root.define("name", VarOptions::value("John").expose_as("alias"))?;
//!
//! let child = root.child();
//! child.define("v", VarOptions::inherited("alias"))?;
//!
//! // Two-way binding across the scope boundary:
//! child.set("v", "Jane");
//! assert_eq!(root.get("name"), Value::from("Jane"));
//! ```

pub mod scope;
pub mod track;
pub mod value;

pub use scope::{CellKind, DefineError, Scope, ScopeId, VarId, VarOptions};
#[cfg(feature = "devtools")]
pub use scope::VarDebug;
pub use track::Watcher;
pub use value::Value;
