//! Scope Engine
//!
//! A tree of nested variable scopes with fine-grained change tracking:
//!
//! - Variables are declared per scope and exposed to descendants by name
//!   or alias, unless marked private.
//! - A child scope chains onto its parent's gateway table: unshadowed
//!   reads fall through the ancestor chain at access time, nothing is
//!   copied at creation.
//! - Inherited variables resolve the nearest ancestor exposing a source
//!   name on every access and forward reads *and* writes to it.
//! - Every variable access touches a revision counter, so an external
//!   tracking mechanism (see [`crate::track`]) can re-run exactly the
//!   consumers whose variables changed.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::{Scope, Value, VarOptions};
//!
//! let root = Scope::new(None);
//! root.define("count", VarOptions::value(0))?;
//!
//! let child = root.child();
//! let r = root.clone();
//! child.define(
//!     "doubled",
//!     VarOptions::computed(move || {
//!         Value::from(r.get("count").as_int().unwrap_or(0) * 2)
//!     }),
//! )?;
//!
//! root.set("count", 5);
//! assert_eq!(child.get("doubled"), Value::from(10));
//! ```

mod cell;
mod computed;
mod context;
#[cfg(feature = "devtools")]
mod debug;
mod define;
mod descriptor;
mod inherit;
mod revision;
mod table;

pub use context::{Scope, ScopeId};
#[cfg(feature = "devtools")]
pub use debug::VarDebug;
pub use define::{DefineError, VarOptions};
pub use descriptor::{CellKind, VarId};
pub use revision::{RevisionCounter, RevisionLedger};
