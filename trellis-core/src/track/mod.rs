//! Dependency Tracking
//!
//! This module is the minimal reactive substrate the scope engine stands
//! on. It knows nothing about scopes or variables, only about revision
//! keys and the computations that read them:
//!
//! - Touching a key inside a [`TrackingFrame`] subscribes the frame's
//!   subscriber to that key.
//! - Bumping a key marks every subscriber stale and synchronously re-runs
//!   the eager ones.
//!
//! Any observer mechanism can sit on top: [`Watcher`] is the eager
//! reference implementation, and computed scope variables register as lazy
//! [`Dependent`]s that recompute on their next read.
//!
//! Dependency collection is thread-local (a frame belongs to the thread
//! that entered it); the registries are global so counters can be bumped
//! from anywhere.

mod frame;
mod key;
mod tracker;
mod watcher;

pub use frame::TrackingFrame;
pub use key::{RevisionKey, SubscriberId};
pub use tracker::{Dependent, TrackHandle, Tracker};
pub use watcher::Watcher;
