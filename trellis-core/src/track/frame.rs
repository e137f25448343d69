//! Tracking Frame
//!
//! The tracking frame records which computation is currently running. This
//! enables automatic dependency collection: when a revision counter is
//! touched, the innermost frame's subscriber is registered as a dependent
//! of that counter.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Entering a frame (running a
//! watcher or recomputing a computed cell) pushes onto the stack; the RAII
//! guard pops it when the computation completes, panics included.
//!
//! Nested frames isolate dependency collection: a computed cell recomputing
//! inside a watcher records its own dependencies, not the watcher's.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::key::{RevisionKey, SubscriberId};

thread_local! {
    static FRAME_STACK: RefCell<Vec<FrameEntry>> = RefCell::new(Vec::new());
}

/// One entry in the frame stack.
struct FrameEntry {
    /// The subscriber of the computation currently running.
    subscriber_id: SubscriberId,
    /// Revision keys touched during this computation.
    reads: SmallVec<[RevisionKey; 8]>,
}

/// Guard for an active tracking frame. Pops the frame when dropped.
pub struct TrackingFrame {
    subscriber_id: SubscriberId,
}

impl TrackingFrame {
    /// Enter a new tracking frame for the given subscriber.
    ///
    /// While the frame is active, every touched revision key is recorded
    /// against this subscriber. The frame exits when the guard drops.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        FRAME_STACK.with(|stack| {
            stack.borrow_mut().push(FrameEntry {
                subscriber_id,
                reads: SmallVec::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Check whether any tracking frame is active on this thread.
    pub fn is_active() -> bool {
        FRAME_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The subscriber of the innermost active frame, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        FRAME_STACK.with(|stack| stack.borrow().last().map(|entry| entry.subscriber_id))
    }

    /// Record a touched revision key in the innermost frame.
    ///
    /// No-op when no frame is active (untracked read).
    pub fn record(key: RevisionKey) {
        FRAME_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                entry.reads.push(key);
            }
        });
    }

    /// The keys recorded so far in the innermost frame.
    pub fn recorded() -> Vec<RevisionKey> {
        FRAME_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.reads.to_vec())
                .unwrap_or_default()
        })
    }
}

impl Drop for TrackingFrame {
    fn drop(&mut self) {
        FRAME_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch mismatched enter/drop pairs early.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "TrackingFrame mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_tracks_subscriber() {
        let id = SubscriberId::new();

        assert!(!TrackingFrame::is_active());
        assert!(TrackingFrame::current_subscriber().is_none());

        {
            let _frame = TrackingFrame::enter(id);

            assert!(TrackingFrame::is_active());
            assert_eq!(TrackingFrame::current_subscriber(), Some(id));
        }

        assert!(!TrackingFrame::is_active());
        assert!(TrackingFrame::current_subscriber().is_none());
    }

    #[test]
    fn frame_records_reads() {
        let _frame = TrackingFrame::enter(SubscriberId::new());

        let k1 = RevisionKey::new();
        let k2 = RevisionKey::new();
        TrackingFrame::record(k1);
        TrackingFrame::record(k2);

        assert_eq!(TrackingFrame::recorded(), vec![k1, k2]);
    }

    #[test]
    fn nested_frames_isolate_reads() {
        let outer = SubscriberId::new();
        let inner = SubscriberId::new();
        let outer_key = RevisionKey::new();
        let inner_key = RevisionKey::new();

        let _outer_frame = TrackingFrame::enter(outer);
        TrackingFrame::record(outer_key);

        {
            let _inner_frame = TrackingFrame::enter(inner);
            assert_eq!(TrackingFrame::current_subscriber(), Some(inner));

            TrackingFrame::record(inner_key);
            assert_eq!(TrackingFrame::recorded(), vec![inner_key]);
        }

        // After the inner frame drops, the outer frame is current again and
        // never saw the inner read.
        assert_eq!(TrackingFrame::current_subscriber(), Some(outer));
        assert_eq!(TrackingFrame::recorded(), vec![outer_key]);
    }

    #[test]
    fn record_outside_frame_is_noop() {
        TrackingFrame::record(RevisionKey::new());
        assert!(TrackingFrame::recorded().is_empty());
    }
}
