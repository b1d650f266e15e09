//! Reactive Runtime
//!
//! The runtime connects cells and computations. It owns no state of its own:
//! cells keep their subscriber sets, computations keep the cells they read, and
//! the runtime holds the two procedures that link them.
//!
//! # How It Works
//!
//! 1. When a cell is read inside a computation, [`Runtime::track_read`] adds
//!    the computation to the cell's subscriber set and records the cell as one
//!    of the computation's dependencies, so either side can undo the link.
//!
//! 2. When a cell's value changes, it snapshots its subscriber set and hands
//!    the snapshot to [`Runtime::notify`], which re-executes each live
//!    subscriber in order before returning. Updates are synchronous and
//!    depth-first: a re-execution that writes further cells finishes that
//!    whole cascade before the next subscriber in the snapshot runs.
//!
//! # Threading
//!
//! Everything here is single-threaded. Handles are `Rc`-based and `!Send`;
//! the active-computation stack is thread-local.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::computation::ComputationInner;
use super::context::ReactiveContext;
use super::subscriber::{SubscriberId, SubscriberSet};

/// The read/write convention shared by [`Cell`](super::Cell) and
/// [`Derived`](super::Derived).
///
/// `get` subscribes the running computation, `peek` never does. `set` returns
/// the value the source holds afterwards.
pub trait Source<T> {
    /// Read the value, subscribing the current computation.
    fn get(&self) -> T;

    /// Read the value without subscribing.
    fn peek(&self) -> T;

    /// Write a value. Returns the value held after the write.
    fn set(&self, value: T) -> T;
}

/// A cell as seen by the computations that read it.
pub(crate) trait Dependency {
    /// Drop `subscriber` from this cell's subscriber set.
    fn unsubscribe(&self, subscriber: SubscriberId);
}

/// Entry points that link cells and computations.
pub struct Runtime;

impl Runtime {
    /// Subscribe the current computation, if any, to a cell.
    ///
    /// `dependency` is only called when a new subscription is made.
    pub(crate) fn track_read<F>(subscribers: &RefCell<SubscriberSet>, dependency: F)
    where
        F: FnOnce() -> Weak<dyn Dependency>,
    {
        let Some(observer) = ReactiveContext::current_observer() else {
            return;
        };
        // a body that disposed its own computation must not resubscribe it
        if observer.is_disposed() {
            return;
        }

        let inserted = subscribers
            .borrow_mut()
            .insert(observer.id(), Rc::downgrade(&observer));

        if inserted {
            observer.add_dependency(dependency());
        }
    }

    /// Re-execute every subscriber in `snapshot`, in order.
    ///
    /// Subscribers disposed or dropped since the snapshot was taken are
    /// skipped.
    pub(crate) fn notify(snapshot: Vec<Weak<ComputationInner>>) {
        for subscriber in snapshot {
            if let Some(computation) = subscriber.upgrade() {
                computation.execute();
            }
        }
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a tracking computation.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

/// Extract a printable message from a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{cell, track};

    #[test]
    fn runtime_reports_tracking_state() {
        assert!(!Runtime::is_tracking());
        assert!(Runtime::current_subscriber().is_none());

        let inside = Rc::new(RefCell::new(false));
        let inside_clone = inside.clone();
        let _computation = track(move || {
            *inside_clone.borrow_mut() = Runtime::is_tracking();
        });
        assert!(*inside.borrow());
    }

    #[test]
    fn runtime_links_both_directions() {
        let source = cell(1);
        let reader = source.clone();
        let computation = track(move || {
            reader.get();
        });

        assert_eq!(source.subscriber_count(), 1);
        assert_eq!(computation.dependency_count(), 1);

        computation.dispose();
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(computation.dependency_count(), 0);
    }

    #[test]
    fn notify_skips_dropped_subscribers() {
        let source = cell(0);
        let reader = source.clone();
        let runs = Rc::new(RefCell::new(0));
        let runs_clone = runs.clone();

        let computation = track(move || {
            reader.get();
            *runs_clone.borrow_mut() += 1;
        });
        drop(computation);

        source.set(1);
        assert_eq!(*runs.borrow(), 1);
    }

    #[test]
    fn panic_message_reads_str_and_string() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
