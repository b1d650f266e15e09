//! Reactive Context
//!
//! The reactive context tracks which computation is currently running, and
//! which owner adopts computations created right now. Cells read the current
//! observer to subscribe it; new computations read the current owner to be
//! disposed together with it.
//!
//! # Implementation
//!
//! A thread-local stack of frames. Entering a computation pushes a frame and
//! returns a guard; dropping the guard pops it. Because the pop lives in
//! `Drop`, the previous frame is restored even when the body panics. Nested
//! computations simply push further frames.

use std::cell::RefCell;
use std::rc::Rc;

use super::computation::ComputationInner;
use super::scope::Owner;
use super::SubscriberId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Clone)]
struct Frame {
    /// Computation that subscribes to cells read in this frame.
    observer: Option<Rc<ComputationInner>>,
    /// Owner that adopts computations created in this frame.
    owner: Option<Rc<Owner>>,
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    depth: usize,
    observer: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a frame in which reads subscribe `observer` and new computations
    /// are adopted by `owner`.
    pub(crate) fn enter(
        observer: Option<Rc<ComputationInner>>,
        owner: Option<Rc<Owner>>,
    ) -> Self {
        let observer_id = observer.as_ref().map(|o| o.id());
        let depth = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(Frame { observer, owner });
            stack.len()
        });

        Self {
            depth,
            observer: observer_id,
        }
    }

    /// Enter a frame with no observer, keeping the current owner.
    pub(crate) fn enter_untracked() -> Self {
        Self::enter(None, Self::current_owner())
    }

    /// Check if a computation is currently tracking reads.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the ID of the computation currently tracking reads, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|frame| frame.observer.as_ref().map(|o| o.id()))
        })
    }

    pub(crate) fn current_observer() -> Option<Rc<ComputationInner>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|frame| frame.observer.clone()))
    }

    pub(crate) fn current_owner() -> Option<Rc<Owner>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|frame| frame.owner.clone()))
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(
                stack.len(),
                self.depth,
                "ReactiveContext dropped out of order"
            );
            stack.pop()
        });

        if let Some(frame) = popped {
            debug_assert_eq!(
                frame.observer.as_ref().map(|o| o.id()),
                self.observer,
                "ReactiveContext mismatch"
            );
        }
    }
}

/// Run `f` without tracking any cell it reads.
///
/// Computations created inside `f` are still adopted by the current owner.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter_untracked();
    f()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::track;

    #[test]
    fn context_is_empty_outside_computations() {
        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn computation_is_current_while_running() {
        let seen = Rc::new(RefCell::new(None));
        let seen_clone = seen.clone();

        let computation = track(move || {
            *seen_clone.borrow_mut() = ReactiveContext::current_subscriber();
        });

        assert_eq!(*seen.borrow(), Some(computation.id()));
        // Context should be cleaned up after the run
        assert!(!ReactiveContext::is_active());
    }

    #[test]
    fn nested_contexts_restore_outer() {
        let trail = Rc::new(RefCell::new(Vec::new()));
        let trail_clone = trail.clone();

        let _outer = track(move || {
            let before = ReactiveContext::current_subscriber();
            let inner_trail = trail_clone.clone();
            let _inner = track(move || {
                inner_trail
                    .borrow_mut()
                    .push(ReactiveContext::current_subscriber());
            });
            let after = ReactiveContext::current_subscriber();
            trail_clone.borrow_mut().push(before);
            trail_clone.borrow_mut().push(after);
        });

        let trail = trail.borrow();
        assert_eq!(trail.len(), 3);
        assert_ne!(trail[0], trail[1]);
        assert_eq!(trail[1], trail[2]);
    }

    #[test]
    fn untracked_hides_observer() {
        let inside = Rc::new(RefCell::new(Some(SubscriberId::new())));
        let inside_clone = inside.clone();

        let _computation = track(move || {
            *inside_clone.borrow_mut() = untracked(ReactiveContext::current_subscriber);
            assert!(ReactiveContext::is_active());
        });

        assert!(inside.borrow().is_none());
    }

    #[test]
    fn context_restored_after_panic() {
        let result = std::panic::catch_unwind(|| {
            let _ctx = ReactiveContext::enter(None, None);
            panic!("boom");
        });
        assert!(result.is_err());
        CONTEXT_STACK.with(|stack| assert!(stack.borrow().is_empty()));
    }
}
