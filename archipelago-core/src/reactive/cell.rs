//! Cell Implementation
//!
//! A Cell is the fundamental reactive primitive. It holds a value and tracks
//! which computations depend on it.
//!
//! # How Cells Work
//!
//! 1. When a cell is read with [`Cell::get`] inside a computation, the cell
//!    registers that computation as a subscriber.
//!
//! 2. When [`Cell::set`] stores a value that differs from the current one,
//!    every subscriber present at that moment re-executes before `set`
//!    returns.
//!
//! 3. [`Cell::peek`] reads without subscribing, for cleanup callbacks and
//!    event handlers that must not create a binding.
//!
//! # Equality
//!
//! A write is a change when `new != current` under `PartialEq`. For floats
//! this means writing `NaN` over `NaN` is always a change and always
//! renotifies, because `NaN != NaN`.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::runtime::{Dependency, Runtime, Source};
use super::subscriber::{SubscriberId, SubscriberSet};

/// Counter for generating unique cell IDs.
static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_cell_id() -> u64 {
    CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A reactive cell holding a value of type `T`.
///
/// Cloning the handle shares the same cell.
///
/// # Example
///
/// ```rust
/// use archipelago_core::reactive::{cell, track};
///
/// let count = cell(0);
/// let reader = count.clone();
/// let _log = track(move || println!("count = {}", reader.get()));
///
/// count.set(0); // equal value: nothing runs
/// count.set(1); // prints "count = 1"
/// ```
pub struct Cell<T: 'static> {
    inner: Rc<CellInner<T>>,
}

struct CellInner<T> {
    id: u64,
    value: RefCell<T>,
    subscribers: RefCell<SubscriberSet>,
}

impl<T: 'static> Dependency for CellInner<T> {
    fn unsubscribe(&self, subscriber: SubscriberId) {
        self.subscribers.borrow_mut().remove(subscriber);
    }
}

/// Create a new cell with the given initial value.
pub fn cell<T: 'static>(initial: T) -> Cell<T> {
    Cell::new(initial)
}

impl<T: 'static> Cell<T> {
    /// Create a new cell with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(CellInner {
                id: next_cell_id(),
                value: RefCell::new(value),
                subscribers: RefCell::new(SubscriberSet::new()),
            }),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Borrow the current value, subscribing the current computation.
    ///
    /// Writing this cell from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    fn track(&self) {
        Runtime::track_read(&self.inner.subscribers, || {
            let inner: Rc<dyn Dependency> = self.inner.clone();
            Rc::downgrade(&inner)
        });
    }
}

impl<T: Clone + 'static> Cell<T> {
    /// Get the current value.
    ///
    /// If called while a computation is running, this also registers that
    /// computation as a subscriber.
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn peek(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: Clone + PartialEq + 'static> Cell<T> {
    /// Store a new value and notify subscribers if it differs from the
    /// current one.
    ///
    /// Returns the new value.
    pub fn set(&self, value: T) -> T {
        let snapshot = {
            let mut current = self.inner.value.borrow_mut();
            if value != *current {
                *current = value.clone();
                Some(self.inner.subscribers.borrow().snapshot())
            } else {
                None
            }
        };

        if let Some(subscribers) = snapshot {
            tracing::trace!(cell = self.inner.id, subscribers = subscribers.len(), "cell changed");
            Runtime::notify(subscribers);
        }

        value
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let current = self.inner.value.borrow();
            f(&current)
        };
        self.set(next)
    }
}

impl<T: Clone + PartialEq + 'static> Source<T> for Cell<T> {
    fn get(&self) -> T {
        Cell::get(self)
    }

    fn peek(&self) -> T {
        Cell::peek(self)
    }

    fn set(&self, value: T) -> T {
        Cell::set(self, value)
    }
}

impl<T: 'static> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Cell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
