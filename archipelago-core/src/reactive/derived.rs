//! Derived Cell Implementation
//!
//! A Derived cell is a read-only cell whose value is kept up to date by an
//! internal computation. It is a composition of the two other primitives: an
//! inner [`Cell`] and a driver [`Computation`] whose body re-evaluates the
//! expression and writes the result into the inner cell.
//!
//! # How Derived Cells Work
//!
//! 1. On creation the driver runs once, evaluating the expression and
//!    initializing the inner cell. The expression's reads become the driver's
//!    dependencies.
//!
//! 2. When a dependency changes, the driver re-evaluates and writes the inner
//!    cell. The write only notifies readers when the result actually changed.
//!
//! 3. Reads return the cached value; nothing is evaluated on read.
//!
//! # Failure
//!
//! If a re-evaluation panics, the panic is logged and the inner cell keeps its
//! previous value. A panic during the very first evaluation has no previous
//! value to fall back on and is resumed in the caller of [`derive`].

use std::any::Any;
use std::cell::RefCell;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use super::cell::Cell;
use super::computation::Computation;
use super::runtime::Source;

/// A read-only cell maintained by a driver computation.
///
/// # Example
///
/// ```rust
/// use archipelago_core::reactive::{cell, derive};
///
/// let count = cell(2);
/// let reader = count.clone();
/// let doubled = derive(move || reader.get() * 2);
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Derived<T: 'static> {
    inner: Cell<T>,
    driver: Computation,
}

enum Init<T: 'static> {
    Waiting,
    Ready(Cell<T>),
    Failed(Box<dyn Any + Send>),
}

/// Create a derived cell from `expr`.
pub fn derive<T, F>(expr: F) -> Derived<T>
where
    T: Clone + PartialEq + 'static,
    F: FnMut() -> T + 'static,
{
    Derived::new(expr)
}

impl<T> Derived<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a derived cell, evaluating `expr` once immediately.
    pub fn new<F>(mut expr: F) -> Self
    where
        F: FnMut() -> T + 'static,
    {
        let init: Rc<RefCell<Init<T>>> = Rc::new(RefCell::new(Init::Waiting));
        let slot = init.clone();

        let driver = Computation::new(move || {
            let ready = match &*slot.borrow() {
                Init::Ready(inner) => Some(inner.clone()),
                _ => None,
            };

            match ready {
                Some(inner) => {
                    // a panic here leaves the previous value in place
                    inner.set(expr());
                }
                None => {
                    let next = match panic::catch_unwind(AssertUnwindSafe(&mut expr)) {
                        Ok(value) => Init::Ready(Cell::new(value)),
                        Err(payload) => Init::Failed(payload),
                    };
                    *slot.borrow_mut() = next;
                }
            }
        });

        // the driver keeps reading the slot, so only a failure is moved out
        let ready = match &*init.borrow() {
            Init::Ready(inner) => Some(inner.clone()),
            _ => None,
        };
        if let Some(inner) = ready {
            return Self { inner, driver };
        }

        let state = std::mem::replace(&mut *init.borrow_mut(), Init::Waiting);
        match state {
            Init::Failed(payload) => {
                driver.dispose();
                panic::resume_unwind(payload)
            }
            _ => unreachable!("driver runs synchronously on creation"),
        }
    }

    /// Get the current value, subscribing the current computation.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Get the current value without tracking dependencies.
    pub fn peek(&self) -> T {
        self.inner.peek()
    }

    /// Accepted for call-convention parity with [`Cell::set`]; has no effect.
    ///
    /// Returns the current value.
    pub fn set(&self, value: T) -> T {
        drop(value);
        tracing::debug!(cell = self.inner.id(), "write to derived cell ignored");
        self.inner.peek()
    }

    /// Get the driver computation.
    pub fn driver(&self) -> &Computation {
        &self.driver
    }

    /// Get the number of subscribers reading this derived cell.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }
}

impl<T> Source<T> for Derived<T>
where
    T: Clone + PartialEq + 'static,
{
    fn get(&self) -> T {
        Derived::get(self)
    }

    fn peek(&self) -> T {
        Derived::peek(self)
    }

    fn set(&self, value: T) -> T {
        Derived::set(self, value)
    }
}

impl<T: 'static> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            driver: self.driver.clone(),
        }
    }
}

impl<T: Debug + 'static> Debug for Derived<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Derived")
            .field("inner", &self.inner)
            .field("driver", &self.driver)
            .finish()
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
    fn derived_evaluates_once_on_creation() {
        let evaluations = Rc::new(std::cell::Cell::new(0));
        let evaluations_clone = evaluations.clone();

        let derived = derive(move || {
            evaluations_clone.set(evaluations_clone.get() + 1);
            42
        });

        assert_eq!(evaluations.get(), 1);
        assert_eq!(derived.get(), 42);
        assert_eq!(derived.get(), 42);
        assert_eq!(evaluations.get(), 1);
    }

    #[test]
    fn derived_follows_its_dependencies() {
        let base = cell(5);
        let reader = base.clone();
        let doubled = derive(move || reader.get() * 2);

        assert_eq!(doubled.get(), 10);
        base.set(10);
        assert_eq!(doubled.get(), 20);
    }

    #[test]
    fn derived_chain_updates_depth_first() {
        let base = cell(1);
        let reader = base.clone();
        let doubled = derive(move || reader.get() * 2);
        let doubled_reader = doubled.clone();
        let plus_ten = derive(move || doubled_reader.get() + 10);

        base.set(4);
        assert_eq!(doubled.get(), 8);
        assert_eq!(plus_ten.get(), 18);
    }

    #[test]
    fn unchanged_result_does_not_notify_readers() {
        let base = cell(3);
        let reader = base.clone();
        let parity = derive(move || reader.get() % 2);
        let parity_reader = parity.clone();
        let runs = Rc::new(std::cell::Cell::new(0));
        let runs_clone = runs.clone();

        let _computation = track(move || {
            parity_reader.get();
            runs_clone.set(runs_clone.get() + 1);
        });

        base.set(5);
        assert_eq!(runs.get(), 1);
        base.set(6);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn failed_reevaluation_keeps_previous_value() {
        let base = cell(1);
        let reader = base.clone();
        let checked = derive(move || {
            let value = reader.get();
            assert!(value < 100, "value out of range");
            value
        });

        base.set(500);
        assert_eq!(checked.get(), 1);

        base.set(7);
        assert_eq!(checked.get(), 7);
    }

    #[test]
    fn writes_are_ignored() {
        let derived = derive(|| 3);
        assert_eq!(derived.set(9), 3);
        assert_eq!(derived.get(), 3);
    }

    #[test]
    fn failed_first_evaluation_reaches_caller() {
        let base = cell(0);
        let reader = base.clone();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            derive(move || -> i32 {
                reader.get();
                panic!("no initial value")
            });
        }));

        assert!(result.is_err());
        assert_eq!(base.subscriber_count(), 0);
    }

    #[test]
    fn readers_see_recomputed_value() {
        let base = cell(1);
        let reader = base.clone();
        let doubled = derive(move || reader.get() * 2);
        let doubled_reader = doubled.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let _computation = track(move || seen_clone.borrow_mut().push(doubled_reader.get()));

        base.set(5);
        assert_eq!(doubled.get(), 10);
        assert_eq!(doubled.peek(), 10);
        assert_eq!(*seen.borrow(), vec![2, 10]);
        assert_eq!(doubled.driver().run_count(), 2);
    }
}
