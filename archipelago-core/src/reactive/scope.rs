//! Ownership of computations.
//!
//! Every computation owns the computations created while its body runs, and
//! disposes them before it re-executes or is disposed itself. A [`Scope`]
//! provides the same ownership outside any computation, for setup code such
//! as a component factory.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::computation::Computation;
use super::context::ReactiveContext;

/// Computations adopted by a computation or a scope.
#[derive(Default)]
pub(crate) struct Owner {
    children: RefCell<Vec<Computation>>,
}

impl Owner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn adopt(&self, child: Computation) {
        self.children.borrow_mut().push(child);
    }

    pub(crate) fn len(&self) -> usize {
        self.children.borrow().len()
    }

    /// Dispose every child, most recently created first.
    pub(crate) fn dispose_children(&self) {
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children.into_iter().rev() {
            child.dispose();
        }
    }
}

/// An owner for computations created outside any computation.
///
/// Computations created inside [`Scope::run`] live until the scope is
/// disposed or dropped. Reads inside `run` are not tracked.
pub struct Scope {
    owner: Rc<Owner>,
    disposed: Cell<bool>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            owner: Rc::new(Owner::new()),
            disposed: Cell::new(false),
        }
    }

    /// Run `f` with this scope as the owner of new computations.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = ReactiveContext::enter(None, Some(Rc::clone(&self.owner)));
        f()
    }

    /// Number of computations currently owned.
    pub fn len(&self) -> usize {
        self.owner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispose every owned computation. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.owner.dispose_children();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
