//! Computation Implementation
//!
//! A Computation is a tracked body that re-executes whenever a cell it read
//! during its last execution changes.
//!
//! # How Computations Work
//!
//! 1. When created, the computation runs its body immediately to establish
//!    its dependencies.
//!
//! 2. Before every re-execution it disposes the computations its previous
//!    execution created, runs the cleanup that execution returned, and drops
//!    its old subscriptions. The new execution subscribes afresh to whatever
//!    it reads.
//!
//! 3. [`Computation::dispose`] runs the last cleanup once and detaches the
//!    computation from every cell. Later notifications are no-ops.
//!
//! # Cleanup
//!
//! The body may return a cleanup (see [`on_cleanup`]), which releases what
//! that execution acquired: timers, listeners, subscriptions. A panicking
//! cleanup is logged and never blocks re-execution or disposal.
//!
//! # Failures
//!
//! A panic in the body, or an `Err` it returns, is caught and logged. It does
//! not reach the code that wrote the cell, and other subscribers of that cell
//! still run.
//!
//! # Async bodies
//!
//! Reads are only tracked while the body runs synchronously. A body that
//! returns a future gets a warning, its future is dropped unpolled, and it
//! has no cleanup. Async work belongs outside the tracked region, guarded by a
//! [`Liveness`] flag.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::error::ComputationError;
use super::runtime::{panic_message, Dependency};
use super::scope::Owner;
use super::subscriber::SubscriberId;

/// Consecutive self-triggered re-executions allowed before the cycle is
/// broken.
pub const MAX_RERUNS: usize = 100;

/// A cleanup callback returned by a computation body.
pub type Cleanup = Box<dyn FnOnce()>;

/// Wrap a closure as the cleanup of the current execution.
pub fn on_cleanup(f: impl FnOnce() + 'static) -> Cleanup {
    Box::new(f)
}

/// What one execution of a body left behind.
pub enum Teardown {
    /// Nothing to release.
    None,
    /// Run before the next execution, or at disposal.
    Cleanup(Cleanup),
    /// The body returned a future.
    Pending,
    /// The body returned an error.
    Failed(String),
}

/// Conversion from a body's return value into a [`Teardown`].
pub trait IntoTeardown {
    fn into_teardown(self) -> Teardown;
}

impl IntoTeardown for () {
    fn into_teardown(self) -> Teardown {
        Teardown::None
    }
}

impl IntoTeardown for Teardown {
    fn into_teardown(self) -> Teardown {
        self
    }
}

impl IntoTeardown for Cleanup {
    fn into_teardown(self) -> Teardown {
        Teardown::Cleanup(self)
    }
}

impl<T: IntoTeardown> IntoTeardown for Option<T> {
    fn into_teardown(self) -> Teardown {
        match self {
            Some(inner) => inner.into_teardown(),
            None => Teardown::None,
        }
    }
}

impl<T: IntoTeardown, E: fmt::Display> IntoTeardown for Result<T, E> {
    fn into_teardown(self) -> Teardown {
        match self {
            Ok(inner) => inner.into_teardown(),
            Err(error) => Teardown::Failed(error.to_string()),
        }
    }
}

impl<T> IntoTeardown for Pin<Box<dyn Future<Output = T>>> {
    fn into_teardown(self) -> Teardown {
        Teardown::Pending
    }
}

impl<T> IntoTeardown for Pin<Box<dyn Future<Output = T> + Send>> {
    fn into_teardown(self) -> Teardown {
        Teardown::Pending
    }
}

/// The two slots a computation moves through.
#[derive(Default)]
struct ComputationState {
    last_cleanup: Option<Cleanup>,
    disposed: bool,
}

pub(crate) struct ComputationInner {
    id: SubscriberId,
    body: RefCell<Box<dyn FnMut() -> Teardown>>,
    state: RefCell<ComputationState>,
    /// Cells read during the current execution.
    dependencies: RefCell<SmallVec<[Weak<dyn Dependency>; 4]>>,
    /// Computations created during the current execution.
    owned: Rc<Owner>,
    running: Cell<bool>,
    pending: Cell<bool>,
    run_count: Cell<usize>,
}

impl ComputationInner {
    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn add_dependency(&self, dependency: Weak<dyn Dependency>) {
        self.dependencies.borrow_mut().push(dependency);
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    /// Run the body, or queue a re-run if it is already running.
    pub(crate) fn execute(self: &Rc<Self>) {
        if self.is_disposed() {
            return;
        }
        if self.running.get() {
            self.pending.set(true);
            return;
        }

        let mut reruns = 0;
        loop {
            self.running.set(true);
            self.release();

            let outcome = {
                let _ctx = ReactiveContext::enter(Some(Rc::clone(self)), Some(Rc::clone(&self.owned)));
                let mut body = self.body.borrow_mut();
                let run = &mut **body;
                panic::catch_unwind(AssertUnwindSafe(|| run()))
            };

            self.running.set(false);
            self.run_count.set(self.run_count.get() + 1);

            let teardown = outcome.unwrap_or_else(|payload| {
                let error = ComputationError::Panicked(panic_message(payload.as_ref()));
                tracing::error!(computation = %self.id, %error, "tracked computation failed");
                Teardown::None
            });
            self.install(teardown);

            if self.is_disposed() || !self.pending.replace(false) {
                break;
            }
            reruns += 1;
            if reruns >= MAX_RERUNS {
                tracing::warn!(
                    computation = %self.id,
                    reruns,
                    "computation keeps invalidating itself; breaking the cycle"
                );
                break;
            }
        }
    }

    /// Release everything the previous execution acquired.
    fn release(&self) {
        self.owned.dispose_children();
        let cleanup = self.state.borrow_mut().last_cleanup.take();
        if let Some(cleanup) = cleanup {
            run_cleanup(self.id, cleanup);
        }
        self.clear_dependencies();
    }

    fn install(&self, teardown: Teardown) {
        match teardown {
            Teardown::None => {}
            Teardown::Cleanup(cleanup) => {
                if self.is_disposed() {
                    // disposed while running: nothing will call it later
                    run_cleanup(self.id, cleanup);
                } else {
                    self.state.borrow_mut().last_cleanup = Some(cleanup);
                }
            }
            Teardown::Pending => {
                tracing::warn!(
                    computation = %self.id,
                    "computation body returned a future; reads after the first await are not tracked and no cleanup is registered"
                );
            }
            Teardown::Failed(message) => {
                let error = ComputationError::Failed(message);
                tracing::error!(computation = %self.id, %error, "tracked computation failed");
            }
        }
    }

    fn clear_dependencies(&self) {
        let dependencies = std::mem::take(&mut *self.dependencies.borrow_mut());
        for dependency in dependencies {
            if let Some(dependency) = dependency.upgrade() {
                dependency.unsubscribe(self.id);
            }
        }
    }

    pub(crate) fn dispose(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
        }

        self.owned.dispose_children();
        let cleanup = self.state.borrow_mut().last_cleanup.take();
        if let Some(cleanup) = cleanup {
            run_cleanup(self.id, cleanup);
        }
        self.clear_dependencies();
        tracing::trace!(computation = %self.id, "computation disposed");
    }
}

impl Drop for ComputationInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn run_cleanup(id: SubscriberId, cleanup: Cleanup) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
        tracing::error!(
            computation = %id,
            error = %panic_message(payload.as_ref()),
            "cleanup callback panicked"
        );
    }
}

/// A tracked, re-executing computation.
///
/// Created by [`track`]. The computation stays alive while a handle to it
/// exists or while the computation that created it keeps it; dropping the
/// last handle of a top-level computation disposes it.
///
/// # Example
///
/// ```rust
/// use archipelago_core::reactive::{cell, on_cleanup, track};
///
/// let count = cell(0);
/// let reader = count.clone();
/// let computation = track(move || {
///     let value = reader.get();
///     on_cleanup(move || println!("leaving {value}"))
/// });
///
/// count.set(1); // prints "leaving 0", then re-runs
/// computation.dispose(); // prints "leaving 1"
/// ```
#[must_use = "dropping the last handle of a top-level computation disposes it"]
#[derive(Clone)]
pub struct Computation {
    inner: Rc<ComputationInner>,
}

/// Run `body` now and again whenever a cell it read changes.
pub fn track<F, R>(body: F) -> Computation
where
    F: FnMut() -> R + 'static,
    R: IntoTeardown,
{
    Computation::new(body)
}

impl Computation {
    /// Create a computation and run it immediately.
    ///
    /// If another computation (or a [`Scope`](super::Scope)) is current, the
    /// new computation is owned by it and disposed together with it.
    pub fn new<F, R>(mut body: F) -> Self
    where
        F: FnMut() -> R + 'static,
        R: IntoTeardown,
    {
        let computation = Self {
            inner: Rc::new(ComputationInner {
                id: SubscriberId::new(),
                body: RefCell::new(Box::new(move || body().into_teardown())),
                state: RefCell::new(ComputationState::default()),
                dependencies: RefCell::new(SmallVec::new()),
                owned: Rc::new(Owner::new()),
                running: Cell::new(false),
                pending: Cell::new(false),
                run_count: Cell::new(0),
            }),
        };

        if let Some(owner) = ReactiveContext::current_owner() {
            owner.adopt(computation.clone());
        }

        computation.inner.execute();
        computation
    }

    /// Get the subscriber ID for this computation.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Dispose of the computation.
    ///
    /// The first call disposes owned computations, runs the last cleanup and
    /// unsubscribes from every cell. Further calls do nothing.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the computation has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Get the number of times the body has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Get the number of cells read during the last execution.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    /// Get the number of computations owned by the last execution.
    pub fn owned_count(&self) -> usize {
        self.inner.owned.len()
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Cooperative cancellation for async work started by a computation.
///
/// Create one at the top of the body, hand a clone to the spawned task, and
/// return [`Liveness::cleanup`]. The task checks [`Liveness::is_alive`]
/// before applying its result; the flag flips when the execution that
/// started the task is cleaned up.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Rc<Cell<bool>>,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Rc::new(Cell::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    pub fn revoke(&self) {
        self.alive.set(false);
    }

    /// A cleanup that revokes this flag.
    pub fn cleanup(&self) -> Cleanup {
        let flag = self.clone();
        on_cleanup(move || flag.revoke())
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
