//! Reactive Primitives
//!
//! This module implements the core reactive system: cells, computations, and
//! derived cells. These primitives form the foundation of Archipelago's
//! fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`Cell`] is a container for mutable state. When a cell is read inside a
//! running computation, the computation becomes a subscriber. When the cell's
//! value changes, every subscriber re-executes before the write returns.
//!
//! ## Computations
//!
//! A [`Computation`] is a tracked body that runs immediately and re-runs when
//! anything it read changes. Each execution may return a cleanup, which runs
//! before the next execution and at disposal.
//!
//! ## Derived cells
//!
//! A [`Derived`] cell is a read-only cell maintained by an internal
//! computation. It caches its value and only notifies readers when the value
//! actually changes.
//!
//! # Implementation Notes
//!
//! The active computation lives in a thread-local stack of frames entered via
//! a guard ([`ReactiveContext`]), so nesting is safe and the previous frame
//! is restored even when a body panics. Subscriptions are dropped and rebuilt
//! on every execution, which keeps dependencies exact for bodies with
//! branches.
//!
//! Notification order is subscription order. Because a computation
//! re-subscribes each time it runs, that order reflects the most recent reads.

mod cell;
mod computation;
mod context;
mod derived;
mod error;
mod runtime;
mod scope;
mod subscriber;

pub use cell::{cell, Cell};
pub use computation::{
    on_cleanup, track, Cleanup, Computation, IntoTeardown, Liveness, Teardown, MAX_RERUNS,
};
pub use context::{untracked, ReactiveContext};
pub use derived::{derive, Derived};
pub use error::ComputationError;
pub use runtime::{Runtime, Source};
pub(crate) use runtime::panic_message;
pub use scope::Scope;
pub use subscriber::SubscriberId;
