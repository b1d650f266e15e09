//! Subscriber types for the reactive system.
//!
//! A subscriber is a computation that depends on one or more cells. Cells keep
//! their subscribers in a [`SubscriberSet`], which holds them weakly and in
//! subscription order.

use std::fmt;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::computation::ComputationInner;

/// Unique identifier for a subscriber.
///
/// Each computation (including the driver of a derived cell and the render
/// computation of an island) gets a unique ID when created. The ID keys the
/// subscriber sets and keeps a computation from subscribing twice to the
/// same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// The subscribers of a single cell.
///
/// Iteration order is subscription order. A computation that re-executes
/// drops its old subscriptions first, so after a re-run it sits behind every
/// subscriber that stayed subscribed in the meantime.
#[derive(Default)]
pub(crate) struct SubscriberSet {
    entries: IndexMap<SubscriberId, Weak<ComputationInner>>,
}

impl SubscriberSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber. Returns `false` if it was already present.
    pub(crate) fn insert(&mut self, id: SubscriberId, subscriber: Weak<ComputationInner>) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, subscriber);
        true
    }

    pub(crate) fn remove(&mut self, id: SubscriberId) {
        // shift_remove keeps the remaining subscribers in order
        self.entries.shift_remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// The subscribers present right now, in notification order.
    pub(crate) fn snapshot(&self) -> Vec<Weak<ComputationInner>> {
        self.entries.values().cloned().collect()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
