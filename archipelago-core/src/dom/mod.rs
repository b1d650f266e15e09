//! Document Model
//!
//! The hydration engine works against two collaborators: a retained document
//! tree it scans for islands, and a templating/patching layer that
//! materializes render output into a node. This module defines both
//! interfaces and ships small reference implementations of them.
//!
//! - [`Node`] / [`Document`]: an in-memory element tree with attributes and a
//!   content slot.
//! - [`Template`]: static markup plus escaped interpolations.
//! - [`Patcher`]: applies a template to a node; [`ContentPatcher`] writes the
//!   rendered markup into the node's content slot.

mod node;
mod template;

pub use node::{Document, Node, WeakNode};
pub use template::{ContentPatcher, Patcher, Template};
