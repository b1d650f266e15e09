//! Archipelago Core
//!
//! This crate provides the client runtime for the Archipelago islands
//! framework. It implements:
//!
//! - Fine-grained reactive primitives (cells, computations, derived cells)
//! - A component registry with per-component props validation
//! - Island hydration over a retained document tree
//!
//! # Architecture
//!
//! The crate is organized into three modules:
//!
//! - `reactive`: cells, computations, ownership scopes and dependency tracking
//! - `dom`: the document tree and the template/patch interface
//! - `islands`: registry, validation, binding and the hydration scan
//!
//! The reactive core is single-threaded. Handles are `Rc`-based and must stay
//! on the thread that created them.
//!
//! # Example
//!
//! ```rust
//! use archipelago_core::dom::{Document, Node, Template};
//! use archipelago_core::islands::{Hydrator, RegisterOptions, Registry};
//! use archipelago_core::reactive::cell;
//! use serde_json::Value;
//!
//! let mut registry = Registry::new();
//! registry
//!     .register(
//!         "counter",
//!         |props: Value| {
//!             let count = cell(props["start"].as_i64().unwrap_or(0));
//!             move || Template::new().markup("<p>").text(count.get()).markup("</p>")
//!         },
//!         RegisterOptions::new(),
//!     )
//!     .unwrap();
//!
//! let island = Node::element("div")
//!     .with_attribute("data-island", "")
//!     .with_attribute("data-component", "counter")
//!     .with_attribute("data-props", r#"{"start": 3}"#);
//! let document = Document::with_root(Node::element("body").with_child(island.clone()));
//!
//! let report = Hydrator::new(document, registry).hydrate_now(None);
//! assert_eq!(report.hydrated(), 1);
//! assert_eq!(island.content().as_deref(), Some("<p>3</p>"));
//! ```

pub mod dom;
pub mod islands;
pub mod reactive;
