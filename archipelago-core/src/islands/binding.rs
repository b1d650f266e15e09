//! Binding a component to its island node.
//!
//! Binding runs the two phases of a component:
//!
//! 1. **Setup.** The factory is called once with the validated props inside
//!    a fresh [`Scope`], so any computation it creates belongs to the island.
//!
//! 2. **Render.** The returned render function runs inside a render
//!    computation (also owned by the scope) that patches the node with each
//!    new template. It re-runs whenever a cell it reads changes.
//!
//! On success the scope's teardown is attached to the node, where
//! [`Node::dispose_island`] lets whoever replaces that part of the document
//! tear the island down. A factory that fails, or a first render that fails,
//! leaves nothing behind.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use serde_json::Value;

use super::error::BindError;
use super::registry::Registration;
use crate::dom::{Node, Patcher};
use crate::reactive::{panic_message, track, ComputationError, Scope};

/// Bind `registration` to `target` with already-validated `props`.
pub fn bind(
    target: &Node,
    registration: &Registration,
    props: Value,
    patcher: Rc<dyn Patcher>,
) -> Result<(), BindError> {
    let component = registration.name().clone();
    let scope = Scope::new();

    let created = scope.run(|| {
        panic::catch_unwind(AssertUnwindSafe(|| registration.factory().create(props)))
    });
    let mut render = match created {
        Ok(Ok(render)) => render,
        Ok(Err(message)) => return Err(BindError::FactoryFailed(message)),
        Err(payload) => return Err(BindError::FactoryPanicked(panic_message(payload.as_ref()))),
    };

    let last_error: Rc<RefCell<Option<ComputationError>>> = Rc::new(RefCell::new(None));
    let status = last_error.clone();
    let node = target.downgrade();

    scope.run(|| {
        // owned by the scope; the handle itself is not needed
        let _render = track(move || {
            let Some(node) = node.upgrade() else {
                return;
            };

            let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
                let template = render();
                patcher.patch(&node, &template);
            }));

            match rendered {
                Ok(()) => *status.borrow_mut() = None,
                Err(payload) => {
                    let error = ComputationError::Panicked(panic_message(payload.as_ref()));
                    tracing::error!(component = %component, %error, "island render failed");
                    *status.borrow_mut() = Some(error);
                }
            }
        });
    });

    let initial_error = last_error.borrow_mut().take();
    if let Some(error) = initial_error {
        scope.dispose();
        return Err(BindError::RenderFailed(error));
    }

    target.attach_island(move || scope.dispose());
    Ok(())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ContentPatcher, Template};
    use crate::islands::registry::{ComponentName, RegisterOptions, Registry};
    use crate::reactive::{cell, Cell};
    use serde_json::json;

    fn patcher() -> Rc<dyn Patcher> {
        Rc::new(ContentPatcher)
    }

    fn registration<'a>(registry: &'a Registry, name: &str) -> &'a Registration {
        let name = ComponentName::parse(name, 128).expect("valid name");
        registry.get(&name).expect("registered")
    }

    #[test]
    fn render_follows_cells_until_disposed() {
        let shared: Cell<i64> = cell(0);
        let source = shared.clone();

        let mut registry = Registry::new();
        registry
            .register(
                "counter",
                move |props: Value| {
                    let start = props["start"].as_i64().unwrap_or(0);
                    let count = source.clone();
                    count.set(start);
                    move || Template::new().markup("<p>").text(count.get()).markup("</p>")
                },
                RegisterOptions::new(),
            )
            .expect("valid name");

        let node = Node::element("div");
        bind(&node, registration(&registry, "counter"), json!({"start": 3}), patcher())
            .expect("binds");
        assert_eq!(node.content().as_deref(), Some("<p>3</p>"));

        shared.set(4);
        assert_eq!(node.content().as_deref(), Some("<p>4</p>"));

        assert!(node.dispose_island());
        shared.set(5);
        assert_eq!(node.content().as_deref(), Some("<p>4</p>"));
        assert_eq!(shared.subscriber_count(), 0);
    }

    #[test]
    fn setup_computations_are_torn_down_with_the_island() {
        let ticks = cell(0);
        let source = ticks.clone();
        let observed = Rc::new(RefCell::new(Vec::new()));
        let observed_clone = observed.clone();

        let mut registry = Registry::new();
        registry
            .register(
                "watcher",
                move |_props: Value| {
                    let reader = source.clone();
                    let observed = observed_clone.clone();
                    let _ = track(move || observed.borrow_mut().push(reader.get()));
                    || Template::new().markup("<i></i>")
                },
                RegisterOptions::new(),
            )
            .expect("valid name");

        let node = Node::element("div");
        bind(&node, registration(&registry, "watcher"), json!({}), patcher()).expect("binds");

        ticks.set(1);
        node.dispose_island();
        ticks.set(2);
        assert_eq!(*observed.borrow(), vec![0, 1]);
    }

    #[test]
    fn panicking_factory_is_reported() {
        let mut registry = Registry::new();
        registry
            .register(
                "broken",
                |_props: Value| -> Box<dyn FnMut() -> Template> { panic!("setup exploded") },
                RegisterOptions::new(),
            )
            .expect("valid name");

        let node = Node::element("div");
        let result = bind(&node, registration(&registry, "broken"), json!({}), patcher());
        assert_eq!(
            result,
            Err(BindError::FactoryPanicked("setup exploded".to_string()))
        );
        assert!(!node.has_island());
        assert!(node.content().is_none());
    }

    #[test]
    fn failing_first_render_leaves_nothing_behind() {
        let source = cell(0);
        let reader = source.clone();

        let mut registry = Registry::new();
        registry
            .register(
                "fragile",
                move |_props: Value| {
                    let reader = reader.clone();
                    move || -> Template {
                        reader.get();
                        panic!("cannot render")
                    }
                },
                RegisterOptions::new(),
            )
            .expect("valid name");

        let node = Node::element("div");
        let result = bind(&node, registration(&registry, "fragile"), json!({}), patcher());
        assert!(matches!(result, Err(BindError::RenderFailed(_))));
        assert!(!node.has_island());
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn later_render_failure_keeps_last_markup() {
        let source = cell(1);
        let reader = source.clone();

        let mut registry = Registry::new();
        registry
            .register(
                "picky",
                move |_props: Value| {
                    let reader = reader.clone();
                    move || {
                        let value = reader.get();
                        assert!(value > 0, "value must be positive");
                        Template::new().text(value)
                    }
                },
                RegisterOptions::new(),
            )
            .expect("valid name");

        let node = Node::element("div");
        bind(&node, registration(&registry, "picky"), json!({}), patcher()).expect("binds");

        source.set(-1);
        assert_eq!(node.content().as_deref(), Some("1"));
        source.set(2);
        assert_eq!(node.content().as_deref(), Some("2"));
    }
}
