//! Retained document tree.
//!
//! A minimal in-memory stand-in for the host's document: elements with
//! ordered attributes, children, and a content slot that the patcher writes
//! rendered markup into. Islands store their teardown on the node they were
//! hydrated into.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

type IslandTeardown = Box<dyn FnOnce()>;

/// A shared handle to an element in the document tree.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

struct NodeInner {
    tag: String,
    attributes: RefCell<IndexMap<String, String>>,
    children: RefCell<Vec<Node>>,
    content: RefCell<Option<String>>,
    patches: Cell<usize>,
    island: RefCell<Option<IslandTeardown>>,
}

/// A non-owning handle to a [`Node`].
#[derive(Clone)]
pub struct WeakNode {
    inner: Weak<NodeInner>,
}

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.inner.upgrade().map(|inner| Node { inner })
    }
}

impl Node {
    /// Create a detached element.
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                tag: tag.into(),
                attributes: RefCell::new(IndexMap::new()),
                children: RefCell::new(Vec::new()),
                content: RefCell::new(None),
                patches: Cell::new(0),
                island: RefCell::new(None),
            }),
        }
    }

    /// Builder form of [`Node::set_attribute`].
    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder form of [`Node::append_child`].
    pub fn with_child(self, child: Node) -> Self {
        self.append_child(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.attributes.borrow().get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.inner.attributes.borrow().contains_key(name)
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .attributes
            .borrow_mut()
            .insert(name.into(), value.into());
    }

    /// Remove an attribute. Returns `true` if it was present.
    pub fn remove_attribute(&self, name: &str) -> bool {
        self.inner.attributes.borrow_mut().shift_remove(name).is_some()
    }

    pub fn append_child(&self, child: Node) {
        self.inner.children.borrow_mut().push(child);
    }

    pub fn children(&self) -> Vec<Node> {
        self.inner.children.borrow().clone()
    }

    /// This node followed by all of its descendants, in document order.
    pub fn subtree(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            nodes.push(node);
        }
        nodes
    }

    /// Markup last written by a patcher, if any.
    pub fn content(&self) -> Option<String> {
        self.inner.content.borrow().clone()
    }

    pub fn set_content(&self, markup: String) {
        *self.inner.content.borrow_mut() = Some(markup);
        self.inner.patches.set(self.inner.patches.get() + 1);
    }

    /// Number of times the content slot was written.
    pub fn patch_count(&self) -> usize {
        self.inner.patches.get()
    }

    /// Attach the teardown of the island hydrated into this node.
    ///
    /// A teardown already attached is run first.
    pub fn attach_island(&self, teardown: impl FnOnce() + 'static) {
        let previous = self.inner.island.borrow_mut().replace(Box::new(teardown));
        if let Some(previous) = previous {
            previous();
        }
    }

    pub fn has_island(&self) -> bool {
        self.inner.island.borrow().is_some()
    }

    /// Tear down the island hydrated into this node.
    ///
    /// Returns `false` if there was none. Calling it again is a no-op.
    pub fn dispose_island(&self) -> bool {
        let teardown = self.inner.island.borrow_mut().take();
        match teardown {
            Some(teardown) => {
                teardown();
                true
            }
            None => false,
        }
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("tag", &self.inner.tag)
            .field("attributes", &*self.inner.attributes.borrow())
            .field("children", &self.inner.children.borrow().len())
            .field("content", &*self.inner.content.borrow())
            .finish()
    }
}

/// The host document: a tree under a single root element.
#[derive(Debug, Clone)]
pub struct Document {
    root: Node,
}

impl Document {
    pub fn new() -> Self {
        Self::with_root(Node::element("body"))
    }

    pub fn with_root(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
