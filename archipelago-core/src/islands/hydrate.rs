//! Hydration Engine
//!
//! Scans a document subtree for island markers and brings each island to
//! life independently.
//!
//! # Per-island pipeline
//!
//! ```text
//! Unhydrated ──► Validating ──► Hydrated   (marker removed, render bound)
//!                    │
//!                    └────────► Rejected   (marker kept, nothing rendered)
//! ```
//!
//! 1. The component identifier must be present and match the identifier
//!    grammar before it is used for anything.
//! 2. It must name a registered component.
//! 3. The props attribute must parse as plain JSON. A missing attribute
//!    means `{}`.
//! 4. If the component registered a validator, it must accept the props; its
//!    output is what the factory receives.
//! 5. The factory runs, its render function is bound, and the marker is
//!    removed.
//!
//! A failure at any step is logged and recorded in the [`HydrationReport`];
//! the scan moves on to the next island. Nodes without the marker are not
//! islands, so scanning again only picks up islands that have not hydrated.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use futures_util::FutureExt;
use serde_json::{Map, Value};

use super::binding::bind;
use super::config::IslandConfig;
use super::error::{echo, IslandError, ValidationError};
use super::registry::{ComponentName, Registration, Registry};
use super::schema::Validation;
use crate::dom::{ContentPatcher, Document, Node, Patcher};
use crate::reactive::panic_message;

/// What happened to one island.
#[derive(Debug, Clone, PartialEq)]
pub enum IslandOutcome {
    Hydrated,
    /// The marker disappeared while the island was being validated.
    Skipped,
    Rejected(IslandError),
}

#[derive(Debug, Clone)]
pub struct IslandReport {
    pub node: Node,
    /// The component attribute as found, truncated for display.
    pub component: Option<String>,
    pub outcome: IslandOutcome,
}

/// The islands one scan found, in document order.
#[derive(Debug, Clone, Default)]
pub struct HydrationReport {
    pub islands: Vec<IslandReport>,
}

impl HydrationReport {
    pub fn hydrated(&self) -> usize {
        self.count(|outcome| matches!(outcome, IslandOutcome::Hydrated))
    }

    pub fn rejected(&self) -> usize {
        self.count(|outcome| matches!(outcome, IslandOutcome::Rejected(_)))
    }

    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    /// Errors of the rejected islands.
    pub fn errors(&self) -> impl Iterator<Item = &IslandError> {
        self.islands.iter().filter_map(|island| match &island.outcome {
            IslandOutcome::Rejected(error) => Some(error),
            _ => None,
        })
    }

    fn count(&self, predicate: impl Fn(&IslandOutcome) -> bool) -> usize {
        self.islands
            .iter()
            .filter(|island| predicate(&island.outcome))
            .count()
    }
}

/// Hydrates the islands of a document against a registry.
pub struct Hydrator {
    document: Document,
    registry: Registry,
    patcher: Rc<dyn Patcher>,
    config: IslandConfig,
}

impl Hydrator {
    pub fn new(document: Document, registry: Registry) -> Self {
        Self {
            document,
            registry,
            patcher: Rc::new(ContentPatcher),
            config: IslandConfig::default(),
        }
    }

    pub fn with_patcher(mut self, patcher: impl Patcher + 'static) -> Self {
        self.patcher = Rc::new(patcher);
        self
    }

    pub fn with_config(mut self, config: IslandConfig) -> Self {
        self.config = config;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn config(&self) -> &IslandConfig {
        &self.config
    }

    /// Hydrate every unhydrated island under `root` (the whole document when
    /// `None`), awaiting asynchronous validators.
    pub async fn hydrate(&self, root: Option<&Node>) -> HydrationReport {
        let mut report = HydrationReport::default();
        for node in self.pending(root) {
            let outcome = match self.admit(&node) {
                Ok((registration, Validation::Ready(result))) => {
                    let validated = result.map_err(ValidationError::SchemaRejected);
                    self.finish(&node, registration, validated)
                }
                Ok((registration, Validation::Pending(future))) => {
                    let validated = match AssertUnwindSafe(future).catch_unwind().await {
                        Ok(result) => result.map_err(ValidationError::SchemaRejected),
                        Err(payload) => Err(ValidationError::SchemaPanicked(panic_message(
                            payload.as_ref(),
                        ))),
                    };
                    self.finish(&node, registration, validated)
                }
                Err(error) => IslandOutcome::Rejected(error.into()),
            };
            report.islands.push(self.record(node, outcome));
        }
        report
    }

    /// Hydrate without an executor.
    ///
    /// Same as [`Hydrator::hydrate`], except that an island whose validator
    /// answers with a future is rejected with
    /// [`ValidationError::AsyncValidator`].
    pub fn hydrate_now(&self, root: Option<&Node>) -> HydrationReport {
        let mut report = HydrationReport::default();
        for node in self.pending(root) {
            let outcome = match self.admit(&node) {
                Ok((registration, Validation::Ready(result))) => {
                    let validated = result.map_err(ValidationError::SchemaRejected);
                    self.finish(&node, registration, validated)
                }
                Ok((_, Validation::Pending(_))) => {
                    IslandOutcome::Rejected(ValidationError::AsyncValidator.into())
                }
                Err(error) => IslandOutcome::Rejected(error.into()),
            };
            report.islands.push(self.record(node, outcome));
        }
        report
    }

    fn pending(&self, root: Option<&Node>) -> Vec<Node> {
        let root = root.unwrap_or_else(|| self.document.root());
        root.subtree()
            .into_iter()
            .filter(|node| node.has_attribute(&self.config.marker_attribute))
            .collect()
    }

    /// Steps 1-3, and the start of step 4.
    fn admit(&self, node: &Node) -> Result<(&Registration, Validation), ValidationError> {
        let raw = node
            .attribute(&self.config.component_attribute)
            .ok_or(ValidationError::MissingIdentifier)?;
        let name = ComponentName::parse(&raw, self.config.max_identifier_len)?;
        let registration = self
            .registry
            .get(&name)
            .ok_or_else(|| ValidationError::UnknownComponent(name.to_string()))?;

        let props = self.parse_props(node)?;
        let Some(schema) = registration.schema() else {
            return Ok((registration, Validation::accept(props)));
        };
        match panic::catch_unwind(AssertUnwindSafe(|| schema.validate(props))) {
            Ok(validation) => Ok((registration, validation)),
            Err(payload) => Err(ValidationError::SchemaPanicked(panic_message(payload.as_ref()))),
        }
    }

    fn parse_props(&self, node: &Node) -> Result<Value, ValidationError> {
        let Some(raw) = node.attribute(&self.config.props_attribute) else {
            return Ok(Value::Object(Map::new()));
        };
        if raw.len() > self.config.max_props_len {
            return Err(ValidationError::PropsTooLarge {
                len: raw.len(),
                limit: self.config.max_props_len,
            });
        }
        serde_json::from_str(&raw).map_err(|e| ValidationError::MalformedProps(e.to_string()))
    }

    /// Step 5.
    fn finish(
        &self,
        node: &Node,
        registration: &Registration,
        validated: Result<Value, ValidationError>,
    ) -> IslandOutcome {
        let props = match validated {
            Ok(props) => props,
            Err(error) => return IslandOutcome::Rejected(error.into()),
        };
        if !node.has_attribute(&self.config.marker_attribute) {
            return IslandOutcome::Skipped;
        }

        match bind(node, registration, props, Rc::clone(&self.patcher)) {
            Ok(()) => {
                node.remove_attribute(&self.config.marker_attribute);
                IslandOutcome::Hydrated
            }
            Err(error) => IslandOutcome::Rejected(error.into()),
        }
    }

    fn record(&self, node: Node, outcome: IslandOutcome) -> IslandReport {
        let component = node
            .attribute(&self.config.component_attribute)
            .map(|raw| echo(&raw));

        match &outcome {
            IslandOutcome::Hydrated => {
                tracing::debug!(component = ?component, "island hydrated");
            }
            IslandOutcome::Skipped => {
                tracing::debug!(component = ?component, "island already hydrated");
            }
            IslandOutcome::Rejected(IslandError::Validation(error)) => {
                tracing::warn!(component = ?component, %error, "island rejected");
            }
            IslandOutcome::Rejected(IslandError::Bind(error)) => {
                tracing::error!(component = ?component, %error, "island failed to hydrate");
            }
        }

        IslandReport {
            node,
            component,
            outcome,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
