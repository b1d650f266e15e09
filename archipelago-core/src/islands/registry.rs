//! Component Registry
//!
//! A flat map from component name to a two-phase factory and an optional
//! props validator. Names are checked against the identifier grammar
//! `[A-Za-z0-9_-]+` both when registering and before any lookup: the only
//! way to index the map is a [`ComponentName`], and the only way to get one
//! is [`ComponentName::parse`].
//!
//! # Factories
//!
//! A factory is called once per island with validated props. It performs
//! setup (creating cells and computations, wiring handlers) and returns the
//! island's render function. The binder then runs that render function inside
//! a computation of its own, so the render re-runs whenever a cell it reads
//! changes.

use std::borrow::Borrow;
use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::config::IslandConfig;
use super::error::{echo, RegistrationError, ValidationError};
use super::schema::{TypedSchema, Validator};
use crate::dom::Template;

/// Produces the markup of a hydrated island. Re-run on every change to a cell
/// it reads.
pub type RenderFn = Box<dyn FnMut() -> Template>;

/// Setup phase of a component: turns props into a render function.
pub trait ComponentFactory {
    fn create(&self, props: Value) -> Result<RenderFn, String>;
}

impl<F, R> ComponentFactory for F
where
    F: Fn(Value) -> R,
    R: FnMut() -> Template + 'static,
{
    fn create(&self, props: Value) -> Result<RenderFn, String> {
        Ok(Box::new(self(props)))
    }
}

struct TypedFactory<P, F> {
    factory: F,
    _props: std::marker::PhantomData<fn(P)>,
}

impl<P, F, R> ComponentFactory for TypedFactory<P, F>
where
    P: DeserializeOwned,
    F: Fn(P) -> R,
    R: FnMut() -> Template + 'static,
{
    fn create(&self, props: Value) -> Result<RenderFn, String> {
        let props: P = serde_json::from_value(props).map_err(|e| e.to_string())?;
        Ok(Box::new((self.factory)(props)))
    }
}

/// Does `candidate` match `[A-Za-z0-9_-]+` within `max_len` bytes?
pub fn is_valid_identifier(candidate: &str, max_len: usize) -> bool {
    !candidate.is_empty()
        && candidate.len() <= max_len
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// A component name that matched the identifier grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentName(String);

impl ComponentName {
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, ValidationError> {
        if is_valid_identifier(raw, max_len) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidIdentifier(echo(raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ComponentName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Options accepted by [`Registry::register`].
#[derive(Default)]
pub struct RegisterOptions {
    schema: Option<Box<dyn Validator>>,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate props with `schema` before the factory sees them.
    pub fn schema(mut self, schema: impl Validator + 'static) -> Self {
        self.schema = Some(Box::new(schema));
        self
    }
}

/// A registered component.
pub struct Registration {
    name: ComponentName,
    factory: Box<dyn ComponentFactory>,
    schema: Option<Box<dyn Validator>>,
}

impl Registration {
    pub fn name(&self) -> &ComponentName {
        &self.name
    }

    pub fn factory(&self) -> &dyn ComponentFactory {
        self.factory.as_ref()
    }

    pub fn schema(&self) -> Option<&dyn Validator> {
        self.schema.as_deref()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("has_schema", &self.schema.is_some())
            .finish()
    }
}

/// The set of components islands may name.
pub struct Registry {
    max_identifier_len: usize,
    components: IndexMap<ComponentName, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(&IslandConfig::default())
    }

    pub fn with_config(config: &IslandConfig) -> Self {
        Self {
            max_identifier_len: config.max_identifier_len,
            components: IndexMap::new(),
        }
    }

    /// Register `factory` under `name`.
    ///
    /// An invalid name is logged and rejected; nothing is registered.
    /// Registering a name again replaces the earlier registration.
    pub fn register(
        &mut self,
        name: &str,
        factory: impl ComponentFactory + 'static,
        options: RegisterOptions,
    ) -> Result<(), RegistrationError> {
        let Ok(name) = ComponentName::parse(name, self.max_identifier_len) else {
            let error = RegistrationError::InvalidName(echo(name));
            tracing::warn!(%error, "component registration rejected");
            return Err(error);
        };

        let registration = Registration {
            name: name.clone(),
            factory: Box::new(factory),
            schema: options.schema,
        };

        if self.components.insert(name.clone(), registration).is_some() {
            tracing::warn!(component = %name, "component registered twice; keeping the latest");
        } else {
            tracing::debug!(component = %name, "component registered");
        }
        Ok(())
    }

    /// Register a factory taking typed props, validated by `schema`.
    pub fn register_typed<P, F, R>(
        &mut self,
        name: &str,
        schema: TypedSchema<P>,
        factory: F,
    ) -> Result<(), RegistrationError>
    where
        P: DeserializeOwned + Serialize + 'static,
        F: Fn(P) -> R + 'static,
        R: FnMut() -> Template + 'static,
    {
        let factory = TypedFactory {
            factory,
            _props: std::marker::PhantomData,
        };
        self.register(name, factory, RegisterOptions::new().schema(schema))
    }

    pub fn get(&self, name: &ComponentName) -> Option<&Registration> {
        self.components.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &ComponentName> {
        self.components.keys()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}
