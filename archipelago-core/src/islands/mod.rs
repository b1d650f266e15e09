//! Islands
//!
//! Server-rendered pages mark interactive regions ("islands") with a marker
//! attribute, the name of the component that owns the region, and its props
//! serialized as JSON. This module turns those inert regions into live,
//! reactive components.
//!
//! # Components
//!
//! - [`Registry`]: the names islands may refer to, each with a factory and an
//!   optional props validator.
//! - [`Hydrator`]: scans a document, validates every island, and binds the
//!   ones that pass.
//! - [`bind`]: runs a component's setup and keeps its render output patched
//!   into the node.
//!
//! # Trust boundary
//!
//! Everything read from the document is untrusted. An island is only bound
//! after its identifier matched the grammar, named a registered component,
//! carried well-formed props, and passed the component's validator. A
//! rejected island keeps its server-rendered markup and its marker; the other
//! islands hydrate regardless.

mod binding;
mod config;
mod error;
mod hydrate;
mod registry;
mod schema;

pub use binding::bind;
pub use config::{
    IslandConfig, DEFAULT_COMPONENT_ATTRIBUTE, DEFAULT_MARKER_ATTRIBUTE, DEFAULT_PROPS_ATTRIBUTE,
};
pub use error::{BindError, IslandError, RegistrationError, ValidationError};
pub use hydrate::{HydrationReport, Hydrator, IslandOutcome, IslandReport};
pub use registry::{
    is_valid_identifier, ComponentFactory, ComponentName, RegisterOptions, Registration, Registry,
    RenderFn,
};
pub use schema::{AsyncValidator, Issue, TypedSchema, Validation, ValidationResult, Validator};
