//! Island protocol configuration.
//!
//! Attribute names and input limits for the hydration scan. The defaults
//! match the markup the server side emits:
//!
//! ```text
//! <div data-island data-component="counter" data-props='{"start":3}'>
//!   <p>3</p>   <!-- server-rendered, replaced on hydration -->
//! </div>
//! ```

use serde::{Deserialize, Serialize};

/// Attribute marking a node as awaiting hydration.
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "data-island";

/// Attribute naming the component to hydrate.
pub const DEFAULT_COMPONENT_ATTRIBUTE: &str = "data-component";

/// Attribute carrying the serialized props.
pub const DEFAULT_PROPS_ATTRIBUTE: &str = "data-props";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandConfig {
    pub marker_attribute: String,
    pub component_attribute: String,
    pub props_attribute: String,
    /// Longest props attribute accepted, in bytes.
    pub max_props_len: usize,
    /// Longest component identifier accepted, in bytes.
    pub max_identifier_len: usize,
}

impl Default for IslandConfig {
    fn default() -> Self {
        Self {
            marker_attribute: DEFAULT_MARKER_ATTRIBUTE.to_string(),
            component_attribute: DEFAULT_COMPONENT_ATTRIBUTE.to_string(),
            props_attribute: DEFAULT_PROPS_ATTRIBUTE.to_string(),
            max_props_len: 64 * 1024,
            max_identifier_len: 128,
        }
    }
}

impl IslandConfig {
    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = IslandConfig::from_json(r#"{"marker_attribute": "data-hydrate"}"#)
            .expect("valid config");
        assert_eq!(config.marker_attribute, "data-hydrate");
        assert_eq!(config.component_attribute, DEFAULT_COMPONENT_ATTRIBUTE);
        assert_eq!(config.max_props_len, 64 * 1024);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(IslandConfig::from_json("{marker_attribute: 1}").is_err());
    }
}
