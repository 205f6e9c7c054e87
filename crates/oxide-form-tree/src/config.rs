//! Node configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a satisfied dependency toggles on the dependent node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyEffect {
    /// Show when met, hide otherwise.
    #[default]
    Visibility,
    /// Enable when met, disable otherwise.
    Enable,
}

/// Makes a node depend on another node's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    /// Dotted path of the controlling node, sibling-relative or from the root.
    pub controller: String,
    /// Expected value, or an array of accepted values.
    pub expected: Value,
    /// What the dependency toggles.
    #[serde(default)]
    pub effect: DependencyEffect,
}

impl Dependency {
    /// Creates a visibility dependency.
    pub fn new(controller: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self {
            controller: controller.into(),
            expected: expected.into(),
            effect: DependencyEffect::Visibility,
        }
    }

    /// Sets the effect.
    #[must_use]
    pub fn effect(mut self, effect: DependencyEffect) -> Self {
        self.effect = effect;
        self
    }
}

fn default_type() -> String {
    "text".to_string()
}

fn default_method() -> String {
    "POST".to_string()
}

/// Immutable configuration of a node.
///
/// The `with_*` methods are only available before the node exists; a built
/// node exposes its configuration read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(rename = "type", default = "default_type")]
    type_name: String,
    #[serde(default)]
    compound: bool,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    action: String,
    #[serde(default)]
    options: Map<String, Value>,
    #[serde(default)]
    dependency: Option<Dependency>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::leaf(default_type())
    }
}

impl NodeConfig {
    /// Configuration for a leaf holding a scalar value.
    pub fn leaf(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            compound: false,
            method: default_method(),
            action: String::new(),
            options: Map::new(),
            dependency: None,
        }
    }

    /// Configuration for a container node.
    pub fn compound(type_name: impl Into<String>) -> Self {
        Self {
            compound: true,
            ..Self::leaf(type_name)
        }
    }

    /// Sets an option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Merges options, overriding existing keys.
    #[must_use]
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options.extend(options);
        self
    }

    /// Sets the submission method.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_uppercase();
        self
    }

    /// Sets the submission target.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Makes the node depend on another node.
    #[must_use]
    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependency = Some(dependency);
        self
    }

    pub(crate) fn with_compound(mut self, compound: bool) -> Self {
        self.compound = compound;
        self
    }

    /// Returns the type tag.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns whether the node holds children.
    pub const fn is_compound(&self) -> bool {
        self.compound
    }

    /// Returns the submission method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the submission target.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns every option.
    pub const fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Returns one option.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Returns a boolean option, `false` when absent or not a boolean.
    pub fn flag(&self, key: &str) -> bool {
        self.option(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Returns the dependency, if any.
    pub const fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }

    /// Returns the `label` option, or a label derived from the node name.
    pub fn label(&self, name: &str) -> String {
        self.option("label")
            .and_then(Value::as_str)
            .map_or_else(|| humanize(name), str::to_string)
    }
}

/// Turns `first_name` into `First name`.
pub fn humanize(name: &str) -> String {
    let spaced = name.replace(['_', '-'], " ");
    let mut chars = spaced.trim().chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leaf_defaults() {
        let config = NodeConfig::leaf("email");
        assert_eq!(config.type_name(), "email");
        assert!(!config.is_compound());
        assert_eq!(config.method(), "POST");
        assert_eq!(config.action(), "");
        assert!(config.dependency().is_none());
    }

    #[test]
    fn test_options() {
        let config = NodeConfig::compound("form")
            .with_option("required", true)
            .with_option("label", "Your address")
            .with_method("get");
        assert!(config.is_compound());
        assert!(config.flag("required"));
        assert!(!config.flag("disabled"));
        assert_eq!(config.method(), "GET");
        assert_eq!(config.label("address"), "Your address");
    }

    #[test]
    fn test_label_falls_back_to_name() {
        assert_eq!(NodeConfig::default().label("first_name"), "First name");
        assert_eq!(humanize(""), "");
        assert_eq!(humanize("zip-code"), "Zip code");
    }

    #[test]
    fn test_deserialize() {
        let config: NodeConfig = serde_json::from_value(json!({
            "type": "choice",
            "options": {"choices": ["a", "b"]},
            "dependency": {"controller": "kind", "expected": ["x", "y"], "effect": "enable"},
        }))
        .unwrap();
        assert_eq!(config.type_name(), "choice");
        assert_eq!(config.method(), "POST");
        let dependency = config.dependency().unwrap();
        assert_eq!(dependency.effect, DependencyEffect::Enable);
        assert_eq!(dependency.expected, json!(["x", "y"]));
    }
}
