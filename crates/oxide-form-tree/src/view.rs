//! Render-ready projections of a form tree.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// An immutable snapshot of a node prepared for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    vars: Map<String, Value>,
    children: IndexMap<String, FormView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prototype: Option<Box<FormView>>,
}

impl FormView {
    pub(crate) fn new(
        vars: Map<String, Value>,
        children: IndexMap<String, Self>,
        prototype: Option<Self>,
    ) -> Self {
        Self {
            vars,
            children,
            prototype: prototype.map(Box::new),
        }
    }

    /// Returns every variable.
    pub const fn vars(&self) -> &Map<String, Value> {
        &self.vars
    }

    /// Returns one variable.
    pub fn var(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Returns a boolean variable, `false` when absent.
    pub fn flag(&self, key: &str) -> bool {
        self.var(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Returns the node name.
    pub fn name(&self) -> &str {
        self.var("name").and_then(Value::as_str).unwrap_or_default()
    }

    /// Returns the error messages shown next to the node.
    pub fn errors(&self) -> Vec<&str> {
        self.var("errors")
            .and_then(Value::as_array)
            .map(|errors| errors.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns the child views in tree order.
    pub const fn children(&self) -> &IndexMap<String, Self> {
        &self.children
    }

    /// Returns a child view.
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.get(name)
    }

    /// Returns the view of a collection's template entry.
    pub fn prototype(&self) -> Option<&Self> {
        self.prototype.as_deref()
    }
}

/// Turns a view into output. Themes and templates live behind this trait.
pub trait Renderer {
    /// What rendering produces.
    type Output;

    /// Renders a view.
    fn render(&self, view: &FormView) -> Result<Self::Output>;
}

/// Renders views as JSON documents, e.g. for client-side forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    /// Creates a compact renderer.
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Indents the output.
    #[must_use]
    pub const fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl Renderer for JsonRenderer {
    type Output = String;

    fn render(&self, view: &FormView) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(view)?
        } else {
            serde_json::to_string(view)?
        };
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view() -> FormView {
        let mut vars = Map::new();
        vars.insert("name".to_string(), json!("email"));
        vars.insert("errors".to_string(), json!(["required"]));
        vars.insert("required".to_string(), json!(true));
        FormView::new(vars, IndexMap::new(), None)
    }

    #[test]
    fn test_accessors() {
        let view = view();
        assert_eq!(view.name(), "email");
        assert_eq!(view.errors(), vec!["required"]);
        assert!(view.flag("required"));
        assert!(!view.flag("disabled"));
        assert!(view.prototype().is_none());
    }

    #[test]
    fn test_json_renderer() {
        let output = JsonRenderer::new().render(&view()).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["vars"]["name"], json!("email"));
        assert_eq!(parsed["children"], json!({}));
        assert!(parsed.get("prototype").is_none());

        let pretty = JsonRenderer::new().pretty().render(&view()).unwrap();
        assert!(pretty.contains('\n'));
    }
}
