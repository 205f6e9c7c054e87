//! Projection of nodes into views.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use super::FormNode;
use crate::error::{FormError, Result};
use crate::event::field_events;
use crate::view::{FormView, Renderer};

/// A message addressed to a node, with its path relative to that node.
type Addressed<'a> = (&'a [String], &'a str);

impl FormNode {
    /// Refreshes dependencies and projects the subtree into a view.
    pub fn create_view(&mut self) -> Result<FormView> {
        self.refresh_dependencies()?;
        self.project(&[])
    }

    /// Projects the subtree and hands the view to a renderer.
    pub fn render<R: Renderer>(&mut self, renderer: &R) -> Result<R::Output> {
        let view = self.create_view()?;
        renderer.render(&view)
    }

    fn project(&self, inherited: &[Addressed<'_>]) -> Result<FormView> {
        let addressed: Vec<Addressed<'_>> = self
            .errors
            .iter()
            .map(|v| (v.path(), v.message()))
            .chain(inherited.iter().copied())
            .collect();

        let mut vars = self.base_vars(&addressed);
        if let Some(choices) = self.config.option("choices") {
            let choices = self.fire(field_events::OPTIONS_LOAD, choices.clone())?;
            vars.insert("choices".to_string(), choices.into_data());
        }
        let vars = match self.fire(field_events::PRE_RENDER, Value::Object(vars))?.into_data() {
            Value::Object(vars) => vars,
            other => {
                return Err(FormError::InvalidData {
                    path: self.node_id(),
                    message: format!("view variables must be a map, got {other}"),
                })
            }
        };

        let mut children = IndexMap::with_capacity(self.children.len());
        for (name, child) in &self.children {
            let below: Vec<Addressed<'_>> = addressed
                .iter()
                .filter_map(|&(path, message)| match path.split_first() {
                    Some((head, rest)) if head == name => Some((rest, message)),
                    _ => None,
                })
                .collect();
            children.insert(name.clone(), child.project(&below)?);
        }

        let prototype = match self.collection_options() {
            Some(options) if options.allow_add => Some(self.get_prototype()?.project(&[])?),
            _ => None,
        };

        self.fire(field_events::POST_RENDER, Value::Object(vars.clone()))?;
        Ok(FormView::new(vars, children, prototype))
    }

    fn base_vars(&self, addressed: &[Addressed<'_>]) -> Map<String, Value> {
        let errors: Vec<&str> = addressed
            .iter()
            .filter(|(path, _)| path.is_empty())
            .map(|&(_, message)| message)
            .collect();
        let attr = self
            .config
            .option("attr")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let mut vars = Map::new();
        vars.insert("name".to_string(), json!(self.name));
        vars.insert("full_name".to_string(), json!(self.full_name()));
        vars.insert("id".to_string(), json!(self.id()));
        vars.insert("type".to_string(), json!(self.config.type_name()));
        vars.insert("value".to_string(), self.get_data());
        vars.insert("label".to_string(), json!(self.config.label(&self.name)));
        vars.insert("required".to_string(), json!(self.config.flag("required")));
        vars.insert("disabled".to_string(), json!(!self.is_enabled()));
        vars.insert("visible".to_string(), json!(self.visible));
        vars.insert("attr".to_string(), attr);
        vars.insert("errors".to_string(), json!(errors));
        vars.insert(
            "valid".to_string(),
            json!(!self.is_submitted() || self.is_valid()),
        );
        vars.insert("submitted".to_string(), json!(self.is_submitted()));
        vars.insert("compound".to_string(), json!(self.is_compound()));
        vars.insert("method".to_string(), json!(self.config.method()));
        vars.insert("action".to_string(), json!(self.config.action()));
        if let Some(options) = self.collection_options() {
            vars.insert("allow_add".to_string(), json!(options.allow_add));
            vars.insert("allow_delete".to_string(), json!(options.allow_delete));
            vars.insert(
                "prototype_name".to_string(),
                json!(options.prototype_name),
            );
        }
        vars
    }
}
