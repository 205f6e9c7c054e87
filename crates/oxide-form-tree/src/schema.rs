//! Declarative JSON descriptions of form trees.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::builder::FormBuilder;
use crate::config::Dependency;
use crate::context::{FormContext, TypeKind};
use crate::error::Result;
use crate::node::{CollectionOptions, FormNode};

/// A node and its children as data.
///
/// Collection settings (`min`, `max`, `allow_add`, ...) are read from
/// `options`. `entry` describes the entries of a collection.
///
/// ```
/// use oxide_form_tree::{FormContext, FormSchema};
///
/// let schema = FormSchema::from_json(r#"{
///     "children": {
///         "kind": {"type": "choice", "options": {"choices": ["person", "company"]}},
///         "vat": {"depends_on": {"controller": "kind", "expected": "company"}}
///     }
/// }"#).unwrap();
///
/// let form = schema.build("customer", &FormContext::new()).unwrap();
/// assert_eq!(form.get("vat").unwrap().config().type_name(), "text");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSchema {
    /// Registered type; see [`resolved_type`](Self::resolved_type).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Options, including collection settings.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
    /// Children in display order.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, FormSchema>,
    /// Entry description of a collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Box<FormSchema>>,
    /// Dependency on another node's value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Dependency>,
    /// Submission method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Submission target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl FormSchema {
    /// Parses a schema.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts a parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Type used when none is given: `form` with children, `text` without.
    pub fn resolved_type(&self) -> &str {
        match &self.type_name {
            Some(type_name) => type_name.as_str(),
            None if self.children.is_empty() => "text",
            None => "form",
        }
    }

    /// Builds the tree described by the schema.
    pub fn build(&self, name: &str, context: &FormContext) -> Result<FormNode> {
        self.builder(name, context)?.build()
    }

    /// Turns the schema into a builder, e.g. to add listeners before
    /// building.
    pub fn builder(&self, name: &str, context: &FormContext) -> Result<FormBuilder> {
        let type_name = self.resolved_type();
        let kind = context.type_definition(type_name)?.kind();
        let mut builder = context
            .builder(name, type_name)?
            .options(self.options.clone());

        if let Some(method) = &self.method {
            builder = builder.method(method.clone());
        }
        if let Some(action) = &self.action {
            builder = builder.action(action.clone());
        }
        if let Some(dependency) = &self.depends_on {
            builder = builder.depends_on(dependency.clone());
        }

        if kind == TypeKind::Collection {
            let options: CollectionOptions =
                serde_json::from_value(Value::Object(self.options.clone()))?;
            builder = builder.collection_options(options);
            if let Some(entry) = &self.entry {
                let entry = (**entry).clone();
                let context = context.clone();
                builder = builder
                    .prototype_builder(Arc::new(move |key: &str| entry.build(key, &context)));
            }
        }

        for (child_name, child) in &self.children {
            builder = builder.child(child.builder(child_name, context)?);
        }
        Ok(builder)
    }
}
