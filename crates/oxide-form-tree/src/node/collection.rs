//! Dynamic collections of entries.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::FormNode;
use crate::config::NodeConfig;
use crate::error::{FormError, Result};
use crate::event::form_events;
use crate::violation::{Violation, COLLECTION_ERRORS_KEY};

/// Builds a fresh entry for the given key.
pub type PrototypeBuilder = Arc<dyn Fn(&str) -> Result<FormNode> + Send + Sync>;

/// Options of a collection node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionOptions {
    /// Type of the entries built when no prototype builder is set.
    pub entry_type: String,
    /// Options of the entries built when no prototype builder is set.
    pub entry_options: Map<String, Value>,
    /// Minimum number of entries.
    pub min: usize,
    /// Maximum number of entries.
    pub max: Option<usize>,
    /// Whether submitted keys unknown to the collection create entries.
    pub allow_add: bool,
    /// Whether entries missing from a submission are removed.
    pub allow_delete: bool,
    /// Placeholder name of the prototype entry.
    pub prototype_name: String,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            entry_type: "text".to_string(),
            entry_options: Map::new(),
            min: 0,
            max: None,
            allow_add: false,
            allow_delete: false,
            prototype_name: "__name__".to_string(),
        }
    }
}

impl CollectionOptions {
    /// Collection of entries of the given type.
    pub fn new(entry_type: impl Into<String>) -> Self {
        Self {
            entry_type: entry_type.into(),
            ..Self::default()
        }
    }

    /// Sets an entry option.
    #[must_use]
    pub fn entry_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entry_options.insert(key.into(), value.into());
        self
    }

    /// Sets the minimum number of entries.
    #[must_use]
    pub const fn min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    /// Sets the maximum number of entries.
    #[must_use]
    pub const fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Allows submissions to add entries.
    #[must_use]
    pub const fn allow_add(mut self, allow: bool) -> Self {
        self.allow_add = allow;
        self
    }

    /// Allows submissions to delete entries.
    #[must_use]
    pub const fn allow_delete(mut self, allow: bool) -> Self {
        self.allow_delete = allow;
        self
    }

    /// Sets the prototype placeholder name.
    #[must_use]
    pub fn prototype_name(mut self, name: impl Into<String>) -> Self {
        self.prototype_name = name.into();
        self
    }
}

pub(super) struct Collection {
    options: CollectionOptions,
    builder: Option<PrototypeBuilder>,
    prototype: OnceLock<Box<FormNode>>,
}

impl Collection {
    pub(super) fn forget_prototype(&mut self) {
        self.prototype = OnceLock::new();
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("options", &self.options)
            .field("builder", &self.builder.is_some())
            .finish_non_exhaustive()
    }
}

impl FormNode {
    /// Creates a ready collection.
    pub fn collection(name: impl Into<String>, options: CollectionOptions) -> Self {
        let mut node = Self::new(name, NodeConfig::compound("collection"));
        node.make_collection(options, None);
        node
    }

    pub(crate) fn make_collection(
        &mut self,
        options: CollectionOptions,
        builder: Option<PrototypeBuilder>,
    ) {
        self.collection = Some(Collection {
            options,
            builder,
            prototype: OnceLock::new(),
        });
    }

    /// Creates a ready collection whose entries come from `builder`.
    pub fn collection_with<F>(name: impl Into<String>, options: CollectionOptions, builder: F) -> Self
    where
        F: Fn(&str) -> Result<FormNode> + Send + Sync + 'static,
    {
        Self::collection(name, options).with_prototype_builder(Arc::new(builder))
    }

    /// Replaces the entry builder. Has no effect on plain nodes.
    #[must_use]
    pub fn with_prototype_builder(mut self, builder: PrototypeBuilder) -> Self {
        if let Some(collection) = &mut self.collection {
            collection.builder = Some(builder);
            collection.forget_prototype();
        }
        self
    }

    /// Returns whether the node is a collection.
    pub const fn is_collection(&self) -> bool {
        self.collection.is_some()
    }

    /// Returns the collection options.
    pub fn collection_options(&self) -> Option<&CollectionOptions> {
        self.collection.as_ref().map(|c| &c.options)
    }

    fn collection_ref(&self) -> Result<&Collection> {
        self.collection
            .as_ref()
            .ok_or_else(|| FormError::NotACollection(self.node_id()))
    }

    /// Returns whether one more entry may be added.
    pub fn can_add(&self) -> bool {
        self.collection.as_ref().is_some_and(|c| {
            c.options.allow_add && c.options.max.map_or(true, |max| self.children.len() < max)
        })
    }

    /// Returns whether one entry may be removed.
    pub fn can_delete(&self) -> bool {
        self.collection
            .as_ref()
            .is_some_and(|c| c.options.allow_delete && self.children.len() > c.options.min)
    }

    /// Adds an entry under `index` and binds `data` to it.
    pub fn add_entry(&mut self, index: impl Into<String>, data: Value) -> Result<&mut Self> {
        self.ensure_ready()?;
        self.collection_ref()?;
        let index = index.into();
        if !self.can_add() {
            return Err(FormError::EntryRejected {
                collection: self.node_id(),
                reason: format!("cannot add entry \"{index}\""),
            });
        }
        let entry = self.build_entry(&index)?;
        if let Value::Object(model) = &mut self.model_data {
            model.insert(index.clone(), data.clone());
        }
        let entry = self.add(entry)?;
        entry.set_data(data)?;
        Ok(entry)
    }

    /// Removes the entry under `index`.
    pub fn remove_entry(&mut self, index: &str) -> Result<FormNode> {
        self.ensure_ready()?;
        self.collection_ref()?;
        if !self.can_delete() {
            return Err(FormError::EntryRejected {
                collection: self.node_id(),
                reason: format!("cannot remove entry \"{index}\""),
            });
        }
        let entry = self.remove(index).ok_or_else(|| FormError::ChildNotFound {
            child: index.to_string(),
            parent: self.name.clone(),
        })?;
        if let Value::Object(model) = &mut self.model_data {
            model.shift_remove(index);
        }
        Ok(entry)
    }

    /// Returns the template entry, built on first use.
    ///
    /// The prototype is named after the placeholder and never becomes part
    /// of the tree.
    pub fn get_prototype(&self) -> Result<&FormNode> {
        let collection = self.collection_ref()?;
        if let Some(prototype) = collection.prototype.get() {
            return Ok(&**prototype);
        }

        let name = collection.options.prototype_name.clone();
        let mut prototype = self.build_entry(&name)?;
        let mut path = self.path.clone();
        path.push(name);
        prototype.set_path(path);
        // A concurrent initializer may have won; either value is equivalent.
        let _ = collection.prototype.set(Box::new(prototype));
        collection
            .prototype
            .get()
            .map(|prototype| &**prototype)
            .ok_or_else(|| FormError::MissingPrototype(self.node_id()))
    }

    fn build_entry(&self, key: &str) -> Result<FormNode> {
        let collection = self.collection_ref()?;
        let mut entry = match &collection.builder {
            Some(builder) => builder(key)?,
            None => {
                let options = &collection.options;
                let config = NodeConfig::leaf(options.entry_type.clone())
                    .with_compound(options.entry_type == "form")
                    .with_options(options.entry_options.clone());
                FormNode::new(key, config)
            }
        };
        entry.name = key.to_string();
        entry.path = vec![key.to_string()];
        entry.finish_build();
        Ok(entry)
    }

    pub(super) fn set_collection_data(&mut self, data: Value) -> Result<()> {
        let data = self.fire(form_events::PRE_SET_DATA, data)?.into_data();
        let entries = match data {
            Value::Array(items) => items,
            Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(FormError::InvalidData {
                    path: self.node_id(),
                    message: format!("a collection expects a list of entries, got {other}"),
                })
            }
        };

        debug!(form = %self.node_id(), entries = entries.len(), "rebuilding collection");
        self.children.clear();
        let mut model = Map::new();
        for (index, entry_data) in entries.into_iter().enumerate() {
            let key = index.to_string();
            let entry = self.build_entry(&key)?;
            self.add(entry)?.set_data(entry_data.clone())?;
            model.insert(key, entry_data);
        }
        self.model_data = Value::Object(model);

        self.fire(form_events::POST_SET_DATA, self.model_data.clone())?;
        Ok(())
    }

    /// Aligns the entries with the keys of a submission.
    pub(super) fn reconcile_entries(&mut self, data: &Value) -> Result<()> {
        let Some(collection) = &self.collection else {
            return Ok(());
        };
        let (allow_add, allow_delete) = (collection.options.allow_add, collection.options.allow_delete);

        let submitted: Vec<String> = match data {
            Value::Object(map) => map.keys().cloned().collect(),
            Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(FormError::InvalidData {
                    path: self.node_id(),
                    message: format!("a collection expects a map of entries, got {other}"),
                })
            }
        };
        let submitted_set: HashSet<&str> = submitted.iter().map(String::as_str).collect();

        let removed: Vec<String> = self
            .children
            .keys()
            .filter(|key| !submitted_set.contains(key.as_str()))
            .cloned()
            .collect();
        for key in removed {
            if allow_delete {
                debug!(collection = %self.node_id(), entry = %key, "removing entry");
                self.children.shift_remove(&key);
            } else {
                warn!(collection = %self.node_id(), entry = %key, "entry missing from submission, deletion not allowed");
            }
        }

        let added: Vec<String> = submitted
            .into_iter()
            .filter(|key| !self.children.contains_key(key))
            .collect();
        for key in added {
            if allow_add {
                debug!(collection = %self.node_id(), entry = %key, "adding entry");
                let entry = self.build_entry(&key)?;
                self.add(entry)?;
            } else {
                warn!(collection = %self.node_id(), entry = %key, "unknown entry submitted, adding not allowed");
            }
        }
        Ok(())
    }

    /// Records the min/max violation, replacing the previous one.
    pub(super) fn check_collection_bounds(&mut self) {
        let Some(collection) = &self.collection else {
            return;
        };
        let (min, max) = (collection.options.min, collection.options.max);
        let path = [COLLECTION_ERRORS_KEY.to_string()];
        self.errors.remove_path(&path);

        let count = self.children.len();
        let violation = if count < min {
            Some(
                Violation::new(format!(
                    "This collection should contain {min} element(s) or more."
                ))
                .parameter("min", min),
            )
        } else {
            max.filter(|&max| count > max).map(|max| {
                Violation::new(format!(
                    "This collection should contain {max} element(s) or less."
                ))
                .parameter("max", max)
            })
        };
        if let Some(violation) = violation {
            let violation = violation
                .at(path)
                .parameter("count", count)
                .origin(self.node_id());
            self.errors.add(violation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(options: CollectionOptions) -> FormNode {
        let mut form = FormNode::compound("post");
        form.add(FormNode::collection("tags", options)).unwrap();
        form
    }

    fn keys(node: &FormNode) -> Vec<&str> {
        node.all().keys().map(String::as_str).collect()
    }

    #[test]
    fn test_set_data_rebuilds_entries() {
        let mut form = tags(CollectionOptions::new("text"));
        form.set_data(json!({"tags": ["rust", "forms"]})).unwrap();
        let collection = form.get("tags").unwrap();
        assert_eq!(keys(collection), vec!["0", "1"]);
        assert_eq!(collection.get("1").unwrap().get_data(), json!("forms"));
        assert_eq!(collection.get("1").unwrap().full_name(), "post[tags][1]");

        form.set_data(json!({"tags": ["only"]})).unwrap();
        assert_eq!(keys(form.get("tags").unwrap()), vec!["0"]);
    }

    #[test]
    fn test_set_data_rekeys_maps() {
        let mut collection = FormNode::collection("tags", CollectionOptions::default());
        collection.set_data(json!({"7": "a", "3": "b"})).unwrap();
        assert_eq!(keys(&collection), vec!["0", "1"]);
        assert_eq!(collection.get_data(), json!({"0": "a", "1": "b"}));
    }

    #[test]
    fn test_set_data_rejects_scalars() {
        let mut collection = FormNode::collection("tags", CollectionOptions::default());
        assert!(matches!(
            collection.set_data(json!("nope")),
            Err(FormError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_reconcile_adds_and_removes() {
        let options = CollectionOptions::default()
            .allow_add(true)
            .allow_delete(true);
        let mut collection = FormNode::collection("tags", options);
        collection.set_data(json!(["a", "b", "c"])).unwrap();

        collection.submit(json!({"0": "x", "3": "y"})).unwrap();
        assert_eq!(keys(&collection), vec!["0", "3"]);
        assert_eq!(collection.get_data(), json!({"0": "x", "3": "y"}));
    }

    #[test]
    fn test_reconcile_respects_flags() {
        let mut collection = FormNode::collection("tags", CollectionOptions::default());
        collection.set_data(json!(["a", "b", "c"])).unwrap();

        collection.submit(json!({"0": "x", "3": "y"})).unwrap();
        assert_eq!(keys(&collection), vec!["0", "1", "2"]);
        assert_eq!(collection.get("0").unwrap().get_data(), json!("x"));
        // Entries absent from the submission keep their bound data.
        assert_eq!(collection.get("1").unwrap().get_data(), json!("b"));
    }

    #[test]
    fn test_scalar_submission_is_rejected() {
        let options = CollectionOptions::default().allow_add(true).allow_delete(true);
        let mut collection = FormNode::collection("tags", options);
        collection.set_data(json!(["a", "b"])).unwrap();

        let err = collection.submit(json!("a,b")).unwrap_err();
        assert!(matches!(err, FormError::InvalidData { .. }));
        assert_eq!(keys(&collection), vec!["0", "1"]);
        assert_eq!(collection.state(), crate::node::FormState::Ready);
    }

    #[test]
    fn test_bounds() {
        let options = CollectionOptions::default()
            .min(1)
            .max(3)
            .allow_add(true)
            .allow_delete(true);

        for (count, valid) in [(0, false), (1, true), (3, true), (4, false)] {
            let mut collection = FormNode::collection("tags", options.clone());
            let data: Map<String, Value> =
                (0..count).map(|i| (i.to_string(), json!("t"))).collect();
            collection.submit(Value::Object(data)).unwrap();

            assert_eq!(collection.is_valid(), valid, "{count} entries");
            let bounded = collection.errors().at_path(&[COLLECTION_ERRORS_KEY]);
            assert_eq!(bounded.len(), usize::from(!valid), "{count} entries");
        }
    }

    #[test]
    fn test_bounds_error_is_replaced() {
        let options = CollectionOptions::default().min(2);
        let mut collection = FormNode::collection("tags", options);
        collection.validate().unwrap();
        collection.validate().unwrap();
        assert_eq!(collection.errors().len(), 1);
    }

    #[test]
    fn test_add_and_remove_entry() {
        let options = CollectionOptions::default()
            .min(1)
            .max(2)
            .allow_add(true)
            .allow_delete(true);
        let mut collection = FormNode::collection("tags", options);
        collection.set_data(json!(["a"])).unwrap();

        assert!(!collection.can_delete());
        assert!(matches!(
            collection.remove_entry("0"),
            Err(FormError::EntryRejected { .. })
        ));

        collection.add_entry("1", json!("b")).unwrap();
        assert!(!collection.can_add());
        assert!(collection.add_entry("2", json!("c")).is_err());
        assert_eq!(collection.get_data(), json!({"0": "a", "1": "b"}));

        let removed = collection.remove_entry("0").unwrap();
        assert!(removed.is_root());
        assert_eq!(keys(&collection), vec!["1"]);
    }

    #[test]
    fn test_entry_ops_on_plain_node() {
        let mut form = FormNode::compound("post");
        assert!(matches!(
            form.add_entry("0", Value::Null),
            Err(FormError::NotACollection(_))
        ));
        assert!(form.get_prototype().is_err());
        assert!(!form.can_add());
    }

    #[test]
    fn test_prototype_uses_builder() {
        let options = CollectionOptions::default().allow_add(true);
        let mut form = FormNode::compound("order");
        form.add(FormNode::collection_with("lines", options, |key| {
            let mut line = FormNode::compound(key);
            line.add(FormNode::field("sku", "text"))?;
            line.add(FormNode::field("qty", "number"))?;
            Ok(line)
        }))
        .unwrap();

        let lines = form.get("lines").unwrap();
        let prototype = lines.get_prototype().unwrap();
        assert_eq!(prototype.name(), "__name__");
        assert_eq!(
            prototype.get("qty").unwrap().full_name(),
            "order[lines][__name__][qty]"
        );
        assert!(lines.is_empty());
    }
}
