//! The form tree.
//!
//! A [`FormNode`] owns its children by value. The position of a node inside
//! its tree is recorded as a path of names, which is all a child knows about
//! its ancestors: there is no pointer back to the parent.

mod collection;
mod projection;
mod visibility;

use std::fmt;
use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::bubbling::ErrorBubblingStrategy;
use crate::config::NodeConfig;
use crate::error::{FormError, Result, ValidationErrors};
use crate::event::{
    field_events, form_events, DependencyEvent, EventDispatcher, FormEvent, ListenerId,
};
use crate::validation::{ValidationContext, Validator};
use crate::violation::{ErrorCollection, Violation};

pub use collection::{CollectionOptions, PrototypeBuilder};

use collection::Collection;

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormState {
    /// Construction in progress.
    Building,
    /// Usable, nothing submitted yet.
    Ready,
    /// Submitted, not validated yet.
    Submitted,
    /// Submitted and free of blocking errors.
    Valid,
    /// Submitted with blocking errors.
    Invalid,
}

impl FormState {
    /// Returns whether a submission happened.
    pub const fn is_submitted(self) -> bool {
        matches!(self, Self::Submitted | Self::Valid | Self::Invalid)
    }
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Building => "building",
            Self::Ready => "ready",
            Self::Submitted => "submitted",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// Returns the slice of `data` addressed by a child key.
fn entry_of<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    match data {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// A node of a form tree: either a leaf holding a value or a compound
/// holding children.
pub struct FormNode {
    name: String,
    path: Vec<String>,
    config: NodeConfig,
    state: FormState,
    model_data: Value,
    submitted_data: Value,
    children: IndexMap<String, FormNode>,
    errors: ErrorCollection,
    events: EventDispatcher<FormEvent>,
    dependency_events: EventDispatcher<DependencyEvent>,
    validator: Option<Arc<dyn Validator>>,
    bubbling: ErrorBubblingStrategy,
    collection: Option<Collection>,
    visible: bool,
    enabled: bool,
    pending_post_submit: bool,
}

impl fmt::Debug for FormNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormNode")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("type", &self.config.type_name())
            .field("state", &self.state)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

impl FormNode {
    /// Creates a ready node.
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        let mut node = Self::building(name, config);
        node.state = FormState::Ready;
        node
    }

    /// Creates a ready leaf of the given type.
    pub fn field(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, NodeConfig::leaf(type_name))
    }

    /// Creates a ready, empty compound node.
    pub fn compound(name: impl Into<String>) -> Self {
        Self::new(name, NodeConfig::compound("form"))
    }

    pub(crate) fn building(name: impl Into<String>, config: NodeConfig) -> Self {
        let name = name.into();
        let model_data = if config.is_compound() {
            Value::Object(Map::new())
        } else {
            Value::Null
        };
        Self {
            path: vec![name.clone()],
            name,
            config,
            state: FormState::Building,
            model_data,
            submitted_data: Value::Null,
            children: IndexMap::new(),
            errors: ErrorCollection::new(),
            events: EventDispatcher::new(),
            dependency_events: EventDispatcher::new(),
            validator: None,
            bubbling: ErrorBubblingStrategy::default(),
            collection: None,
            visible: true,
            enabled: true,
            pending_post_submit: false,
        }
    }

    pub(crate) fn finish_build(&mut self) {
        if self.state == FormState::Building {
            self.state = FormState::Ready;
        }
    }

    /// Attaches a validator.
    #[must_use]
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Attaches a shared validator.
    pub fn set_validator(&mut self, validator: Arc<dyn Validator>) {
        self.validator = Some(validator);
    }

    /// Returns whether a validator is attached.
    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    /// Sets how errors of children surface in this node's deep error list.
    pub fn set_error_bubbling(&mut self, strategy: ErrorBubblingStrategy) {
        self.bubbling = strategy;
    }

    /// Returns the bubbling strategy.
    pub const fn error_bubbling(&self) -> &ErrorBubblingStrategy {
        &self.bubbling
    }

    // --- identity -------------------------------------------------------

    /// Returns the name, unique among siblings.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the names from the root down to this node.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Dotted path below the root (`address.city`); empty for the root.
    pub fn property_path(&self) -> String {
        self.path[1..].join(".")
    }

    /// Dotted path including the root name; identifies the node in events
    /// and violation origins.
    pub fn node_id(&self) -> String {
        self.path.join(".")
    }

    /// Submission name, e.g. `user[address][city]`.
    pub fn full_name(&self) -> String {
        let mut full = self.path[0].clone();
        for segment in &self.path[1..] {
            full.push('[');
            full.push_str(segment);
            full.push(']');
        }
        full
    }

    /// Element id, e.g. `user_address_city`.
    pub fn id(&self) -> String {
        self.path.join("_")
    }

    /// Returns whether the node has no parent.
    pub fn is_root(&self) -> bool {
        self.path.len() <= 1
    }

    /// Returns the immutable configuration.
    pub const fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Returns whether the node holds children.
    pub const fn is_compound(&self) -> bool {
        self.config.is_compound()
    }

    /// Returns the lifecycle state.
    pub const fn state(&self) -> FormState {
        self.state
    }

    /// Returns whether the node was submitted.
    pub const fn is_submitted(&self) -> bool {
        self.state.is_submitted()
    }

    /// Returns whether the last dependency evaluation left the node shown.
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns whether the node is neither configured nor dependency disabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.config.flag("disabled")
    }

    /// Shown and dependency-enabled nodes are validated; others are skipped.
    fn is_active(&self) -> bool {
        self.visible && self.enabled
    }

    fn set_path(&mut self, path: Vec<String>) {
        if let Some(collection) = &mut self.collection {
            collection.forget_prototype();
        }
        for (name, child) in &mut self.children {
            let mut child_path = path.clone();
            child_path.push(name.clone());
            child.set_path(child_path);
        }
        self.path = path;
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state == FormState::Building {
            return Err(FormError::NotReady {
                name: self.name.clone(),
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    // --- events ---------------------------------------------------------

    /// Returns the node's lifecycle dispatcher.
    pub const fn events(&self) -> &EventDispatcher<FormEvent> {
        &self.events
    }

    /// Returns the node's lifecycle dispatcher for registration.
    pub fn events_mut(&mut self) -> &mut EventDispatcher<FormEvent> {
        &mut self.events
    }

    /// Returns the dispatcher for [`field_events::DEPENDENCY_CHECK`].
    pub fn dependency_events_mut(&mut self) -> &mut EventDispatcher<DependencyEvent> {
        &mut self.dependency_events
    }

    /// Registers a lifecycle listener.
    pub fn on<F>(&mut self, event: impl Into<String>, callback: F, priority: i32) -> ListenerId
    where
        F: Fn(&mut FormEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.events.on(event, callback, priority)
    }

    /// Removes a lifecycle listener.
    pub fn off(&mut self, event: &str, id: ListenerId) -> bool {
        self.events.off(event, id)
    }

    /// Registers a predicate overriding the built-in dependency comparison.
    pub fn on_dependency_check<F>(&mut self, callback: F, priority: i32) -> ListenerId
    where
        F: Fn(&mut DependencyEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.dependency_events
            .on(field_events::DEPENDENCY_CHECK, callback, priority)
    }

    pub(crate) fn fire(&self, name: &str, data: Value) -> Result<FormEvent> {
        self.events
            .dispatch(name, FormEvent::new(name, self.node_id(), data))
    }

    // --- tree -----------------------------------------------------------

    /// Attaches a child, replacing any child of the same name.
    pub fn add(&mut self, mut child: Self) -> Result<&mut Self> {
        if !self.is_compound() {
            return Err(FormError::NotCompound(self.node_id()));
        }
        let mut child_path = self.path.clone();
        child_path.push(child.name.clone());
        child.set_path(child_path);
        debug!(form = %self.node_id(), child = %child.name, "adding child");

        Ok(match self.children.entry(child.name.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(child);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(child),
        })
    }

    /// Creates and attaches a leaf from a type name and options.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        options: Map<String, Value>,
    ) -> Result<&mut Self> {
        let config = NodeConfig::leaf(type_name).with_options(options);
        self.add(Self::new(name, config))
    }

    /// Detaches a child and hands it back as a root. Its subtree stays intact.
    pub fn remove(&mut self, name: &str) -> Option<Self> {
        let mut child = self.children.shift_remove(name)?;
        debug!(form = %self.node_id(), child = name, "removing child");
        let root_path = vec![child.name.clone()];
        child.set_path(root_path);
        Some(child)
    }

    /// Returns whether a child exists.
    pub fn has(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Returns a child.
    pub fn get(&self, name: &str) -> Result<&Self> {
        self.children
            .get(name)
            .ok_or_else(|| FormError::ChildNotFound {
                child: name.to_string(),
                parent: self.name.clone(),
            })
    }

    /// Returns a child for modification.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Self> {
        let parent = &self.name;
        self.children
            .get_mut(name)
            .ok_or_else(|| FormError::ChildNotFound {
                child: name.to_string(),
                parent: parent.clone(),
            })
    }

    /// Returns the children in insertion order.
    pub const fn all(&self) -> &IndexMap<String, Self> {
        &self.children
    }

    /// Returns the number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Resolves a dotted path of child names below this node.
    pub fn find(&self, path: &str) -> Result<&Self> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.get(segment))
    }

    /// Resolves a dotted path of child names for modification.
    pub fn find_mut(&mut self, path: &str) -> Result<&mut Self> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.get_mut(segment))
    }

    // --- data -----------------------------------------------------------

    /// Binds model data and pushes each child its slice.
    ///
    /// Only existing children are updated, except on collections, which
    /// rebuild their entries. Rebinding does not reset the state.
    pub fn set_data(&mut self, data: Value) -> Result<()> {
        self.ensure_ready()?;
        if self.collection.is_some() {
            return self.set_collection_data(data);
        }

        let data = self.fire(form_events::PRE_SET_DATA, data)?.into_data();
        debug!(form = %self.node_id(), "binding data");
        for (name, child) in &mut self.children {
            let slice = entry_of(&data, name).cloned();
            let slice = if child.is_compound() {
                match slice {
                    Some(value @ (Value::Object(_) | Value::Array(_))) => value,
                    _ => Value::Object(Map::new()),
                }
            } else {
                slice.unwrap_or(Value::Null)
            };
            child.set_data(slice)?;
        }
        self.model_data = data;

        if !self.is_compound() {
            self.fire(field_events::VALUE_SET, self.model_data.clone())?;
        }
        self.fire(form_events::POST_SET_DATA, self.model_data.clone())?;
        Ok(())
    }

    /// Returns the bound data as last set.
    pub const fn model_data(&self) -> &Value {
        &self.model_data
    }

    /// Returns the raw data of the last submission.
    pub const fn submitted_data(&self) -> &Value {
        &self.submitted_data
    }

    /// Returns the node's data.
    ///
    /// A leaf returns its submitted value once submitted and its bound
    /// value before. A compound node always gathers its children's data,
    /// so edits made directly on a child show up in its ancestors. A
    /// compound node without children, other than a collection, keeps the
    /// data it was given.
    pub fn get_data(&self) -> Value {
        let holds_raw = self.children.is_empty() && self.collection.is_none();
        if !self.is_compound() || holds_raw {
            return if self.is_submitted() {
                self.submitted_data.clone()
            } else {
                self.model_data.clone()
            };
        }
        Value::Object(
            self.children
                .iter()
                .map(|(name, child)| (name.clone(), child.get_data()))
                .collect(),
        )
    }

    // --- submission -----------------------------------------------------

    /// Submits raw data, validates the tree and fires `POST_SUBMIT`.
    ///
    /// Calling this again overwrites the previous submission.
    pub fn submit(&mut self, data: Value) -> Result<()> {
        debug!(form = %self.node_id(), "submit");
        self.submit_data(data)?;
        self.refresh_dependencies()?;
        self.validate()?;
        self.finish_submit()
    }

    fn submit_data(&mut self, data: Value) -> Result<()> {
        self.ensure_ready()?;
        let data = self.fire(form_events::PRE_SUBMIT, data)?.into_data();
        if self.collection.is_some() {
            self.reconcile_entries(&data)?;
        }

        let previous = (!self.is_compound()).then(|| self.get_data());
        self.submitted_data = data;
        self.state = FormState::Submitted;
        self.pending_post_submit = true;

        if self.is_compound() {
            for (name, child) in &mut self.children {
                if child.config.flag("disabled") {
                    continue;
                }
                if let Some(slice) = entry_of(&self.submitted_data, name) {
                    child.submit_data(slice.clone())?;
                }
            }
        } else if let Some(previous) = previous {
            if previous != self.submitted_data {
                let event = FormEvent::new(
                    field_events::VALUE_CHANGE,
                    self.node_id(),
                    self.submitted_data.clone(),
                )
                .with_context("previous", previous);
                self.events.dispatch(field_events::VALUE_CHANGE, event)?;
            }
        }

        self.fire(form_events::SUBMIT, self.get_data())?;
        Ok(())
    }

    fn finish_submit(&mut self) -> Result<()> {
        for child in self.children.values_mut() {
            if child.pending_post_submit {
                child.finish_submit()?;
            }
        }
        self.pending_post_submit = false;
        self.fire(form_events::POST_SUBMIT, self.get_data())?;
        Ok(())
    }

    /// Returns the subtree to `Ready`, dropping submitted data and errors.
    pub fn reset(&mut self) {
        if self.state != FormState::Building {
            self.state = FormState::Ready;
        }
        self.submitted_data = Value::Null;
        self.errors.clear();
        self.pending_post_submit = false;
        for child in self.children.values_mut() {
            child.reset();
        }
    }

    // --- validation -----------------------------------------------------

    /// Validates children first, then this node, and returns every error
    /// of the subtree grouped by path.
    ///
    /// A submitted node ends up `Valid` or `Invalid`. Hidden and
    /// dependency-disabled subtrees are skipped.
    pub fn validate(&mut self) -> Result<ValidationErrors> {
        self.ensure_ready()?;
        self.errors.clear();

        if self.is_active() {
            for child in self.children.values_mut() {
                child.validate()?;
            }
            self.run_validator()?;
            if self.collection.is_some() {
                self.check_collection_bounds();
            }
        } else {
            debug!(form = %self.node_id(), "skipping validation of inactive node");
            for child in self.children.values_mut() {
                child.deactivate();
            }
        }

        let errors = self.get_error_list_unfiltered();
        let valid = !errors.has_blocking();
        if self.is_submitted() {
            self.state = if valid {
                FormState::Valid
            } else {
                FormState::Invalid
            };
        }
        debug!(form = %self.node_id(), valid, errors = errors.len(), "validated");

        let outcome = if valid {
            form_events::VALIDATION_SUCCESS
        } else {
            form_events::VALIDATION_ERROR
        };
        let flat = errors
            .to_flat()
            .into_iter()
            .map(|(path, message)| (path, Value::String(message)))
            .collect();
        self.fire(outcome, Value::Object(flat))?;

        Ok(ValidationErrors::from_collection(&errors))
    }

    fn deactivate(&mut self) {
        self.errors.clear();
        if self.is_submitted() {
            self.state = FormState::Valid;
        }
        for child in self.children.values_mut() {
            child.deactivate();
        }
    }

    fn run_validator(&mut self) -> Result<()> {
        let rules = self.config.option("rules");
        let Some(validator) = self.validator.clone() else {
            if rules.is_some() {
                return Err(FormError::MissingValidator(self.node_id()));
            }
            return Ok(());
        };

        let submitted = self.is_submitted();
        let value = if submitted {
            &self.submitted_data
        } else {
            &self.model_data
        };
        self.fire(field_events::VALIDATE, value.clone())?;

        let context = ValidationContext::new(&self.name, &self.path, submitted);
        let result = validator.validate(value, rules, &context);
        let origin = self.node_id();
        for (key, message) in result.into_errors() {
            let violation = if !key.is_empty() && self.find(&key).is_ok() {
                Violation::new(message).at(key.split('.'))
            } else {
                Violation::new(message).parameter("rule", key)
            };
            self.errors.add(violation.origin(origin.clone()));
        }
        Ok(())
    }

    /// Returns whether the node was submitted and the subtree holds no
    /// blocking errors.
    pub fn is_valid(&self) -> bool {
        self.state == FormState::Valid && !self.get_error_list_unfiltered().has_blocking()
    }

    // --- errors ---------------------------------------------------------

    /// Records an error on this node.
    pub fn add_error(&mut self, violation: Violation) {
        let violation = if violation.origin_path().is_none() {
            violation.origin(self.node_id())
        } else {
            violation
        };
        self.errors.add(violation);
    }

    /// Returns the errors stored on this node.
    pub const fn errors(&self) -> &ErrorCollection {
        &self.errors
    }

    /// Removes the errors stored on this node.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Returns this node's errors and, when `deep` is set, the errors of
    /// descendants that the bubbling strategies let through. Paths are
    /// relative to this node.
    pub fn get_error_list(&self, deep: bool) -> ErrorCollection {
        let mut out = ErrorCollection::new();
        let mut prefix = Vec::new();
        self.gather_errors(&mut prefix, &mut out, deep, true);
        out
    }

    /// Returns whether [`get_error_list`](Self::get_error_list) is non-empty.
    pub fn has_errors(&self, deep: bool) -> bool {
        !self.get_error_list(deep).is_empty()
    }

    /// Nested error view of the deep error list.
    pub fn get_errors_as_array(&self) -> Value {
        self.get_error_list(true).to_array()
    }

    /// Legacy `path -> messages` view of the whole subtree, bubbling or not.
    pub fn get_errors(&self) -> ValidationErrors {
        ValidationErrors::from_collection(&self.get_error_list_unfiltered())
    }

    fn get_error_list_unfiltered(&self) -> ErrorCollection {
        let mut out = ErrorCollection::new();
        let mut prefix = Vec::new();
        self.gather_errors(&mut prefix, &mut out, true, false);
        out
    }

    fn gather_errors(
        &self,
        prefix: &mut Vec<String>,
        out: &mut ErrorCollection,
        deep: bool,
        respect_bubbling: bool,
    ) {
        for violation in &self.errors {
            out.add(violation.prefixed(prefix));
        }
        if !deep {
            return;
        }
        for (name, child) in &self.children {
            if respect_bubbling && !self.bubbling.collects(name) {
                continue;
            }
            prefix.push(name.clone());
            child.gather_errors(prefix, out, deep, respect_bubbling);
            prefix.pop();
        }
    }
}
