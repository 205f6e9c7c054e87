//! Lifecycle events.
//!
//! Every node owns private dispatchers; nothing is shared between nodes.
//! Dispatch is synchronous and runs listeners by descending priority.

mod dispatcher;
mod names;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::dependency::lookup;

pub use dispatcher::{Callback, EventDispatcher, EventSubscriber, ListenerId, Subscription};
pub use names::{field_events, form_events};

/// Behaviour shared by all dispatchable events.
pub trait Event {
    /// Prevents the remaining listeners of the current dispatch from running.
    fn stop_propagation(&mut self);

    /// Returns whether a listener stopped propagation.
    fn is_propagation_stopped(&self) -> bool;
}

/// Event carrying a node's data through a lifecycle transition.
#[derive(Debug, Clone, PartialEq)]
pub struct FormEvent {
    name: String,
    path: String,
    data: Value,
    context: Map<String, Value>,
    propagation_stopped: bool,
}

impl FormEvent {
    /// Creates an event for the node at `path`.
    pub fn new(name: impl Into<String>, path: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            data,
            context: Map::new(),
            propagation_stopped: false,
        }
    }

    /// Attaches a context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Returns the event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dotted path of the node the event fired on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the data.
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// Returns the data for in-place edits.
    pub fn data_mut(&mut self) -> &mut Value {
        &mut self.data
    }

    /// Replaces the data.
    pub fn set_data(&mut self, data: Value) {
        self.data = data;
    }

    /// Consumes the event, returning its (possibly rewritten) data.
    pub fn into_data(self) -> Value {
        self.data
    }

    /// Returns the free-form context.
    pub const fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Returns the free-form context for edits.
    pub fn context_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.context
    }
}

impl Event for FormEvent {
    fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Event asking whether a dependent node should be shown.
///
/// Listeners decide by calling [`set_visible`](Self::set_visible). When none
/// does, the default comparison result stands.
#[derive(Debug, Clone)]
pub struct DependencyEvent {
    dependent: String,
    controller: String,
    controller_value: Value,
    expected: Value,
    form: Arc<Value>,
    context: Map<String, Value>,
    default_visible: bool,
    visible: Option<bool>,
    propagation_stopped: bool,
}

impl DependencyEvent {
    pub(crate) fn new(
        dependent: impl Into<String>,
        controller: impl Into<String>,
        controller_value: Value,
        expected: Value,
        form: Arc<Value>,
        default_visible: bool,
    ) -> Self {
        Self {
            dependent: dependent.into(),
            controller: controller.into(),
            controller_value,
            expected,
            form,
            context: Map::new(),
            default_visible,
            visible: None,
            propagation_stopped: false,
        }
    }

    /// Dotted path of the node whose visibility is being decided.
    pub fn dependent(&self) -> &str {
        &self.dependent
    }

    /// Path of the controlling node, as configured.
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Current value of the controlling node.
    pub const fn controller_value(&self) -> &Value {
        &self.controller_value
    }

    /// Value the dependency was configured to expect.
    pub const fn expected(&self) -> &Value {
        &self.expected
    }

    /// Snapshot of the owning tree's data.
    pub fn form(&self) -> &Value {
        &self.form
    }

    /// Looks up another value of the owning tree by dotted path.
    pub fn value_at(&self, path: &str) -> Option<&Value> {
        lookup(&self.form, path)
    }

    /// Returns the free-form context.
    pub const fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Returns the free-form context for edits.
    pub fn context_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.context
    }

    /// Result of the built-in comparison.
    pub const fn default_visible(&self) -> bool {
        self.default_visible
    }

    /// Overrides the built-in comparison.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = Some(visible);
    }

    /// Decision explicitly taken by a listener, if any.
    pub const fn visible(&self) -> Option<bool> {
        self.visible
    }

    /// Final decision.
    pub fn is_visible(&self) -> bool {
        self.visible.unwrap_or(self.default_visible)
    }
}

impl Event for DependencyEvent {
    fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}
