//! Fluent construction of form trees.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::bubbling::ErrorBubblingStrategy;
use crate::config::{Dependency, NodeConfig};
use crate::context::FormContext;
use crate::error::Result;
use crate::event::{form_events, Callback, EventSubscriber, FormEvent};
use crate::node::{CollectionOptions, FormNode, PrototypeBuilder};
use crate::validation::Validator;

/// Collects the configuration of a node and its children, then produces a
/// ready tree with [`build`](Self::build).
///
/// # Example
///
/// ```
/// use oxide_form_tree::{FormBuilder, FormState};
///
/// let form = FormBuilder::compound("login")
///     .child(FormBuilder::field("username", "text").option("required", true))
///     .child(FormBuilder::field("password", "password"))
///     .build()
///     .unwrap();
///
/// assert_eq!(form.state(), FormState::Ready);
/// assert_eq!(form.get("password").unwrap().full_name(), "login[password]");
/// ```
pub struct FormBuilder {
    name: String,
    config: NodeConfig,
    collection: Option<CollectionOptions>,
    prototype: Option<PrototypeBuilder>,
    validator: Option<Arc<dyn Validator>>,
    default_validator: Option<Arc<dyn Validator>>,
    bubbling: ErrorBubblingStrategy,
    listeners: Vec<(String, Callback<FormEvent>, i32)>,
    subscribers: Vec<Arc<dyn EventSubscriber<FormEvent>>>,
    children: Vec<FormBuilder>,
    context: Option<FormContext>,
}

impl fmt::Debug for FormBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormBuilder")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("collection", &self.collection)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

impl FormBuilder {
    /// Starts a node with an explicit configuration.
    pub fn new(name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            name: name.into(),
            config,
            collection: None,
            prototype: None,
            validator: None,
            default_validator: None,
            bubbling: ErrorBubblingStrategy::default(),
            listeners: Vec::new(),
            subscribers: Vec::new(),
            children: Vec::new(),
            context: None,
        }
    }

    /// Starts a leaf.
    pub fn field(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, NodeConfig::leaf(type_name))
    }

    /// Starts a compound node.
    pub fn compound(name: impl Into<String>) -> Self {
        Self::new(name, NodeConfig::compound("form"))
    }

    /// Starts a collection.
    pub fn collection(name: impl Into<String>, options: CollectionOptions) -> Self {
        let mut builder = Self::new(name, NodeConfig::compound("collection"));
        builder.collection = Some(options);
        builder
    }

    pub(crate) fn with_context(mut self, context: FormContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns the name of the node being built.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets an option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config = self.config.with_option(key, value);
        self
    }

    /// Merges options.
    #[must_use]
    pub fn options(mut self, options: Map<String, Value>) -> Self {
        self.config = self.config.with_options(options);
        self
    }

    /// Sets the submission method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.config = self.config.with_method(method);
        self
    }

    /// Sets the submission target.
    #[must_use]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.config = self.config.with_action(action);
        self
    }

    /// Makes the node depend on another node's value.
    #[must_use]
    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.config = self.config.with_dependency(dependency);
        self
    }

    /// Sets the validator, replacing any inherited one.
    #[must_use]
    pub fn validator(self, validator: impl Validator + 'static) -> Self {
        self.shared_validator(Arc::new(validator))
    }

    /// Sets a shared validator, replacing any inherited one.
    #[must_use]
    pub fn shared_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Validator used when the node declares `rules` and has no validator
    /// of its own.
    #[must_use]
    pub fn default_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.default_validator = Some(validator);
        self
    }

    /// Sets the error bubbling strategy.
    #[must_use]
    pub fn error_bubbling(mut self, strategy: ErrorBubblingStrategy) -> Self {
        self.bubbling = strategy;
        self
    }

    /// Registers a lifecycle listener.
    #[must_use]
    pub fn listener<F>(mut self, event: impl Into<String>, callback: F, priority: i32) -> Self
    where
        F: Fn(&mut FormEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.listeners
            .push((event.into(), Box::new(callback), priority));
        self
    }

    /// Registers a subscriber.
    #[must_use]
    pub fn subscriber(mut self, subscriber: Arc<dyn EventSubscriber<FormEvent>>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Sets the collection options. Turns the node into a collection.
    #[must_use]
    pub fn collection_options(mut self, options: CollectionOptions) -> Self {
        self.config = self.config.with_compound(true);
        self.collection = Some(options);
        self
    }

    /// Sets how a collection builds its entries.
    #[must_use]
    pub fn prototype_builder(mut self, builder: PrototypeBuilder) -> Self {
        self.prototype = Some(builder);
        self
    }

    /// Adds a child.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Builds the tree.
    ///
    /// Fires `PRE_BUILD` before the children are attached and `POST_BUILD`
    /// once the node is ready.
    pub fn build(self) -> Result<FormNode> {
        let Self {
            name,
            config,
            collection,
            prototype,
            validator,
            default_validator,
            bubbling,
            listeners,
            subscribers,
            children,
            context,
        } = self;

        let validator = validator.or_else(|| {
            config
                .option("rules")
                .and_then(|_| default_validator.clone())
        });
        let mut node = FormNode::building(name, config);

        if let Some(options) = collection {
            let prototype = prototype.or_else(|| {
                context.map(|context| entry_builder(context, options.clone()))
            });
            node.make_collection(options, prototype);
        }
        for (event, callback, priority) in listeners {
            node.events_mut().on(event, callback, priority);
        }
        for subscriber in subscribers {
            node.events_mut().add_subscriber(subscriber);
        }
        if let Some(validator) = validator {
            node.set_validator(validator);
        }
        node.set_error_bubbling(bubbling);

        let options = Value::Object(node.config().options().clone());
        node.fire(form_events::PRE_BUILD, options)?;
        for child in children {
            node.add(child.build()?)?;
        }
        node.finish_build();
        node.fire(form_events::POST_BUILD, Value::Null)?;

        debug!(form = %node.name(), children = node.len(), "built form");
        Ok(node)
    }
}

/// Entries of a collection built through a context use the registered
/// entry type.
fn entry_builder(context: FormContext, options: CollectionOptions) -> PrototypeBuilder {
    Arc::new(move |key: &str| {
        context
            .builder(key, &options.entry_type)?
            .options(options.entry_options.clone())
            .build()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::FormError;
    use crate::node::FormState;
    use crate::validation::{CallbackValidator, ValidationResult};
    use serde_json::json;

    #[test]
    fn test_build_fires_build_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pre = Arc::clone(&seen);
        let post = Arc::clone(&seen);
        let form = FormBuilder::compound("profile")
            .option("label", "Profile")
            .listener(
                form_events::PRE_BUILD,
                move |event| {
                    pre.lock().unwrap().push(event.data()["label"].clone());
                    Ok(())
                },
                0,
            )
            .listener(
                form_events::POST_BUILD,
                move |_| {
                    post.lock().unwrap().push(json!("post"));
                    Ok(())
                },
                0,
            )
            .child(FormBuilder::field("bio", "textarea"))
            .build()
            .unwrap();

        assert_eq!(form.state(), FormState::Ready);
        assert_eq!(*seen.lock().unwrap(), vec![json!("Profile"), json!("post")]);
    }

    #[test]
    fn test_listener_error_aborts_build() {
        let result = FormBuilder::compound("profile")
            .listener(
                form_events::PRE_BUILD,
                |_| Err(FormError::listener(form_events::PRE_BUILD, "nope")),
                0,
            )
            .build();
        assert!(matches!(result, Err(FormError::Listener { .. })));
    }

    #[test]
    fn test_leaf_cannot_take_children() {
        let result = FormBuilder::field("email", "email")
            .child(FormBuilder::field("nested", "text"))
            .build();
        assert!(matches!(result, Err(FormError::NotCompound(_))));
    }

    #[test]
    fn test_default_validator_needs_rules() {
        let always_fails: Arc<dyn Validator> = Arc::new(CallbackValidator::new(|_, _, _| {
            ValidationResult::valid().with_error("required", "missing")
        }));

        let plain = FormBuilder::field("a", "text")
            .default_validator(Arc::clone(&always_fails))
            .build()
            .unwrap();
        assert!(!plain.has_validator());

        let ruled = FormBuilder::field("b", "text")
            .option("rules", "required")
            .default_validator(always_fails)
            .build()
            .unwrap();
        assert!(ruled.has_validator());
    }

    #[test]
    fn test_collection_builder() {
        let options = CollectionOptions::new("text").allow_add(true);
        let mut form = FormBuilder::compound("post")
            .child(FormBuilder::collection("tags", options))
            .build()
            .unwrap();
        form.set_data(json!({"tags": ["a", "b"]})).unwrap();
        let tags = form.get("tags").unwrap();
        assert!(tags.is_collection());
        assert_eq!(tags.len(), 2);
    }
}
