//! Form types and the context they are registered in.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::builder::FormBuilder;
use crate::config::NodeConfig;
use crate::error::{FormError, Result};
use crate::node::{CollectionOptions, FormNode};
use crate::validation::{ConstraintValidator, Email, Range, Url, Validator};

/// Shape of the nodes a type creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A leaf holding one value.
    Field,
    /// A node holding named children.
    Compound,
    /// A node holding a dynamic list of entries.
    Collection,
}

/// A registered form type: its shape, default options and validator.
#[derive(Clone)]
pub struct TypeDefinition {
    kind: TypeKind,
    options: Map<String, Value>,
    validator: Option<Arc<dyn Validator>>,
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("kind", &self.kind)
            .field("options", &self.options)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl TypeDefinition {
    /// A leaf type.
    pub fn field() -> Self {
        Self::of(TypeKind::Field)
    }

    /// A compound type.
    pub fn compound() -> Self {
        Self::of(TypeKind::Compound)
    }

    /// A collection type.
    pub fn collection() -> Self {
        Self::of(TypeKind::Collection)
    }

    fn of(kind: TypeKind) -> Self {
        Self {
            kind,
            options: Map::new(),
            validator: None,
        }
    }

    /// Sets a default option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Sets the validator nodes of this type start with.
    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Returns the shape.
    pub const fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Returns the default options.
    pub const fn options(&self) -> &Map<String, Value> {
        &self.options
    }
}

/// Registry of form types and shared collaborators, passed explicitly to
/// whatever builds forms.
#[derive(Clone, Default)]
pub struct FormContext {
    types: HashMap<String, TypeDefinition>,
    default_validator: Option<Arc<dyn Validator>>,
}

impl fmt::Debug for FormContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.types.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("FormContext")
            .field("types", &types)
            .field("default_validator", &self.default_validator.is_some())
            .finish()
    }
}

impl FormContext {
    /// Creates a context with the built-in types registered.
    pub fn new() -> Self {
        let mut context = Self::empty();
        for name in ["text", "textarea", "password", "hidden", "choice"] {
            context.register(name, TypeDefinition::field());
        }
        context.register(
            "email",
            TypeDefinition::field().validator(ConstraintValidator::new().constraint(Email::new())),
        );
        context.register(
            "url",
            TypeDefinition::field().validator(ConstraintValidator::new().constraint(Url::new())),
        );
        context.register(
            "number",
            TypeDefinition::field()
                .validator(ConstraintValidator::new().constraint(Range::new(None, None))),
        );
        context.register("checkbox", TypeDefinition::field().option("value", "1"));
        context.register("form", TypeDefinition::compound());
        context.register("collection", TypeDefinition::collection());
        context
    }

    /// Creates a context without any type.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registers a type, replacing one of the same name.
    pub fn register(&mut self, name: impl Into<String>, definition: TypeDefinition) {
        self.types.insert(name.into(), definition);
    }

    /// Sets the validator for nodes that declare `rules` without one.
    #[must_use]
    pub fn with_default_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.default_validator = Some(validator);
        self
    }

    /// Returns whether a type is registered.
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Returns a registered type.
    pub fn type_definition(&self, name: &str) -> Result<&TypeDefinition> {
        self.types
            .get(name)
            .ok_or_else(|| FormError::UnknownType(name.to_string()))
    }

    /// Starts a builder for a node of a registered type.
    pub fn builder(&self, name: &str, type_name: &str) -> Result<FormBuilder> {
        let definition = self.type_definition(type_name)?;
        let builder = match definition.kind {
            TypeKind::Field => FormBuilder::field(name, type_name),
            TypeKind::Compound => FormBuilder::new(name, NodeConfig::compound(type_name)),
            TypeKind::Collection => FormBuilder::new(name, NodeConfig::compound(type_name))
                .collection_options(CollectionOptions::default()),
        };
        let mut builder = builder
            .options(definition.options.clone())
            .with_context(self.clone());
        if let Some(validator) = &definition.validator {
            builder = builder.shared_validator(Arc::clone(validator));
        }
        if let Some(validator) = &self.default_validator {
            builder = builder.default_validator(Arc::clone(validator));
        }
        Ok(builder)
    }

    /// Builds a node of a registered type.
    pub fn create(
        &self,
        name: &str,
        type_name: &str,
        options: Map<String, Value>,
    ) -> Result<FormNode> {
        self.builder(name, type_name)?.options(options).build()
    }
}
