//! Error types for form trees.

use std::collections::HashMap;
use thiserror::Error;

use crate::violation::ErrorCollection;

/// Structural errors raised by misuse of a form tree.
///
/// Validation problems are never reported through this type; they are
/// collected as [`Violation`](crate::Violation)s on the nodes instead.
#[derive(Debug, Error)]
pub enum FormError {
    /// A child was requested that does not exist.
    #[error("child \"{child}\" does not exist in form \"{parent}\"")]
    ChildNotFound { child: String, parent: String },

    /// Children can only be attached to compound nodes.
    #[error("form \"{0}\" is not compound and cannot hold children")]
    NotCompound(String),

    /// A collection operation was called on a plain node.
    #[error("form \"{0}\" is not a collection")]
    NotACollection(String),

    /// The node is still being built.
    #[error("form \"{name}\" is not ready (state: {state})")]
    NotReady { name: String, state: String },

    /// A collection refused to add or remove an entry.
    #[error("collection \"{collection}\" rejected the entry: {reason}")]
    EntryRejected { collection: String, reason: String },

    /// A prototype was requested but the collection cannot build one.
    #[error("collection \"{0}\" has no prototype")]
    MissingPrototype(String),

    /// The node declares rules but no validator is attached.
    #[error("form \"{0}\" declares rules but has no validator")]
    MissingValidator(String),

    /// A type name was not registered in the form context.
    #[error("unknown form type: {0}")]
    UnknownType(String),

    /// Bound data has a shape the node cannot accept.
    #[error("invalid data for \"{path}\": {message}")]
    InvalidData { path: String, message: String },

    /// An event listener aborted dispatch.
    #[error("listener for {event} failed: {message}")]
    Listener { event: String, message: String },

    /// A schema or view could not be converted from or to JSON.
    #[error("invalid form JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormError {
    /// Creates a listener failure, for use inside event callbacks.
    pub fn listener(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Listener {
            event: event.into(),
            message: message.into(),
        }
    }
}

/// Legacy view of validation errors: messages grouped by field path.
///
/// This is always derived from an [`ErrorCollection`]; it is never the
/// source of truth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Errors keyed by dotted field path.
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Creates a new empty ValidationErrors.
    pub fn new() -> Self {
        Self {
            errors: HashMap::new(),
        }
    }

    /// Groups every message of a collection under its flattened path.
    pub fn from_collection(collection: &ErrorCollection) -> Self {
        let mut errors = Self::new();
        for violation in collection.iter() {
            errors.add(&violation.flat_path(), violation.message());
        }
        errors
    }

    /// Adds an error for a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Returns whether there are any errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of fields with errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns errors for a specific field.
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    /// Returns all errors as a flat list.
    pub fn all_errors(&self) -> Vec<(&str, &str)> {
        self.errors
            .iter()
            .flat_map(|(field, messages)| {
                messages
                    .iter()
                    .map(move |msg| (field.as_str(), msg.as_str()))
            })
            .collect()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (field, messages) in &self.errors {
            for message in messages {
                writeln!(f, "{field}: {message}")?;
            }
        }
        Ok(())
    }
}

/// Result type alias for form operations.
pub type Result<T> = std::result::Result<T, FormError>;
