//! Structured validation errors.
//!
//! A [`Violation`] is immutable once created. Nodes keep their own violations
//! in an [`ErrorCollection`]; aggregated views over a subtree are computed on
//! demand and never written back.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Key used for violations attached to a node itself rather than a child.
pub const FORM_ERRORS_KEY: &str = "_form";

/// Synthetic path segment used for collection size violations.
pub const COLLECTION_ERRORS_KEY: &str = "_collection";

/// Severity of a violation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Makes the owning node invalid.
    #[default]
    Error,
    /// Reported, but does not block validity.
    Warning,
    /// Informational only.
    Notice,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Notice => write!(f, "notice"),
        }
    }
}

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    message: String,
    level: Severity,
    path: Vec<String>,
    parameters: Map<String, Value>,
    origin: Option<String>,
}

impl Violation {
    /// Creates an error-level violation on the node itself.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Severity::Error,
            path: Vec::new(),
            parameters: Map::new(),
            origin: None,
        }
    }

    /// Sets the path, relative to the node holding the violation.
    #[must_use]
    pub fn at<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the severity.
    #[must_use]
    pub fn level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    /// Adds a message parameter.
    #[must_use]
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Records the dotted path of the node that produced the violation.
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the severity.
    pub const fn severity(&self) -> Severity {
        self.level
    }

    /// Returns the path segments.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Returns the message parameters.
    pub const fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Returns the dotted path of the originating node, if recorded.
    pub fn origin_path(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Returns whether this violation makes its node invalid.
    pub fn is_blocking(&self) -> bool {
        self.level == Severity::Error
    }

    /// Dot-joined path, or [`FORM_ERRORS_KEY`] for the node itself.
    pub fn flat_path(&self) -> String {
        if self.path.is_empty() {
            FORM_ERRORS_KEY.to_string()
        } else {
            self.path.join(".")
        }
    }

    /// Returns a copy of this violation seen from an ancestor.
    #[must_use]
    pub fn prefixed(&self, prefix: &[String]) -> Self {
        let mut copy = self.clone();
        copy.path = prefix.iter().chain(self.path.iter()).cloned().collect();
        copy
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.flat_path(), self.message)
    }
}

/// An append-only list of violations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorCollection {
    items: Vec<Violation>,
}

impl ErrorCollection {
    /// Creates an empty collection.
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends a violation. Duplicates are kept.
    pub fn add(&mut self, violation: Violation) {
        self.items.push(violation);
    }

    /// Appends every violation of another collection.
    pub fn extend(&mut self, other: Self) {
        self.items.extend(other.items);
    }

    /// Removes every violation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drops the violations recorded at exactly `path`.
    pub fn remove_path(&mut self, path: &[String]) {
        self.items.retain(|v| v.path != path);
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether there are no violations.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns whether any violation is error-level.
    pub fn has_blocking(&self) -> bool {
        self.items.iter().any(Violation::is_blocking)
    }

    /// Iterates over the violations in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.items.iter()
    }

    /// Returns the messages in insertion order.
    pub fn messages(&self) -> Vec<&str> {
        self.items.iter().map(Violation::message).collect()
    }

    /// Returns the violations recorded at exactly `path`.
    pub fn at_path(&self, path: &[&str]) -> Vec<&Violation> {
        self.items
            .iter()
            .filter(|v| v.path.iter().map(String::as_str).eq(path.iter().copied()))
            .collect()
    }

    /// Flattens to `{"path.to.field": "first message"}`.
    pub fn to_flat(&self) -> IndexMap<String, String> {
        let mut flat = IndexMap::new();
        for violation in &self.items {
            flat.entry(violation.flat_path())
                .or_insert_with(|| violation.message.clone());
        }
        flat
    }

    /// Materializes a nested map mirroring the tree shape.
    ///
    /// Leaves map to message lists. When a path holds both its own messages
    /// and child messages, its own go under [`FORM_ERRORS_KEY`].
    pub fn to_array(&self) -> Value {
        let mut root = Map::new();
        for violation in &self.items {
            insert_nested(&mut root, &violation.path, &violation.message);
        }
        Value::Object(root)
    }
}

fn push_message(map: &mut Map<String, Value>, key: &str, message: &str) {
    if let Value::Array(list) = map
        .entry(key)
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        list.push(Value::String(message.to_string()));
    }
}

fn insert_nested(map: &mut Map<String, Value>, path: &[String], message: &str) {
    match path.split_first() {
        None => push_message(map, FORM_ERRORS_KEY, message),
        Some((head, [])) => match map.get_mut(head) {
            Some(Value::Object(inner)) => push_message(inner, FORM_ERRORS_KEY, message),
            Some(Value::Array(list)) => list.push(Value::String(message.to_string())),
            _ => {
                map.insert(
                    head.clone(),
                    Value::Array(vec![Value::String(message.to_string())]),
                );
            }
        },
        Some((head, rest)) => {
            let slot = map
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Array(list) = slot {
                let own = std::mem::take(list);
                let mut wrapped = Map::new();
                wrapped.insert(FORM_ERRORS_KEY.to_string(), Value::Array(own));
                *slot = Value::Object(wrapped);
            }
            if let Value::Object(inner) = slot {
                insert_nested(inner, rest, message);
            }
        }
    }
}

impl<'a> IntoIterator for &'a ErrorCollection {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Violation> for ErrorCollection {
    fn from_iter<T: IntoIterator<Item = Violation>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_keeps_duplicates() {
        let mut errors = ErrorCollection::new();
        errors.add(Violation::new("required").at(["name"]));
        errors.add(Violation::new("required").at(["name"]));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_to_flat_keeps_first_message_per_path() {
        let errors: ErrorCollection = vec![
            Violation::new("too short").at(["user", "password"]),
            Violation::new("needs a digit").at(["user", "password"]),
            Violation::new("required").at(["email"]),
        ]
        .into_iter()
        .collect();

        let flat = errors.to_flat();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat["user.password"], "too short");
        assert_eq!(flat["email"], "required");
    }

    #[test]
    fn test_to_array_mirrors_tree() {
        let errors: ErrorCollection = vec![
            Violation::new("required").at(["email"]),
            Violation::new("invalid zip").at(["address", "zip"]),
            Violation::new("unknown city").at(["address", "city"]),
            Violation::new("expired"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            errors.to_array(),
            json!({
                "email": ["required"],
                "address": {
                    "zip": ["invalid zip"],
                    "city": ["unknown city"],
                },
                "_form": ["expired"],
            })
        );
    }

    #[test]
    fn test_to_array_moves_own_messages_aside_for_children() {
        let errors: ErrorCollection = vec![
            Violation::new("address incomplete").at(["address"]),
            Violation::new("required").at(["address", "city"]),
            Violation::new("still incomplete").at(["address"]),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            errors.to_array(),
            json!({
                "address": {
                    "_form": ["address incomplete", "still incomplete"],
                    "city": ["required"],
                },
            })
        );
    }

    #[test]
    fn test_prefixed_does_not_touch_original() {
        let original = Violation::new("required").at(["city"]).origin("address.city");
        let seen = original.prefixed(&["address".to_string()]);
        assert_eq!(seen.flat_path(), "address.city");
        assert_eq!(original.flat_path(), "city");
        assert_eq!(seen.origin_path(), Some("address.city"));
    }

    #[test]
    fn test_severity_controls_blocking() {
        let mut errors = ErrorCollection::new();
        errors.add(Violation::new("weak password").level(Severity::Warning));
        assert!(!errors.has_blocking());
        errors.add(Violation::new("required"));
        assert!(errors.has_blocking());
    }

    #[test]
    fn test_remove_path() {
        let mut errors = ErrorCollection::new();
        errors.add(Violation::new("too few").at([COLLECTION_ERRORS_KEY]));
        errors.add(Violation::new("required").at(["0"]));
        errors.remove_path(&[COLLECTION_ERRORS_KEY.to_string()]);
        assert_eq!(errors.messages(), vec!["required"]);
        assert_eq!(errors.at_path(&["0"]).len(), 1);
    }
}
