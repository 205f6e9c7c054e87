//! Validator collaborators.
//!
//! The tree only needs the [`Validator`] shape. Rule syntax is owned by the
//! validator: the node passes its `rules` option through untouched.

use std::borrow::Cow;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::dependency::lookup;

static NULL: Value = Value::Null;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

/// Where in the tree a validator is running.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    name: &'a str,
    path: &'a [String],
    submitted: bool,
}

impl<'a> ValidationContext<'a> {
    pub(crate) const fn new(name: &'a str, path: &'a [String], submitted: bool) -> Self {
        Self {
            name,
            path,
            submitted,
        }
    }

    /// Name of the node being validated.
    pub const fn name(&self) -> &str {
        self.name
    }

    /// Path of the node from its root.
    pub const fn path(&self) -> &[String] {
        self.path
    }

    /// Whether the value comes from a submission rather than bound data.
    pub const fn is_submitted(&self) -> bool {
        self.submitted
    }
}

/// Outcome of a validator run: messages keyed by rule name or child path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: IndexMap<String, String>,
}

impl ValidationResult {
    /// A passing result.
    pub fn valid() -> Self {
        Self::default()
    }

    /// Records a message. The first message per key is kept.
    pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(key.into()).or_insert_with(|| message.into());
    }

    /// Builder form of [`add`](Self::add).
    #[must_use]
    pub fn with_error(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.add(key, message);
        self
    }

    /// Returns whether no error was recorded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the recorded messages.
    pub const fn errors(&self) -> &IndexMap<String, String> {
        &self.errors
    }

    /// Consumes the result, returning the recorded messages.
    pub fn into_errors(self) -> IndexMap<String, String> {
        self.errors
    }
}

/// Validates a node's value.
pub trait Validator: Send + Sync {
    /// Checks `value` against `rules` (the node's `rules` option, if any).
    fn validate(
        &self,
        value: &Value,
        rules: Option<&Value>,
        context: &ValidationContext<'_>,
    ) -> ValidationResult;
}

/// A check on a single value.
pub trait Constraint: Send + Sync {
    /// Rule name used as the error key.
    fn name(&self) -> &str;

    /// Validates a value and returns an error message if invalid.
    fn validate(&self, value: &Value) -> Result<(), String>;

    /// Returns the error message for this constraint.
    fn message(&self) -> &str;
}

fn as_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

/// Returns whether a value counts as empty.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Constraint that requires a non-empty value.
#[derive(Debug, Clone)]
pub struct Required {
    message: String,
}

impl Required {
    /// Creates a new Required constraint with default message.
    pub fn new() -> Self {
        Self::with_message("This field is required.")
    }

    /// Creates a new Required constraint with custom message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for Required {
    fn default() -> Self {
        Self::new()
    }
}

impl Constraint for Required {
    fn name(&self) -> &str {
        "required"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if is_blank(value) {
            Err(self.message.clone())
        } else {
            Ok(())
        }
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Constraint that enforces a maximum length in characters.
#[derive(Debug, Clone)]
pub struct MaxLength {
    max_length: usize,
    message: String,
}

impl MaxLength {
    /// Creates a new MaxLength constraint.
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            message: format!("Ensure this value has at most {max_length} characters."),
        }
    }
}

impl Constraint for MaxLength {
    fn name(&self) -> &str {
        "max_length"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if is_blank(value) {
            return Ok(());
        }
        match as_text(value) {
            Some(text) if text.chars().count() > self.max_length => Err(self.message.clone()),
            _ => Ok(()),
        }
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Constraint that enforces a minimum length in characters.
#[derive(Debug, Clone)]
pub struct MinLength {
    min_length: usize,
    message: String,
}

impl MinLength {
    /// Creates a new MinLength constraint.
    pub fn new(min_length: usize) -> Self {
        Self {
            min_length,
            message: format!("Ensure this value has at least {min_length} characters."),
        }
    }
}

impl Constraint for MinLength {
    fn name(&self) -> &str {
        "min_length"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if is_blank(value) {
            return Ok(());
        }
        match as_text(value) {
            Some(text) if text.chars().count() < self.min_length => Err(self.message.clone()),
            _ => Ok(()),
        }
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Constraint for email addresses. Null passes; use [`Required`] for presence.
#[derive(Debug, Clone)]
pub struct Email {
    message: String,
}

impl Email {
    /// Creates a new Email constraint with default message.
    pub fn new() -> Self {
        Self {
            message: "Enter a valid email address.".to_string(),
        }
    }
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

impl Constraint for Email {
    fn name(&self) -> &str {
        "email"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if is_blank(value) {
            return Ok(());
        }
        match value {
            Value::String(s) if EMAIL_PATTERN.is_match(s) => Ok(()),
            _ => Err(self.message.clone()),
        }
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Constraint for URL values.
#[derive(Debug, Clone)]
pub struct Url {
    message: String,
}

impl Url {
    /// Creates a new Url constraint with default message.
    pub fn new() -> Self {
        Self {
            message: "Enter a valid URL.".to_string(),
        }
    }
}

impl Default for Url {
    fn default() -> Self {
        Self::new()
    }
}

impl Constraint for Url {
    fn name(&self) -> &str {
        "url"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if is_blank(value) {
            return Ok(());
        }
        match value {
            Value::String(s) if s.starts_with("http://") || s.starts_with("https://") => Ok(()),
            _ => Err(self.message.clone()),
        }
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Constraint using a custom regex pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    pattern: Regex,
    message: String,
}

impl Pattern {
    /// Creates a new Pattern constraint.
    pub fn new(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            message: message.into(),
        })
    }
}

impl Constraint for Pattern {
    fn name(&self) -> &str {
        "pattern"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if is_blank(value) {
            return Ok(());
        }
        match as_text(value) {
            Some(text) if self.pattern.is_match(&text) => Ok(()),
            _ => Err(self.message.clone()),
        }
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Constraint for a numeric range. Numeric strings are accepted.
#[derive(Debug, Clone)]
pub struct Range {
    min: Option<f64>,
    max: Option<f64>,
    message: String,
}

impl Range {
    /// Creates a new Range constraint with min and max bounds.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        let message = match (min, max) {
            (Some(min), Some(max)) => format!("Value must be between {min} and {max}."),
            (Some(min), None) => format!("Value must be at least {min}."),
            (None, Some(max)) => format!("Value must be at most {max}."),
            (None, None) => "Invalid value.".to_string(),
        };
        Self { min, max, message }
    }
}

impl Constraint for Range {
    fn name(&self) -> &str {
        "range"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        if is_blank(value) {
            return Ok(());
        }
        let num = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| "Enter a valid number.".to_string())?;

        if self.min.is_some_and(|min| num < min) || self.max.is_some_and(|max| num > max) {
            return Err(self.message.clone());
        }
        Ok(())
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Constraint restricting a value, or every item of a list, to a set.
#[derive(Debug, Clone)]
pub struct Choice {
    choices: Vec<Value>,
    message: String,
}

impl Choice {
    /// Creates a new Choice constraint.
    pub fn new<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
            message: "Select a valid choice.".to_string(),
        }
    }

    fn allows(&self, value: &Value) -> bool {
        self.choices.contains(value)
    }
}

impl Constraint for Choice {
    fn name(&self) -> &str {
        "choice"
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        let valid = match value {
            blank if is_blank(blank) => true,
            Value::Array(items) => items.iter().all(|item| self.allows(item)),
            other => self.allows(other),
        };
        if valid {
            Ok(())
        } else {
            Err(self.message.clone())
        }
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Runs constraints against the value, or against paths inside it.
///
/// Errors of value constraints are keyed by rule name; errors of path
/// constraints are keyed by the path, so the tree attaches them to the
/// matching descendant.
#[derive(Default)]
pub struct ConstraintValidator {
    constraints: Vec<(Option<String>, Box<dyn Constraint>)>,
}

impl std::fmt::Debug for ConstraintValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.constraints
                    .iter()
                    .map(|(path, c)| (path.as_deref(), c.name())),
            )
            .finish()
    }
}

impl ConstraintValidator {
    /// Creates an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint on the whole value.
    #[must_use]
    pub fn constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraints.push((None, Box::new(constraint)));
        self
    }

    /// Adds a constraint on the value found at a dotted path.
    #[must_use]
    pub fn field(mut self, path: impl Into<String>, constraint: impl Constraint + 'static) -> Self {
        self.constraints
            .push((Some(path.into()), Box::new(constraint)));
        self
    }
}

impl Validator for ConstraintValidator {
    fn validate(
        &self,
        value: &Value,
        _rules: Option<&Value>,
        _context: &ValidationContext<'_>,
    ) -> ValidationResult {
        let mut result = ValidationResult::valid();
        for (path, constraint) in &self.constraints {
            let (key, target) = match path {
                Some(path) => (path.as_str(), lookup(value, path).unwrap_or(&NULL)),
                None => (constraint.name(), value),
            };
            if let Err(message) = constraint.validate(target) {
                result.add(key, message);
            }
        }
        result
    }
}

type CheckFn =
    dyn Fn(&Value, Option<&Value>, &ValidationContext<'_>) -> ValidationResult + Send + Sync;

/// Validator backed by a closure, for cross-field rules.
pub struct CallbackValidator {
    check: Box<CheckFn>,
}

impl std::fmt::Debug for CallbackValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackValidator").finish_non_exhaustive()
    }
}

impl CallbackValidator {
    /// Wraps a closure.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Value, Option<&Value>, &ValidationContext<'_>) -> ValidationResult
            + Send
            + Sync
            + 'static,
    {
        Self {
            check: Box::new(check),
        }
    }
}

impl Validator for CallbackValidator {
    fn validate(
        &self,
        value: &Value,
        rules: Option<&Value>,
        context: &ValidationContext<'_>,
    ) -> ValidationResult {
        (self.check)(value, rules, context)
    }
}
