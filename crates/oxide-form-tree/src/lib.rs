//! # oxide-form-tree
//!
//! Stateful form trees: bind data, accept submissions, validate recursively
//! and collect structured errors, with fields that appear and disappear
//! depending on the values of other fields.
//!
//! This crate provides:
//! - [`FormNode`], a tree of leaves, compound nodes and dynamic collections
//! - A priority-ordered, cancelable event system on every node
//! - [`Violation`]s with paths and severities, bubbled up the tree
//! - Dependency-driven visibility
//! - [`FormView`] projections for renderers
//!
//! ## Quick Start
//!
//! ```rust
//! use oxide_form_tree::validation::{ConstraintValidator, Required};
//! use oxide_form_tree::{FormBuilder, FormState};
//! use serde_json::json;
//!
//! let mut form = FormBuilder::compound("signup")
//!     .child(
//!         FormBuilder::field("email", "email")
//!             .validator(ConstraintValidator::new().constraint(Required::new())),
//!     )
//!     .child(FormBuilder::field("nickname", "text"))
//!     .build()?;
//!
//! form.submit(json!({"email": "", "nickname": "ada"}))?;
//!
//! assert_eq!(form.state(), FormState::Invalid);
//! assert_eq!(form.get_data(), json!({"email": "", "nickname": "ada"}));
//! assert_eq!(
//!     form.get_error_list(true).to_flat()["email"],
//!     "This field is required."
//! );
//! # Ok::<(), oxide_form_tree::FormError>(())
//! ```
//!
//! ## Events
//!
//! ```rust
//! use oxide_form_tree::event::form_events;
//! use oxide_form_tree::FormNode;
//! use serde_json::json;
//!
//! let mut name = FormNode::field("name", "text");
//! name.on(
//!     form_events::PRE_SUBMIT,
//!     |event| {
//!         let trimmed = event.data().as_str().map(|s| s.trim().to_string());
//!         if let Some(trimmed) = trimmed {
//!             event.set_data(json!(trimmed));
//!         }
//!         Ok(())
//!     },
//!     0,
//! );
//!
//! name.submit(json!("  Ada "))?;
//! assert_eq!(name.get_data(), json!("Ada"));
//! # Ok::<(), oxide_form_tree::FormError>(())
//! ```
//!
//! ## Conditional fields
//!
//! ```rust
//! use oxide_form_tree::{Dependency, FormNode, NodeConfig};
//! use serde_json::json;
//!
//! let mut form = FormNode::compound("contact");
//! form.add(FormNode::field("channel", "choice"))?;
//! form.add(FormNode::new(
//!     "phone",
//!     NodeConfig::leaf("text").with_dependency(Dependency::new("channel", "phone")),
//! ))?;
//!
//! form.set_data(json!({"channel": "email"}))?;
//! let view = form.create_view()?;
//! assert_eq!(view.child("phone").unwrap().var("visible"), Some(&json!(false)));
//! # Ok::<(), oxide_form_tree::FormError>(())
//! ```

mod bubbling;
mod builder;
mod config;
mod context;
mod dependency;
mod error;
pub mod event;
mod node;
mod schema;
pub mod validation;
mod view;
mod violation;

pub use bubbling::ErrorBubblingStrategy;
pub use builder::FormBuilder;
pub use config::{humanize, Dependency, DependencyEffect, NodeConfig};
pub use context::{FormContext, TypeDefinition, TypeKind};
pub use dependency::{loosely_equal, lookup, matches_expected};
pub use error::{FormError, Result, ValidationErrors};
pub use node::{CollectionOptions, FormNode, FormState, PrototypeBuilder};
pub use schema::FormSchema;
pub use view::{FormView, JsonRenderer, Renderer};
pub use violation::{ErrorCollection, Severity, Violation, COLLECTION_ERRORS_KEY, FORM_ERRORS_KEY};
