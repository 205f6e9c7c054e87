//! Integration tests for the error model and bubbling.

mod common;

use common::{failing_field, init_tracing, signup_form};
use oxide_form_tree::{ErrorBubblingStrategy, FormNode, Severity, Violation};
use serde_json::json;

fn parent_with_failing_child() -> FormNode {
    let mut parent = FormNode::compound("parent");
    parent.add(failing_field("child", "required")).unwrap();
    parent
}

#[test]
fn test_bubbling_enabled_merges_child_errors() {
    init_tracing();
    let mut parent = parent_with_failing_child();
    parent.submit(json!({"child": "x"})).unwrap();

    let flat = parent.get_error_list(true).to_flat();
    assert_eq!(flat.len(), 1);
    assert_eq!(flat["child"], "required");
    assert!(parent.get_error_list(false).is_empty());
}

#[test]
fn test_bubbling_disabled_hides_child_errors() {
    init_tracing();
    let mut parent = parent_with_failing_child();
    parent.set_error_bubbling(ErrorBubblingStrategy::disabled());
    parent.submit(json!({"child": "x"})).unwrap();

    assert!(parent.get_error_list(true).to_flat().is_empty());
    assert!(!parent.has_errors(true));
    // The child keeps its errors and the parent is still invalid.
    assert!(parent.get("child").unwrap().has_errors(false));
    assert!(!parent.is_valid());
}

#[test]
fn test_bubbling_never_copies_errors() {
    init_tracing();
    let mut parent = parent_with_failing_child();
    parent.submit(json!({"child": "x"})).unwrap();

    assert_eq!(parent.get_error_list(true).len(), 1);
    assert_eq!(parent.get_error_list(true).len(), 1);
    assert!(parent.errors().is_empty());
    assert_eq!(parent.get("child").unwrap().errors().len(), 1);
}

#[test]
fn test_excluded_child() {
    init_tracing();
    let mut form = FormNode::compound("form");
    form.add(failing_field("shown", "visible error")).unwrap();
    form.add(failing_field("muted", "hidden error")).unwrap();
    form.set_error_bubbling(ErrorBubblingStrategy::enabled().exclude("muted"));
    form.validate().unwrap();

    let flat = form.get_error_list(true).to_flat();
    assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["shown"]);
}

#[test]
fn test_bubbling_is_decided_per_node() {
    init_tracing();
    let mut form = FormNode::compound("form");
    let group = form.add(FormNode::compound("group")).unwrap();
    group.add(failing_field("leaf", "deep error")).unwrap();
    group.set_error_bubbling(ErrorBubblingStrategy::disabled());
    form.validate().unwrap();

    assert!(form.get_error_list(true).is_empty());
    assert_eq!(form.get_errors().len(), 1);
}

#[test]
fn test_nested_array_view() {
    init_tracing();
    let mut form = signup_form();
    form.submit(json!({"email": "", "password": "short", "address": {"city": ""}}))
        .unwrap();
    form.add_error(Violation::new("Please try again."));

    assert_eq!(
        form.get_errors_as_array(),
        json!({
            "_form": ["Please try again."],
            "email": ["This field is required."],
            "password": ["Ensure this value has at least 8 characters."],
            "address": {"city": ["This field is required."]}
        })
    );
}

#[test]
fn test_flat_view_keeps_first_message_per_path() {
    init_tracing();
    let mut node = FormNode::field("code", "text");
    node.add_error(Violation::new("first"));
    node.add_error(Violation::new("second"));
    node.add_error(Violation::new("first"));

    assert_eq!(node.errors().len(), 3);
    let flat = node.get_error_list(true).to_flat();
    assert_eq!(flat["_form"], "first");
}

#[test]
fn test_warnings_do_not_invalidate() {
    init_tracing();
    let mut form = FormNode::compound("profile").with_validator(
        oxide_form_tree::validation::CallbackValidator::new(|_, _, _| {
            oxide_form_tree::validation::ValidationResult::valid()
        }),
    );
    form.add(FormNode::field("bio", "textarea")).unwrap();
    form.submit(json!({"bio": "hi"})).unwrap();
    assert!(form.is_valid());

    form.get_mut("bio")
        .unwrap()
        .add_error(Violation::new("Consider writing more.").level(Severity::Warning));
    assert!(form.has_errors(true));
    assert!(form.is_valid());

    let violation = form.get_error_list(true).iter().next().cloned().unwrap();
    assert_eq!(violation.path(), ["bio".to_string()]);
    assert_eq!(violation.origin_path(), Some("profile.bio"));
    assert!(!violation.is_blocking());
}

#[test]
fn test_legacy_view_is_derived() {
    init_tracing();
    let mut form = signup_form();
    form.submit(json!({"email": ""})).unwrap();
    let errors = form.get_errors();
    assert_eq!(
        errors.get("email"),
        Some(&vec!["This field is required.".to_string()])
    );

    form.submit(json!({
        "email": "ada@example.com",
        "password": "longenough",
        "address": {"city": "Lima"}
    }))
    .unwrap();
    assert!(form.get_errors().is_empty());
}
