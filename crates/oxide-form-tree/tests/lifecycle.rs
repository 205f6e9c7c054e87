//! Integration tests for binding, submission and the node state machine.

mod common;

use common::{init_tracing, signup_form};
use oxide_form_tree::validation::{CallbackValidator, ValidationResult};
use oxide_form_tree::{FormError, FormNode, FormState, NodeConfig};
use serde_json::json;

#[test]
fn test_submit_moves_every_node_out_of_ready() {
    init_tracing();
    let mut form = signup_form();
    assert_eq!(form.state(), FormState::Ready);
    assert!(!form.is_submitted());

    form.submit(json!({
        "email": "ada@example.com",
        "password": "correct horse",
        "address": {"city": "London"}
    }))
    .unwrap();

    for node in [
        &form,
        form.get("email").unwrap(),
        form.get("address").unwrap(),
        form.find("address.city").unwrap(),
    ] {
        assert!(node.is_submitted(), "{}", node.node_id());
        assert!(matches!(
            node.state(),
            FormState::Submitted | FormState::Valid | FormState::Invalid
        ));
    }
    assert_eq!(form.state(), FormState::Valid);
    assert!(form.is_valid());
}

#[test]
fn test_compound_data_merges_children() {
    init_tracing();
    let mut form = signup_form();
    form.submit(json!({
        "email": "ada@example.com",
        "password": "short",
        "address": {"city": "London"}
    }))
    .unwrap();

    let expected = json!({
        "email": "ada@example.com",
        "password": "short",
        "address": {"city": "London"}
    });
    assert_eq!(form.get_data(), expected);
    // Reading again does not resubmit.
    assert_eq!(form.get_data(), expected);
    assert_eq!(form.state(), FormState::Invalid);
}

#[test]
fn test_unsubmitted_children_keep_bound_data() {
    init_tracing();
    let mut form = signup_form();
    form.set_data(json!({"email": "old@example.com", "password": "longenough"}))
        .unwrap();
    form.submit(json!({"email": "new@example.com"})).unwrap();

    let data = form.get_data();
    assert_eq!(data["email"], json!("new@example.com"));
    assert_eq!(data["password"], json!("longenough"));
    assert_eq!(form.get("password").unwrap().state(), FormState::Ready);
}

#[test]
fn test_resubmission_overwrites() {
    init_tracing();
    let mut form = signup_form();
    form.submit(json!({"email": "", "address": {"city": ""}}))
        .unwrap();
    assert_eq!(form.state(), FormState::Invalid);

    form.submit(json!({
        "email": "ada@example.com",
        "password": "longenough",
        "address": {"city": "Paris"}
    }))
    .unwrap();
    assert_eq!(form.state(), FormState::Valid);
    assert!(form.get_errors().is_empty());
}

#[test]
fn test_set_data_keeps_state_until_reset() {
    init_tracing();
    let mut form = signup_form();
    form.submit(json!({"email": ""})).unwrap();
    assert_eq!(form.state(), FormState::Invalid);

    form.set_data(json!({"email": "ada@example.com"})).unwrap();
    assert_eq!(form.state(), FormState::Invalid);
    assert!(!form.is_valid());

    form.reset();
    assert_eq!(form.state(), FormState::Ready);
    assert_eq!(form.get("email").unwrap().state(), FormState::Ready);
    assert!(!form.has_errors(true));
    assert_eq!(form.get("email").unwrap().get_data(), json!("ada@example.com"));
}

#[test]
fn test_validate_before_submit_keeps_ready() {
    init_tracing();
    let mut form = signup_form();
    let errors = form.validate().unwrap();
    assert_eq!(form.state(), FormState::Ready);
    assert!(errors.get("email").is_some());
    assert!(errors.get("address.city").is_some());
}

#[test]
fn test_rules_without_validator_fail_fast() {
    init_tracing();
    let mut form = FormNode::compound("profile");
    form.add(FormNode::new(
        "age",
        NodeConfig::leaf("number").with_option("rules", "required|min:18"),
    ))
    .unwrap();

    match form.submit(json!({"age": 12})) {
        Err(FormError::MissingValidator(node)) => assert_eq!(node, "profile.age"),
        other => panic!("expected a missing validator, got {other:?}"),
    }
}

#[test]
fn test_rules_reach_validator() {
    init_tracing();
    let validator = CallbackValidator::new(|value, rules, _| {
        let mut result = ValidationResult::valid();
        if rules == Some(&json!("adult")) && value.as_i64().is_some_and(|age| age < 18) {
            result.add("adult", "Must be 18 or older.");
        }
        result
    });
    let mut age = FormNode::new("age", NodeConfig::leaf("number").with_option("rules", "adult"))
        .with_validator(validator);

    age.submit(json!(12)).unwrap();
    let errors = age.errors();
    assert_eq!(errors.messages(), vec!["Must be 18 or older."]);
    let violation = errors.iter().next().unwrap();
    assert_eq!(violation.parameters()["rule"], json!("adult"));
    assert_eq!(violation.origin_path(), Some("age"));
}

#[test]
fn test_cross_field_errors_attach_to_descendant() {
    init_tracing();
    let mut form = FormNode::compound("signup").with_validator(CallbackValidator::new(
        |value, _, _| {
            let mut result = ValidationResult::valid();
            if value["password"] != value["confirm"] {
                result.add("confirm", "Passwords do not match.");
            }
            result
        },
    ));
    form.add(FormNode::field("password", "password")).unwrap();
    form.add(FormNode::field("confirm", "password")).unwrap();

    form.submit(json!({"password": "a", "confirm": "b"})).unwrap();
    assert_eq!(form.state(), FormState::Invalid);
    let flat = form.get_error_list(true).to_flat();
    assert_eq!(flat["confirm"], "Passwords do not match.");
    assert_eq!(form.errors().at_path(&["confirm"]).len(), 1);
}

#[test]
fn test_disabled_children_ignore_submissions() {
    init_tracing();
    let mut form = FormNode::compound("account");
    form.add(FormNode::new(
        "id",
        NodeConfig::leaf("hidden").with_option("disabled", true),
    ))
    .unwrap();
    form.set_data(json!({"id": 7})).unwrap();
    form.submit(json!({"id": 99})).unwrap();
    assert_eq!(form.get_data(), json!({"id": 7}));
}

#[test]
fn test_missing_child_is_structural() {
    let form = signup_form();
    assert!(matches!(
        form.find("address.zip"),
        Err(FormError::ChildNotFound { .. })
    ));
}
