#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use oxide_form_tree::validation::{CallbackValidator, ConstraintValidator, MinLength, Required};
use oxide_form_tree::{CollectionOptions, Dependency, FormNode, NodeConfig};

/// Routes library logs to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Shared log of labels, for asserting listener order.
pub type Recorder = Arc<Mutex<Vec<String>>>;

pub fn recorder() -> Recorder {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn recorded(recorder: &Recorder) -> Vec<String> {
    recorder.lock().unwrap().clone()
}

/// `signup { email (required), password (min 8), address { city (required) } }`
pub fn signup_form() -> FormNode {
    let mut form = FormNode::compound("signup");
    form.add(
        FormNode::field("email", "email")
            .with_validator(ConstraintValidator::new().constraint(Required::new())),
    )
    .unwrap();
    form.add(
        FormNode::field("password", "password")
            .with_validator(ConstraintValidator::new().constraint(MinLength::new(8))),
    )
    .unwrap();
    let address = form.add(FormNode::compound("address")).unwrap();
    address
        .add(
            FormNode::field("city", "text")
                .with_validator(ConstraintValidator::new().constraint(Required::new())),
        )
        .unwrap();
    form
}

/// A leaf whose validator always reports `message` under the `required` rule.
pub fn failing_field(name: &str, message: &'static str) -> FormNode {
    FormNode::field(name, "text").with_validator(CallbackValidator::new(move |_, _, _| {
        oxide_form_tree::validation::ValidationResult::valid().with_error("required", message)
    }))
}

/// `order { kind, vat (visible when kind == "company") }`
pub fn company_form() -> FormNode {
    let mut form = FormNode::compound("order");
    form.add(FormNode::field("kind", "choice")).unwrap();
    form.add(FormNode::new(
        "vat",
        NodeConfig::leaf("text").with_dependency(Dependency::new("kind", "company")),
    ))
    .unwrap();
    form
}

pub fn tags(options: CollectionOptions) -> FormNode {
    FormNode::collection("tags", options)
}

pub fn child_keys(node: &FormNode) -> Vec<String> {
    node.all().keys().cloned().collect()
}
