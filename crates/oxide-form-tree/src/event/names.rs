//! Event names.
//!
//! Names are plain strings so that listeners can subscribe to custom events
//! alongside the built-in ones.

/// Events dispatched by every node during its lifecycle.
pub mod form_events {
    /// Before data is bound. Listeners may replace the data.
    pub const PRE_SET_DATA: &str = "form.pre_set_data";
    /// After data is bound to the node and its children.
    pub const POST_SET_DATA: &str = "form.post_set_data";
    /// Before submitted data is stored. Listeners may rewrite it.
    pub const PRE_SUBMIT: &str = "form.pre_submit";
    /// After children received their slice of the submission.
    pub const SUBMIT: &str = "form.submit";
    /// After validation, carrying the resolved data.
    pub const POST_SUBMIT: &str = "form.post_submit";
    /// Before a builder attaches children.
    pub const PRE_BUILD: &str = "form.pre_build";
    /// After a builder finished the node.
    pub const POST_BUILD: &str = "form.post_build";
    /// Validation produced blocking errors.
    pub const VALIDATION_ERROR: &str = "form.validation_error";
    /// Validation passed.
    pub const VALIDATION_SUCCESS: &str = "form.validation_success";
}

/// Events concerning a single field's value, visibility and rendering.
pub mod field_events {
    /// After a leaf's submitted value differs from its previous one.
    /// Context `previous` holds the old value.
    pub const VALUE_CHANGE: &str = "field.value_change";
    /// A dependency made the node visible.
    pub const SHOW: &str = "field.show";
    /// A dependency hid the node.
    pub const HIDE: &str = "field.hide";
    /// A dependency enabled the node.
    pub const ENABLE: &str = "field.enable";
    /// A dependency disabled the node.
    pub const DISABLE: &str = "field.disable";
    /// Before a node's own validator runs, carrying the validated value.
    pub const VALIDATE: &str = "field.validate";
    /// While projecting a view. Listeners may rewrite the vars, which must
    /// stay a map.
    pub const PRE_RENDER: &str = "field.pre_render";
    /// After a node's view vars are final.
    pub const POST_RENDER: &str = "field.post_render";
    /// Dispatched on the dependency dispatcher; listeners decide visibility.
    pub const DEPENDENCY_CHECK: &str = "field.dependency_check";
    /// After a dependency check passed, carrying the controller value.
    pub const DEPENDENCY_MET: &str = "field.dependency_met";
    /// After a dependency check failed, carrying the controller value.
    pub const DEPENDENCY_NOT_MET: &str = "field.dependency_not_met";
    /// After a leaf binds data.
    pub const VALUE_SET: &str = "field.value_set";
    /// While projecting a node with `choices`. Listeners may replace them.
    pub const OPTIONS_LOAD: &str = "field.options_load";
}
