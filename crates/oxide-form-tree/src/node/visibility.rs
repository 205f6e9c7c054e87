//! Dependency-driven visibility.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::FormNode;
use crate::config::{Dependency, DependencyEffect};
use crate::dependency::{lookup, matches_expected};
use crate::error::Result;
use crate::event::{field_events, DependencyEvent, FormEvent};

/// Resolves a controller sibling-relative first, then from the root.
fn controller_value(form: &Value, scope: &[String], controller: &str) -> Value {
    let sibling = if scope.is_empty() {
        None
    } else {
        lookup(form, &format!("{}.{controller}", scope.join(".")))
    };
    sibling
        .or_else(|| lookup(form, controller))
        .cloned()
        .unwrap_or(Value::Null)
}

impl FormNode {
    /// Re-evaluates every dependency of the subtree against its current
    /// data, firing `SHOW`/`HIDE` or `ENABLE`/`DISABLE` on state changes.
    ///
    /// Runs automatically at the end of a submission and before projection.
    pub fn refresh_dependencies(&mut self) -> Result<()> {
        let form = Arc::new(self.get_data());
        if let Some(dependency) = self.config.dependency().cloned() {
            self.evaluate_dependency(&dependency, &form, &[])?;
        }
        let mut scope = Vec::new();
        for child in self.children.values_mut() {
            child.apply_dependencies(&form, &mut scope)?;
        }
        Ok(())
    }

    /// `scope` is the parent's path relative to the evaluated subtree.
    fn apply_dependencies(&mut self, form: &Arc<Value>, scope: &mut Vec<String>) -> Result<()> {
        if let Some(dependency) = self.config.dependency().cloned() {
            self.evaluate_dependency(&dependency, form, scope)?;
        }
        if self.children.is_empty() {
            return Ok(());
        }
        scope.push(self.name.clone());
        for child in self.children.values_mut() {
            child.apply_dependencies(form, scope)?;
        }
        scope.pop();
        Ok(())
    }

    fn evaluate_dependency(
        &mut self,
        dependency: &Dependency,
        form: &Arc<Value>,
        scope: &[String],
    ) -> Result<()> {
        let value = controller_value(form, scope, &dependency.controller);
        let met = matches_expected(&value, &dependency.expected);
        let check = DependencyEvent::new(
            self.node_id(),
            dependency.controller.clone(),
            value,
            dependency.expected.clone(),
            Arc::clone(form),
            met,
        );
        let check = self
            .dependency_events
            .dispatch(field_events::DEPENDENCY_CHECK, check)?;
        let met = check.is_visible();
        debug!(field = %self.node_id(), controller = %dependency.controller, met, "dependency evaluated");

        let outcome = if met {
            field_events::DEPENDENCY_MET
        } else {
            field_events::DEPENDENCY_NOT_MET
        };
        let event = FormEvent::new(outcome, self.node_id(), check.controller_value().clone())
            .with_context("controller", dependency.controller.clone())
            .with_context("expected", dependency.expected.clone());
        self.events.dispatch(outcome, event)?;

        match dependency.effect {
            DependencyEffect::Visibility if self.visible != met => {
                self.visible = met;
                let name = if met {
                    field_events::SHOW
                } else {
                    field_events::HIDE
                };
                self.fire(name, Value::Bool(met))?;
            }
            DependencyEffect::Enable if self.enabled != met => {
                self.enabled = met;
                let name = if met {
                    field_events::ENABLE
                } else {
                    field_events::DISABLE
                };
                self.fire(name, Value::Bool(met))?;
            }
            _ => {}
        }
        Ok(())
    }
}
