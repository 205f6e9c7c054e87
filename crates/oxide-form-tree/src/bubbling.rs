//! Error bubbling policy.

use std::collections::HashSet;

/// Decides whether a node's deep error list walks into its children.
///
/// Bubbling is evaluated at read time only: nothing is copied between the
/// stored error lists of parent and child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBubblingStrategy {
    enabled: bool,
    excluded: HashSet<String>,
}

impl Default for ErrorBubblingStrategy {
    fn default() -> Self {
        Self::enabled()
    }
}

impl ErrorBubblingStrategy {
    /// Collects errors from every child.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            excluded: HashSet::new(),
        }
    }

    /// Keeps the deep error list limited to the node's own errors.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            excluded: HashSet::new(),
        }
    }

    /// Never collects errors from the named child.
    #[must_use]
    pub fn exclude(mut self, child: impl Into<String>) -> Self {
        self.excluded.insert(child.into());
        self
    }

    /// Returns whether bubbling is on at all.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns whether errors of `child` are merged into the parent's view.
    pub fn collects(&self, child: &str) -> bool {
        self.enabled && !self.excluded.contains(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_collects_all_children() {
        let strategy = ErrorBubblingStrategy::enabled();
        assert!(strategy.collects("email"));
        assert!(strategy.collects("address"));
    }

    #[test]
    fn test_disabled_collects_nothing() {
        let strategy = ErrorBubblingStrategy::disabled().exclude("email");
        assert!(!strategy.is_enabled());
        assert!(!strategy.collects("address"));
    }

    #[test]
    fn test_excluded_child() {
        let strategy = ErrorBubblingStrategy::default().exclude("captcha");
        assert!(!strategy.collects("captcha"));
        assert!(strategy.collects("email"));
    }
}
