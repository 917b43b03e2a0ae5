//! Locator abstraction for element selection.
//!
//! Locators describe *how to find* an element; a [`crate::Session`] resolves
//! them against a live page with auto-waiting. The same locator is usable
//! against the real CDP driver (compiled to a JavaScript query) and the mock
//! browser (matched in-process).
//!
//! # Design Philosophy
//!
//! - **Variant-stable**: test ids and accessible roles locate the same
//!   semantic element in both DOM shapes
//! - **Strict by default**: an ambiguous match is an error unless `nth` is set
//! - **Fluent API**: chainable refinements

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::catalog::{CONTROL_ID, CONTROL_TEST_ID};

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g., `label[for="favoriteFruit"]`)
    Css(String),
    /// Test ID selector (`data-testid` attribute)
    TestId(String),
    /// Accessible role, optionally filtered by exact accessible name
    Role {
        /// ARIA role (explicit or implicit)
        role: String,
        /// Exact accessible name
        name: Option<String>,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a role selector
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: None,
        }
    }

    /// Create a role selector filtered by accessible name
    #[must_use]
    pub fn role_named(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name.into()),
        }
    }

    /// JavaScript expression evaluating to an array of matching elements.
    ///
    /// Role queries rely on the `roleOf` and `nameOf` helpers that the CDP
    /// driver defines in scope before evaluating.
    #[must_use]
    pub fn to_elements_js(&self) -> String {
        match self {
            Self::Css(css) => format!("Array.from(document.querySelectorAll({}))", js_str(css)),
            Self::TestId(id) => {
                let css = format!("[data-testid=\"{id}\"]");
                format!("Array.from(document.querySelectorAll({}))", js_str(&css))
            }
            Self::Role { role, name } => {
                let name = name.as_deref().map_or_else(|| "null".to_string(), js_str);
                format!(
                    "Array.from(document.querySelectorAll('*')).filter(el => roleOf(el) === {} && ({name} === null || nameOf(el) === {name}))",
                    js_str(role)
                )
            }
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(css) => write!(f, "{css}"),
            Self::TestId(id) => write!(f, "getByTestId({id:?})"),
            Self::Role { role, name: None } => write!(f, "getByRole({role:?})"),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "getByRole({role:?}, name={name:?})"),
        }
    }
}

/// Encode a string as a JavaScript string literal
fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Locator options for customizing behavior
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Override of the session's expect timeout
    pub timeout: Option<Duration>,
    /// Whether to require strict single-element match
    pub strict: bool,
}

/// A locator for finding elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    selector: Selector,
    nth: Option<usize>,
    options: LocatorOptions,
}

impl Locator {
    /// Create a new locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create a locator from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            nth: None,
            options: LocatorOptions {
                timeout: None,
                strict: true,
            },
        }
    }

    /// Locate by `data-testid`
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::test_id(id))
    }

    /// Locate by accessible role and exact name
    #[must_use]
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_selector(Selector::role_named(role, name))
    }

    /// Pick the n-th match (0-based), disabling strictness
    #[must_use]
    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self.options.strict = false;
        self
    }

    /// Pick the first match
    #[must_use]
    pub fn first(self) -> Self {
        self.nth(0)
    }

    /// Set a custom timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Enable or disable strict mode
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the n-th index, if any
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.nth
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.nth {
            Some(n) => write!(f, "{}.nth({n})", self.selector),
            None => write!(f, "{}", self.selector),
        }
    }
}

/// The control, located by its shared id
#[must_use]
pub fn control() -> Locator {
    Locator::new(format!("#{CONTROL_ID}"))
}

/// The label bound to the control
#[must_use]
pub fn control_label() -> Locator {
    Locator::new(format!("label[for=\"{CONTROL_ID}\"]"))
}

/// The control, located by its variant-stable test id
#[must_use]
pub fn control_by_test_id() -> Locator {
    Locator::test_id(CONTROL_TEST_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_css_selector_js() {
            let js = Selector::css("select#favoriteFruit option").to_elements_js();
            assert!(js.contains("querySelectorAll"));
            assert!(js.contains("\"select#favoriteFruit option\""));
        }

        #[test]
        fn test_test_id_selector_js_escapes_quotes() {
            let js = Selector::test_id("selectFruit").to_elements_js();
            assert!(js.contains(r#"[data-testid=\"selectFruit\"]"#));
        }

        #[test]
        fn test_role_selector_js() {
            let js = Selector::role_named("option", "Apple").to_elements_js();
            assert!(js.contains("roleOf(el) === \"option\""));
            assert!(js.contains("nameOf(el) === \"Apple\""));

            let js = Selector::role("button").to_elements_js();
            assert!(js.contains("null === null"));
        }

        #[test]
        fn test_selector_display() {
            assert_eq!(
                Selector::role_named("button", "Select a fruit").to_string(),
                "getByRole(\"button\", name=\"Select a fruit\")"
            );
            assert_eq!(
                Selector::test_id("select-apple").to_string(),
                "getByTestId(\"select-apple\")"
            );
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_locator_defaults_strict() {
            let locator = Locator::new("label");
            assert!(locator.options().strict);
            assert!(locator.index().is_none());
            assert!(locator.options().timeout.is_none());
        }

        #[test]
        fn test_nth_disables_strict() {
            let locator = Locator::new("option").nth(3);
            assert!(!locator.options().strict);
            assert_eq!(locator.index(), Some(3));
            assert_eq!(locator.to_string(), "option.nth(3)");
        }

        #[test]
        fn test_with_timeout() {
            let locator = control().with_timeout(Duration::from_millis(250));
            assert_eq!(locator.options().timeout, Some(Duration::from_millis(250)));
        }

        #[test]
        fn test_contract_locators() {
            assert_eq!(control().selector(), &Selector::css("#favoriteFruit"));
            assert_eq!(
                control_label().selector(),
                &Selector::css("label[for=\"favoriteFruit\"]")
            );
            assert_eq!(
                control_by_test_id().selector(),
                &Selector::test_id("selectFruit")
            );
        }
    }
}
