//! The fruit option catalog and the rendered-markup contract constants.
//!
//! Both selector variants must render exactly this option set, in this order.

use serde::{Deserialize, Serialize};

/// Id shared by the control and the label's `for` attribute
pub const CONTROL_ID: &str = "favoriteFruit";

/// Test id of the control (trigger for the composite variant)
pub const CONTROL_TEST_ID: &str = "selectFruit";

/// Test id of the Apple option
pub const APPLE_TEST_ID: &str = "select-apple";

/// Exact label text
pub const LABEL_TEXT: &str = "Select your favorite fruit";

/// Value of the control's `aria-describedby`
pub const DESCRIPTION_ID: &str = "fruit-description";

/// Accessible name of the composite trigger
pub const TRIGGER_NAME: &str = "Select a fruit";

/// One selectable value/label pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionRecord {
    /// Option value
    pub value: String,
    /// Visible label
    pub label: String,
}

impl OptionRecord {
    /// Create a new record
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Whether this is the empty placeholder
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.value.is_empty()
    }

    /// Test id the fixtures put on this option (`select-<value>`)
    #[must_use]
    pub fn test_id(&self) -> Option<String> {
        if self.is_placeholder() {
            None
        } else {
            Some(format!("select-{}", self.value))
        }
    }
}

/// Static `(value, label)` pairs in rendered order
pub const FRUIT_OPTIONS: [(&str, &str); 6] = [
    ("", "--Please choose an option--"),
    ("apple", "Apple"),
    ("banana", "Banana"),
    ("blueberry", "Blueberry"),
    ("grapes", "Grapes"),
    ("pineapple", "Pineapple"),
];

/// All option records, placeholder first
#[must_use]
pub fn fruit_options() -> Vec<OptionRecord> {
    FRUIT_OPTIONS
        .iter()
        .map(|(value, label)| OptionRecord::new(*value, *label))
        .collect()
}

/// The placeholder record
#[must_use]
pub fn placeholder() -> OptionRecord {
    let (value, label) = FRUIT_OPTIONS[0];
    OptionRecord::new(value, label)
}

/// Content options (everything but the placeholder)
#[must_use]
pub fn content_options() -> Vec<OptionRecord> {
    fruit_options()
        .into_iter()
        .filter(|o| !o.is_placeholder())
        .collect()
}

/// First non-placeholder option
#[must_use]
pub fn first_content_option() -> OptionRecord {
    let (value, label) = FRUIT_OPTIONS[1];
    OptionRecord::new(value, label)
}

/// Find a record by exact label
#[must_use]
pub fn by_label(label: &str) -> Option<OptionRecord> {
    FRUIT_OPTIONS
        .iter()
        .find(|(_, l)| *l == label)
        .map(|(v, l)| OptionRecord::new(*v, *l))
}

/// Find a record by value
#[must_use]
pub fn by_value(value: &str) -> Option<OptionRecord> {
    FRUIT_OPTIONS
        .iter()
        .find(|(v, _)| *v == value)
        .map(|(v, l)| OptionRecord::new(*v, *l))
}

/// One way an observed option set deviates from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionMismatch {
    /// Wrong number of options
    Count {
        /// Expected count
        expected: usize,
        /// Observed count
        actual: usize,
    },
    /// Value differs at a position
    Value {
        /// Position in rendered order
        index: usize,
        /// Expected value
        expected: String,
        /// Observed value
        actual: String,
    },
    /// Label differs at a position
    Label {
        /// Position in rendered order
        index: usize,
        /// Expected label
        expected: String,
        /// Observed label
        actual: String,
    },
}

impl std::fmt::Display for OptionMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count { expected, actual } => {
                write!(f, "option count: expected {expected}, got {actual}")
            }
            Self::Value {
                index,
                expected,
                actual,
            } => write!(f, "option[{index}] value: expected {expected:?}, got {actual:?}"),
            Self::Label {
                index,
                expected,
                actual,
            } => write!(f, "option[{index}] label: expected {expected:?}, got {actual:?}"),
        }
    }
}

/// Compare an observed option set against the catalog.
///
/// Values and labels are checked independently at every position, so a
/// swapped pair yields two mismatches rather than one.
#[must_use]
pub fn check_option_contract(observed: &[OptionRecord]) -> Vec<OptionMismatch> {
    let expected = fruit_options();
    let mut mismatches = Vec::new();

    if observed.len() != expected.len() {
        mismatches.push(OptionMismatch::Count {
            expected: expected.len(),
            actual: observed.len(),
        });
    }

    for (index, (want, got)) in expected.iter().zip(observed).enumerate() {
        if want.value != got.value {
            mismatches.push(OptionMismatch::Value {
                index,
                expected: want.value.clone(),
                actual: got.value.clone(),
            });
        }
        if want.label != got.label {
            mismatches.push(OptionMismatch::Label {
                index,
                expected: want.label.clone(),
                actual: got.label.clone(),
            });
        }
    }

    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        let options = fruit_options();
        assert_eq!(options.len(), 6);
        assert!(options[0].is_placeholder());
        assert_eq!(options.iter().filter(|o| o.is_placeholder()).count(), 1);

        let mut values: Vec<_> = options.iter().map(|o| o.value.clone()).collect();
        values.sort();
        values.dedup();
        assert_eq!(values.len(), 6);
    }

    #[test]
    fn test_lookups() {
        assert_eq!(by_label("Grapes").map(|o| o.value), Some("grapes".into()));
        assert_eq!(by_value("banana").map(|o| o.label), Some("Banana".into()));
        assert!(by_label("grapes").is_none());
        assert!(by_value("mango").is_none());
        assert_eq!(first_content_option().value, "apple");
        assert_eq!(content_options().len(), 5);
    }

    #[test]
    fn test_option_test_ids() {
        assert_eq!(placeholder().test_id(), None);
        assert_eq!(
            first_content_option().test_id().as_deref(),
            Some(APPLE_TEST_ID)
        );
    }

    #[test]
    fn test_contract_holds_for_catalog() {
        assert!(check_option_contract(&fruit_options()).is_empty());
    }

    #[test]
    fn test_contract_reports_swaps_and_count() {
        let mut observed = fruit_options();
        observed.swap(1, 2);
        observed.pop();

        let mismatches = check_option_contract(&observed);
        assert!(mismatches.contains(&OptionMismatch::Count {
            expected: 6,
            actual: 5
        }));
        assert_eq!(
            mismatches
                .iter()
                .filter(|m| matches!(m, OptionMismatch::Value { .. }))
                .count(),
            2
        );
        assert_eq!(
            mismatches
                .iter()
                .filter(|m| matches!(m, OptionMismatch::Label { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_label_checked_independently_of_value() {
        let mut observed = fruit_options();
        observed[3].label = "Blue berry".to_string();
        let mismatches = check_option_contract(&observed);
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].to_string().contains("option[3] label"));
    }
}
