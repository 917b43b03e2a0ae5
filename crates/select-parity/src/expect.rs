//! Auto-retrying expectations.
//!
//! An [`Expectation`] is a pure predicate over element snapshots. [`expect`]
//! binds one to a locator and polls it against the live page until it holds
//! or the session's deadline passes, then reports the last observation as a
//! `ScenarioFailure`.
//!
//! ```ignore
//! expect(&session, control()).to_have_attribute("aria-required", "true").await?;
//! expect_selected(&session, adapter.as_ref(), "apple").await?;
//! ```

use crate::adapter::SelectorAdapter;
use crate::catalog::{check_option_contract, OptionRecord};
use crate::driver::ElementSnapshot;
use crate::locator::Locator;
use crate::result::{ParityError, ParityResult};
use crate::session::Session;
use crate::wait::{poll_until, PollOutcome, Probe};

const MISSING: &str = "<no element>";

/// A predicate over the element a locator designates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Element is present and visible
    Visible,
    /// Trimmed text content equals
    Text(String),
    /// Attribute present with exactly this value
    Attribute {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// Form value equals
    Value(String),
    /// Element has focus
    Focused,
    /// Number of matches (ignores `nth` and strictness)
    Count(usize),
    /// Computed ARIA role equals
    Role(String),
    /// Accessible name equals
    AccessibleName(String),
}

/// Outcome of checking an expectation once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// Predicate holds
    Pass,
    /// Predicate does not hold
    Fail {
        /// What was observed instead
        observed: String,
    },
}

impl Check {
    fn from_observed(ok: bool, observed: impl Into<String>) -> Self {
        if ok {
            Self::Pass
        } else {
            Self::Fail {
                observed: observed.into(),
            }
        }
    }
}

impl Expectation {
    /// Short phrase for reports, e.g. `to have text`
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Visible => "to be visible".to_string(),
            Self::Text(_) => "to have text".to_string(),
            Self::Attribute { name, .. } => format!("to have attribute {name}"),
            Self::Value(_) => "to have value".to_string(),
            Self::Focused => "to be focused".to_string(),
            Self::Count(_) => "to have count".to_string(),
            Self::Role(_) => "to have role".to_string(),
            Self::AccessibleName(_) => "to have accessible name".to_string(),
        }
    }

    /// Expected side, as reported
    #[must_use]
    pub fn expected(&self) -> String {
        match self {
            Self::Visible => "visible".to_string(),
            Self::Focused => "focused".to_string(),
            Self::Text(v)
            | Self::Value(v)
            | Self::Role(v)
            | Self::AccessibleName(v)
            | Self::Attribute { value: v, .. } => v.clone(),
            Self::Count(n) => n.to_string(),
        }
    }

    /// Evaluate against the designated element and the total match count
    #[must_use]
    pub fn check(&self, target: Option<&ElementSnapshot>, count: usize) -> Check {
        if let Self::Count(n) = self {
            return Check::from_observed(count == *n, count.to_string());
        }
        let Some(el) = target else {
            return Check::Fail {
                observed: MISSING.to_string(),
            };
        };
        match self {
            Self::Visible => Check::from_observed(el.visible, "hidden"),
            Self::Text(text) => Check::from_observed(el.text == *text, el.text.clone()),
            Self::Attribute { name, value } => {
                let actual = el.attr(name);
                Check::from_observed(
                    actual == Some(value.as_str()),
                    actual.unwrap_or("<absent>"),
                )
            }
            Self::Value(value) => {
                let actual = el.value.as_deref();
                Check::from_observed(actual == Some(value.as_str()), actual.unwrap_or("<none>"))
            }
            Self::Focused => Check::from_observed(el.focused, "not focused"),
            Self::Role(role) => {
                let actual = el.role.as_deref();
                Check::from_observed(actual == Some(role.as_str()), actual.unwrap_or("<none>"))
            }
            Self::AccessibleName(name) => Check::from_observed(el.name == *name, el.name.clone()),
            Self::Count(_) => Check::Pass,
        }
    }
}

/// An expectation builder bound to a session and locator
#[derive(Debug)]
pub struct Expect<'a> {
    session: &'a Session,
    locator: Locator,
}

/// Start an expectation on `locator`
#[must_use]
pub fn expect(session: &Session, locator: Locator) -> Expect<'_> {
    Expect { session, locator }
}

impl Expect<'_> {
    /// Poll until `expectation` holds.
    ///
    /// # Errors
    ///
    /// `ScenarioFailure` carrying the last observation on timeout,
    /// `WaitAbandoned` on navigation, driver errors.
    pub async fn to_satisfy(&self, expectation: Expectation) -> ParityResult<()> {
        let retry = self.session.retry_for(&self.locator);
        let assertion = format!("expect({}) {}", self.locator, expectation.describe());
        let (session, locator, exp) = (self.session, &self.locator, &expectation);

        let outcome = poll_until(&retry, session.guard(), &assertion, move || async move {
            let (target, count) = if matches!(exp, Expectation::Count(_)) {
                (None, session.query_all(locator).await?.len())
            } else {
                let target = session.query(locator).await?;
                let count = usize::from(target.is_some());
                (target, count)
            };
            Ok(match exp.check(target.as_ref(), count) {
                Check::Pass => Probe::Ready(()),
                Check::Fail { observed } => Probe::Pending(observed),
            })
        })
        .await?;

        match outcome {
            PollOutcome::Matched(()) => Ok(()),
            PollOutcome::TimedOut { last_observed } => Err(ParityError::mismatch(
                assertion,
                expectation.expected(),
                last_observed,
            )),
        }
    }

    /// Present and visible
    ///
    /// # Errors
    ///
    /// See [`Expect::to_satisfy`].
    pub async fn to_be_visible(&self) -> ParityResult<()> {
        self.to_satisfy(Expectation::Visible).await
    }

    /// Exact trimmed text
    ///
    /// # Errors
    ///
    /// See [`Expect::to_satisfy`].
    pub async fn to_have_text(&self, text: &str) -> ParityResult<()> {
        self.to_satisfy(Expectation::Text(text.to_string())).await
    }

    /// Exact attribute value
    ///
    /// # Errors
    ///
    /// See [`Expect::to_satisfy`].
    pub async fn to_have_attribute(&self, name: &str, value: &str) -> ParityResult<()> {
        self.to_satisfy(Expectation::Attribute {
            name: name.to_string(),
            value: value.to_string(),
        })
        .await
    }

    /// Exact form value
    ///
    /// # Errors
    ///
    /// See [`Expect::to_satisfy`].
    pub async fn to_have_value(&self, value: &str) -> ParityResult<()> {
        self.to_satisfy(Expectation::Value(value.to_string())).await
    }

    /// Has focus
    ///
    /// # Errors
    ///
    /// See [`Expect::to_satisfy`].
    pub async fn to_be_focused(&self) -> ParityResult<()> {
        self.to_satisfy(Expectation::Focused).await
    }

    /// Exact match count
    ///
    /// # Errors
    ///
    /// See [`Expect::to_satisfy`].
    pub async fn to_have_count(&self, count: usize) -> ParityResult<()> {
        self.to_satisfy(Expectation::Count(count)).await
    }

    /// Computed role
    ///
    /// # Errors
    ///
    /// See [`Expect::to_satisfy`].
    pub async fn to_have_role(&self, role: &str) -> ParityResult<()> {
        self.to_satisfy(Expectation::Role(role.to_string())).await
    }

    /// Accessible name
    ///
    /// # Errors
    ///
    /// See [`Expect::to_satisfy`].
    pub async fn to_have_accessible_name(&self, name: &str) -> ParityResult<()> {
        self.to_satisfy(Expectation::AccessibleName(name.to_string()))
            .await
    }
}

/// Poll the adapter's current value until it equals `expected`.
///
/// Read errors count as observations, except for abandoned waits.
///
/// # Errors
///
/// `ScenarioFailure` with the last read value on timeout, `WaitAbandoned`.
pub async fn expect_selected(
    session: &Session,
    adapter: &dyn SelectorAdapter,
    expected: &str,
) -> ParityResult<()> {
    let assertion = format!("current value of {} selector", adapter.variant());
    let retry = session.options().retry;

    let outcome = poll_until(&retry, session.guard(), &assertion, move || async move {
        match adapter.read_value(session).await {
            Ok(value) if value == expected => Ok(Probe::Ready(())),
            Ok(value) => Ok(Probe::Pending(value)),
            Err(err @ ParityError::WaitAbandoned { .. }) => Err(err),
            Err(err) => Ok(Probe::Pending(format!("<{}>", err.kind()))),
        }
    })
    .await?;

    match outcome {
        PollOutcome::Matched(()) => Ok(()),
        PollOutcome::TimedOut { last_observed } => Err(ParityError::mismatch(
            assertion,
            expected,
            last_observed,
        )),
    }
}

/// Fail unless the observed options match the catalog exactly.
///
/// Every mismatch is listed, not just the first.
///
/// # Errors
///
/// `ScenarioFailure` describing all mismatches.
pub fn expect_option_contract(observed: &[OptionRecord]) -> ParityResult<()> {
    let mismatches = check_option_contract(observed);
    if mismatches.is_empty() {
        return Ok(());
    }
    let expected = crate::catalog::fruit_options()
        .iter()
        .map(|o| format!("{}={}", o.value, o.label))
        .collect::<Vec<_>>()
        .join(", ");
    let actual = mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Err(ParityError::mismatch("option set", expected, actual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fruit_options;

    fn snap() -> ElementSnapshot {
        let mut snap = ElementSnapshot::new("select");
        snap.text = "Apple".to_string();
        snap.value = Some("apple".to_string());
        snap.role = Some("combobox".to_string());
        snap.name = "Select your favorite fruit".to_string();
        snap.attributes
            .insert("aria-required".to_string(), "true".to_string());
        snap
    }

    mod check_tests {
        use super::*;

        #[test]
        fn test_passing_checks() {
            let el = snap();
            for exp in [
                Expectation::Visible,
                Expectation::Text("Apple".into()),
                Expectation::Value("apple".into()),
                Expectation::Role("combobox".into()),
                Expectation::AccessibleName("Select your favorite fruit".into()),
                Expectation::Attribute {
                    name: "aria-required".into(),
                    value: "true".into(),
                },
            ] {
                assert_eq!(exp.check(Some(&el), 1), Check::Pass, "{exp:?}");
            }
        }

        #[test]
        fn test_failing_checks_carry_observation() {
            let el = snap();
            assert_eq!(
                Expectation::Value("banana".into()).check(Some(&el), 1),
                Check::Fail {
                    observed: "apple".into()
                }
            );
            assert_eq!(
                Expectation::Attribute {
                    name: "aria-describedby".into(),
                    value: "fruit-description".into()
                }
                .check(Some(&el), 1),
                Check::Fail {
                    observed: "<absent>".into()
                }
            );
            assert_eq!(
                Expectation::Focused.check(Some(&el), 1),
                Check::Fail {
                    observed: "not focused".into()
                }
            );
        }

        #[test]
        fn test_missing_element() {
            assert_eq!(
                Expectation::Visible.check(None, 0),
                Check::Fail {
                    observed: MISSING.into()
                }
            );
        }

        #[test]
        fn test_count_ignores_target() {
            assert_eq!(Expectation::Count(6).check(None, 6), Check::Pass);
            assert_eq!(
                Expectation::Count(6).check(None, 5),
                Check::Fail {
                    observed: "5".into()
                }
            );
        }

        #[test]
        fn test_describe_and_expected() {
            let exp = Expectation::Attribute {
                name: "for".into(),
                value: "favoriteFruit".into(),
            };
            assert_eq!(exp.describe(), "to have attribute for");
            assert_eq!(exp.expected(), "favoriteFruit");
            assert_eq!(Expectation::Count(6).expected(), "6");
        }
    }

    mod contract_tests {
        use super::*;

        #[test]
        fn test_contract_passes_for_catalog() {
            assert!(expect_option_contract(&fruit_options()).is_ok());
        }

        #[test]
        fn test_contract_lists_every_mismatch() {
            let mut observed = fruit_options();
            observed.remove(0);
            let err = expect_option_contract(&observed).unwrap_err();
            let (_, actual) = err.expected_actual().unwrap();
            assert!(actual.contains("option count: expected 6, got 5"));
            assert!(actual.contains("option[0] value"));
            assert!(actual.contains("option[4] label"));
        }
    }
}
