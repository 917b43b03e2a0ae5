//! Scenario catalog.
//!
//! Every scenario is written once against [`ScenarioContext`] and run once
//! per fixture. Bodies never branch on the variant: anything
//! variant-specific goes through the adapter, and the two scenarios that only
//! make sense for one DOM shape declare it through [`Applicability`].

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::adapter::SelectorAdapter;
use crate::catalog::{
    content_options, fruit_options, placeholder, APPLE_TEST_ID, CONTROL_ID, CONTROL_TEST_ID,
    DESCRIPTION_ID, LABEL_TEXT, TRIGGER_NAME,
};
use crate::expect::{expect, expect_option_contract, expect_selected, Expect};
use crate::fixture::{FixtureDescriptor, Variant, HOME_ROUTE};
use crate::locator::{control, control_label, Locator};
use crate::result::{ParityError, ParityResult};
use crate::session::Session;

/// Everything a scenario body may touch, passed by value
#[derive(Clone)]
pub struct ScenarioContext {
    /// Fixture under test
    pub fixture: FixtureDescriptor,
    /// The page, already navigated and ready
    pub session: Arc<Session>,
    /// Adapter for the fixture's variant
    pub adapter: Arc<dyn SelectorAdapter>,
}

impl std::fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("fixture", &self.fixture)
            .field("session", &self.session)
            .field("variant", &self.adapter.variant())
            .finish()
    }
}

impl ScenarioContext {
    /// Expectation on a locator in this session
    #[must_use]
    pub fn expect(&self, locator: Locator) -> Expect<'_> {
        expect(&self.session, locator)
    }

    /// Require the current value to become `value`
    ///
    /// # Errors
    ///
    /// `ScenarioFailure` on timeout.
    pub async fn expect_selected(&self, value: &str) -> ParityResult<()> {
        expect_selected(&self.session, self.adapter.as_ref(), value).await
    }

    /// Select by value and require it to stick
    ///
    /// # Errors
    ///
    /// Adapter errors or `ScenarioFailure`.
    pub async fn select_and_check(&self, value: &str) -> ParityResult<()> {
        self.adapter.select_by_value(&self.session, value).await?;
        self.expect_selected(value).await
    }

    /// Label and control present and visible
    ///
    /// # Errors
    ///
    /// `ScenarioFailure` on timeout.
    pub async fn expect_ready(&self) -> ParityResult<()> {
        self.expect(control_label()).to_be_visible().await?;
        self.expect(control()).to_be_visible().await
    }

    /// ARIA metadata on the control and the label binding
    ///
    /// # Errors
    ///
    /// `ScenarioFailure` on the first attribute that does not hold.
    pub async fn expect_accessibility(&self) -> ParityResult<()> {
        self.expect(control())
            .to_have_attribute("aria-describedby", DESCRIPTION_ID)
            .await?;
        self.expect(control())
            .to_have_attribute("aria-required", "true")
            .await?;
        self.expect(control_label())
            .to_have_attribute("for", CONTROL_ID)
            .await?;
        self.expect(control_label()).to_have_text(LABEL_TEXT).await
    }
}

/// Signature of a scenario body
pub type ScenarioBody = fn(ScenarioContext) -> BoxFuture<'static, ParityResult<()>>;

/// Which variants a scenario runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Applicability {
    /// Both variants; a pass/fail split is a parity violation
    Both,
    /// One variant only; the other reports `Skipped`
    Only(Variant),
}

impl Applicability {
    /// Whether the scenario runs against `variant`
    #[must_use]
    pub fn applies_to(&self, variant: Variant) -> bool {
        match self {
            Self::Both => true,
            Self::Only(only) => *only == variant,
        }
    }
}

/// A named scenario
#[derive(Clone, Copy)]
pub struct Scenario {
    /// Kebab-case identifier, used for filtering
    pub name: &'static str,
    /// Human-readable title
    pub title: &'static str,
    /// Variants it applies to
    pub applicability: Applicability,
    /// Body
    pub body: ScenarioBody,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("applicability", &self.applicability)
            .finish_non_exhaustive()
    }
}

impl Scenario {
    fn new(name: &'static str, title: &'static str, body: ScenarioBody) -> Self {
        Self {
            name,
            title,
            applicability: Applicability::Both,
            body,
        }
    }

    fn only(mut self, variant: Variant) -> Self {
        self.applicability = Applicability::Only(variant);
        self
    }

    /// Whether `filter` selects this scenario (substring of name or title)
    #[must_use]
    pub fn matches(&self, filter: &str) -> bool {
        let filter = filter.to_ascii_lowercase();
        self.name.contains(&filter) || self.title.to_ascii_lowercase().contains(&filter)
    }
}

/// Every scenario, in report order
#[must_use]
pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "structure",
            "should display the select component with proper structure",
            structure,
        ),
        Scenario::new("role-is-button", "role is button", role_is_button).only(Variant::Composite),
        Scenario::new(
            "implicit-native-roles",
            "native control exposes combobox and option roles",
            implicit_native_roles,
        )
        .only(Variant::Native),
        Scenario::new(
            "all-expected-options",
            "should have all expected fruit options",
            all_expected_options,
        ),
        Scenario::new(
            "select-each-fruit",
            "should allow selecting different fruits",
            select_each_fruit,
        ),
        Scenario::new("select-by-test-id", "should work with testid", select_by_test_id),
        Scenario::new(
            "select-by-label",
            "should handle selection by label text",
            select_by_label,
        ),
        Scenario::new(
            "reset-after-navigation",
            "should reset selection state after navigation",
            reset_after_navigation,
        ),
        Scenario::new(
            "accessibility-attributes",
            "should have proper accessibility attributes",
            accessibility_attributes,
        ),
        Scenario::new(
            "empty-selection",
            "should handle empty selection correctly",
            empty_selection,
        ),
        Scenario::new(
            "options-order",
            "should display correct options order",
            options_order,
        ),
        Scenario::new(
            "keyboard-interaction",
            "should be responsive to keyboard interactions",
            keyboard_interaction,
        ),
        Scenario::new(
            "fruit-data-integration",
            "should integrate with fruit data correctly",
            fruit_data_integration,
        ),
        Scenario::new(
            "comprehensive-workflow",
            "comprehensive workflow test",
            comprehensive_workflow,
        ),
        Scenario::new(
            "idempotent-reselection",
            "reselecting the current value changes nothing",
            idempotent_reselection,
        ),
        Scenario::new(
            "accessibility-persists-across-selection",
            "accessibility attributes hold for every selection",
            accessibility_persists,
        ),
    ]
}

/// Scenarios whose name or title contains `filter`
#[must_use]
pub fn filtered(filter: Option<&str>) -> Vec<Scenario> {
    catalog()
        .into_iter()
        .filter(|s| filter.map_or(true, |f| s.matches(f)))
        .collect()
}

fn structure(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        ctx.expect(control_label()).to_be_visible().await?;
        ctx.expect(control_label()).to_have_text(LABEL_TEXT).await?;
        ctx.expect(control()).to_be_visible().await?;
        ctx.expect(control())
            .to_have_attribute("aria-describedby", DESCRIPTION_ID)
            .await?;
        ctx.expect(control())
            .to_have_attribute("aria-required", "true")
            .await?;

        let options = ctx.adapter.read_options(&ctx.session).await?;
        let expected = placeholder();
        let shown = options
            .iter()
            .find(|o| o.is_placeholder())
            .map_or_else(|| "<no placeholder>".to_string(), |o| o.label.clone());
        if shown != expected.label {
            return Err(ParityError::mismatch("placeholder option text", expected.label, shown));
        }
        Ok(())
    }
    .boxed()
}

fn role_is_button(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        ctx.session
            .click(&Locator::role("button", TRIGGER_NAME))
            .await?;
        let apple = Locator::role("option", "Apple");
        ctx.session.wait_for(&apple).await?;
        ctx.session.click(&apple).await?;
        ctx.expect_selected("apple").await
    }
    .boxed()
}

fn implicit_native_roles(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        ctx.expect(control()).to_have_role("combobox").await?;
        ctx.expect(control())
            .to_have_accessible_name(LABEL_TEXT)
            .await?;
        let options = Locator::new(format!("#{CONTROL_ID} option"));
        ctx.expect(options.clone())
            .to_have_count(fruit_options().len())
            .await?;
        for (index, record) in fruit_options().iter().enumerate() {
            let option = options.clone().nth(index);
            ctx.expect(option.clone()).to_have_role("option").await?;
            ctx.expect(option).to_have_accessible_name(&record.label).await?;
        }
        Ok(())
    }
    .boxed()
}

fn all_expected_options(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        let options = ctx.adapter.read_options(&ctx.session).await?;
        expect_option_contract(&options)
    }
    .boxed()
}

fn select_each_fruit(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        for option in content_options() {
            ctx.select_and_check(&option.value).await?;
        }
        Ok(())
    }
    .boxed()
}

fn select_by_test_id(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        ctx.adapter
            .select_by_test_id(&ctx.session, CONTROL_TEST_ID, APPLE_TEST_ID)
            .await?;
        ctx.expect_selected("apple").await
    }
    .boxed()
}

fn select_by_label(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        for option in content_options() {
            ctx.adapter.select_by_label(&ctx.session, &option.label).await?;
            ctx.expect_selected(&option.value).await?;
        }
        Ok(())
    }
    .boxed()
}

fn reset_after_navigation(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        for option in content_options() {
            ctx.select_and_check(&option.value).await?;
            ctx.session.goto(HOME_ROUTE).await?;
            ctx.session.goto(&ctx.fixture.route).await?;
            ctx.expect_ready().await?;
            ctx.expect_selected("").await?;
        }
        Ok(())
    }
    .boxed()
}

fn accessibility_attributes(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move { ctx.expect_accessibility().await }.boxed()
}

fn empty_selection(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        ctx.expect_selected("").await?;
        ctx.select_and_check("apple").await?;
        ctx.select_and_check("").await
    }
    .boxed()
}

fn options_order(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        let observed = ctx.adapter.read_options(&ctx.session).await?;
        for (index, expected) in fruit_options().iter().enumerate() {
            let actual = observed
                .get(index)
                .map_or_else(|| "<missing>".to_string(), |o| o.label.clone());
            if actual != expected.label {
                return Err(ParityError::mismatch(
                    format!("option[{index}] text"),
                    expected.label.clone(),
                    actual,
                ));
            }
        }
        Ok(())
    }
    .boxed()
}

fn keyboard_interaction(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move { ctx.adapter.keyboard_select_first(&ctx.session).await }.boxed()
}

fn fruit_data_integration(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        ctx.expect(control_label()).to_have_text(LABEL_TEXT).await?;
        ctx.expect(control()).to_be_visible().await?;
        let options = ctx.adapter.read_options(&ctx.session).await?;
        let expected = fruit_options().len();
        if options.len() != expected {
            return Err(ParityError::mismatch(
                "option count",
                expected.to_string(),
                options.len().to_string(),
            ));
        }
        Ok(())
    }
    .boxed()
}

fn comprehensive_workflow(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        ctx.expect(control_label()).to_be_visible().await?;
        ctx.expect(control_label()).to_have_text(LABEL_TEXT).await?;
        ctx.expect(control()).to_be_visible().await?;
        ctx.expect_selected("").await?;

        let options = ctx.adapter.read_options(&ctx.session).await?;
        if options.len() != fruit_options().len() {
            return Err(ParityError::mismatch(
                "option count",
                fruit_options().len().to_string(),
                options.len().to_string(),
            ));
        }

        for value in ["apple", "banana", "pineapple", ""] {
            ctx.select_and_check(value).await?;
        }
        Ok(())
    }
    .boxed()
}

fn idempotent_reselection(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        ctx.select_and_check("banana").await?;
        ctx.select_and_check("banana").await?;
        let open = ctx.adapter.is_open(&ctx.session).await?;
        if open {
            return Err(ParityError::mismatch("popup after reselection", "closed", "open"));
        }
        ctx.select_and_check("").await?;
        ctx.select_and_check("").await
    }
    .boxed()
}

fn accessibility_persists(ctx: ScenarioContext) -> BoxFuture<'static, ParityResult<()>> {
    async move {
        ctx.expect_accessibility().await?;
        for option in fruit_options() {
            ctx.select_and_check(&option.value).await?;
            ctx.expect_accessibility().await?;
        }
        Ok(())
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::adapter_for;
    use crate::driver::SessionFactory;
    use crate::mock::MockBrowser;
    use crate::session::SessionOptions;
    use crate::wait::RetryConfig;

    async fn context(browser: &MockBrowser, fixture: FixtureDescriptor) -> ScenarioContext {
        let page = browser.open().await.unwrap();
        let session = Session::new(
            page,
            SessionOptions::new("http://127.0.0.1:5173").with_retry(RetryConfig::fast()),
        );
        session.goto(&fixture.route).await.unwrap();
        ScenarioContext {
            adapter: adapter_for(fixture.variant),
            fixture,
            session: Arc::new(session),
        }
    }

    #[test]
    fn test_catalog_names_unique_and_kebab() {
        let scenarios = catalog();
        assert_eq!(scenarios.len(), 16);
        let mut names: Vec<_> = scenarios.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 16);
        assert!(names
            .iter()
            .all(|n| n.chars().all(|c| c.is_ascii_lowercase() || c == '-')));
    }

    #[test]
    fn test_variant_specific_scenarios() {
        let scenarios = catalog();
        let role = scenarios.iter().find(|s| s.name == "role-is-button").unwrap();
        assert!(role.applicability.applies_to(Variant::Composite));
        assert!(!role.applicability.applies_to(Variant::Native));

        let native = scenarios
            .iter()
            .find(|s| s.name == "implicit-native-roles")
            .unwrap();
        assert_eq!(native.applicability, Applicability::Only(Variant::Native));

        let shared = scenarios
            .iter()
            .filter(|s| s.applicability == Applicability::Both)
            .count();
        assert_eq!(shared, 14);
    }

    #[test]
    fn test_filter_by_name_or_title() {
        assert_eq!(filtered(Some("keyboard")).len(), 1);
        assert_eq!(filtered(Some("TESTID")).len(), 1);
        assert!(filtered(Some("accessibility")).len() >= 2);
        assert_eq!(filtered(None).len(), 16);
        assert!(filtered(Some("no-such-scenario")).is_empty());
    }

    #[tokio::test]
    async fn test_every_applicable_scenario_passes_on_clean_mock() {
        let browser = MockBrowser::new();
        for fixture in crate::fixture::default_fixtures() {
            for scenario in catalog() {
                if !scenario.applicability.applies_to(fixture.variant) {
                    continue;
                }
                let ctx = context(&browser, fixture.clone()).await;
                let result = (scenario.body)(ctx).await;
                assert!(
                    result.is_ok(),
                    "{} on {}: {:?}",
                    scenario.name,
                    fixture.route,
                    result
                );
            }
        }
    }
}
