//! Interaction adapters.
//!
//! A [`SelectorAdapter`] hides how a variant is driven: the native adapter
//! uses the form API of the `<select>`, the composite adapter opens the popup
//! through its trigger and activates `option` entries by accessible role and
//! name. Scenario bodies only ever talk to the trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::{by_label, by_value, first_content_option, OptionRecord, CONTROL_ID};
use crate::driver::Key;
use crate::expect::{expect, expect_selected};
use crate::fixture::Variant;
use crate::locator::{control, Locator, Selector};
use crate::result::{ParityError, ParityResult};
use crate::session::Session;
use crate::wait::{poll_until, PollOutcome, Probe};

/// Drives one selector variant
#[async_trait]
pub trait SelectorAdapter: Send + Sync {
    /// Variant this adapter drives
    fn variant(&self) -> Variant;

    /// Select the option carrying `value`; `""` clears the selection.
    ///
    /// Ends with the popup (if any) closed.
    async fn select_by_value(&self, session: &Session, value: &str) -> ParityResult<()>;

    /// Select the option whose label matches exactly
    async fn select_by_label(&self, session: &Session, label: &str) -> ParityResult<()> {
        let record = by_label(label).ok_or_else(|| ParityError::LabelNotFound {
            label: label.to_string(),
        })?;
        self.select_by_value(session, &record.value).await
    }

    /// Current value, read without waiting
    async fn read_value(&self, session: &Session) -> ParityResult<String>;

    /// Rendered options, in order
    async fn read_options(&self, session: &Session) -> ParityResult<Vec<OptionRecord>>;

    /// Click the control found by `trigger_id`, then pick the option found
    /// by `option_id`
    async fn select_by_test_id(
        &self,
        session: &Session,
        trigger_id: &str,
        option_id: &str,
    ) -> ParityResult<()>;

    /// Whether a popup is showing
    async fn is_open(&self, session: &Session) -> ParityResult<bool>;

    /// Give the control focus by clicking it
    async fn focus(&self, session: &Session) -> ParityResult<()> {
        session.click(&control()).await
    }

    /// Click the control, press ArrowDown then Enter, and require the first
    /// content option to be selected
    async fn keyboard_select_first(&self, session: &Session) -> ParityResult<()> {
        self.focus(session).await?;
        expect(session, control()).to_be_focused().await?;
        session.press(Key::ArrowDown).await?;
        session.press(Key::Enter).await?;
        expect_selected(session, self.as_dyn(), &first_content_option().value).await
    }

    /// Upcast for helpers that take `&dyn SelectorAdapter`
    fn as_dyn(&self) -> &dyn SelectorAdapter;
}

/// Adapter for the platform `<select>`
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSelectAdapter;

#[async_trait]
impl SelectorAdapter for NativeSelectAdapter {
    fn variant(&self) -> Variant {
        Variant::Native
    }

    async fn select_by_value(&self, session: &Session, value: &str) -> ParityResult<()> {
        session.select_option(&control(), value).await
    }

    async fn read_value(&self, session: &Session) -> ParityResult<String> {
        let select = session
            .query(&control())
            .await?
            .ok_or_else(|| ParityError::driver(format!("#{CONTROL_ID} not rendered")))?;
        Ok(select.value.unwrap_or_default())
    }

    async fn read_options(&self, session: &Session) -> ParityResult<Vec<OptionRecord>> {
        session.wait_for(&control()).await?;
        let options = session
            .query_all(&Locator::new(format!("#{CONTROL_ID} option")))
            .await?;
        Ok(options
            .into_iter()
            .map(|o| {
                let value = o
                    .value
                    .clone()
                    .or_else(|| o.attr("value").map(str::to_string))
                    .unwrap_or_else(|| o.text.clone());
                OptionRecord::new(value, o.text)
            })
            .collect())
    }

    async fn select_by_test_id(
        &self,
        session: &Session,
        trigger_id: &str,
        option_id: &str,
    ) -> ParityResult<()> {
        let trigger = Locator::test_id(trigger_id);
        session.click(&trigger).await?;

        // Native options have no box of their own; resolve the value instead
        // of clicking inside the platform popup.
        let option = session
            .query(&Locator::test_id(option_id))
            .await?
            .ok_or_else(|| ParityError::OptionNotFound {
                value: option_id.to_string(),
            })?;
        let value = option
            .value
            .clone()
            .or_else(|| option.attr("value").map(str::to_string))
            .unwrap_or_else(|| option.text.clone());
        session.select_option(&trigger, &value).await
    }

    async fn is_open(&self, _session: &Session) -> ParityResult<bool> {
        Ok(false)
    }

    fn as_dyn(&self) -> &dyn SelectorAdapter {
        self
    }
}

/// Adapter for the ARIA combobox widget
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeSelectAdapter;

impl CompositeSelectAdapter {
    fn hidden_select() -> Locator {
        Locator::new(format!("select[name=\"{CONTROL_ID}\"]"))
    }

    fn listbox() -> Locator {
        Locator::from_selector(Selector::role("listbox"))
    }

    fn option_named(label: &str) -> Locator {
        Locator::role("option", label)
    }

    async fn open(&self, session: &Session) -> ParityResult<()> {
        if !self.is_open(session).await? {
            session.click(&control()).await?;
        }
        session.wait_for(&Self::listbox()).await.map(|_| ())
    }

    async fn wait_closed(&self, session: &Session) -> ParityResult<()> {
        let retry = session.options().retry;
        let outcome = poll_until(&retry, session.guard(), "popup to close", move || async move {
            Ok(if self.is_open(session).await? {
                Probe::Pending("open".to_string())
            } else {
                Probe::Ready(())
            })
        })
        .await?;
        match outcome {
            PollOutcome::Matched(()) => Ok(()),
            PollOutcome::TimedOut { last_observed } => Err(ParityError::mismatch(
                "popup state after selection",
                "closed",
                last_observed,
            )),
        }
    }
}

#[async_trait]
impl SelectorAdapter for CompositeSelectAdapter {
    fn variant(&self) -> Variant {
        Variant::Composite
    }

    async fn select_by_value(&self, session: &Session, value: &str) -> ParityResult<()> {
        let record = by_value(value).ok_or_else(|| ParityError::OptionNotFound {
            value: value.to_string(),
        })?;
        self.open(session).await?;
        session.click(&Self::option_named(&record.label)).await?;
        self.wait_closed(session).await
    }

    async fn read_value(&self, session: &Session) -> ParityResult<String> {
        if let Some(hidden) = session.query(&Self::hidden_select()).await? {
            return Ok(hidden.value.unwrap_or_default());
        }
        let trigger = session
            .query(&control())
            .await?
            .ok_or_else(|| ParityError::driver(format!("#{CONTROL_ID} not rendered")))?;
        if trigger.text.is_empty() {
            return Ok(String::new());
        }
        by_label(&trigger.text)
            .map(|record| record.value)
            .ok_or(ParityError::LabelNotFound {
                label: trigger.text,
            })
    }

    async fn read_options(&self, session: &Session) -> ParityResult<Vec<OptionRecord>> {
        self.open(session).await?;
        let entries = session
            .query_all(&Locator::from_selector(Selector::role("option")))
            .await?;
        session.press(Key::Escape).await?;
        self.wait_closed(session).await?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let value = entry.attr("data-value").map(str::to_string);
                let label = if entry.name.is_empty() {
                    entry.text.clone()
                } else {
                    entry.name.clone()
                };
                OptionRecord::new(value.unwrap_or_else(|| entry.text.clone()), label)
            })
            .collect())
    }

    async fn select_by_test_id(
        &self,
        session: &Session,
        trigger_id: &str,
        option_id: &str,
    ) -> ParityResult<()> {
        session.click(&Locator::test_id(trigger_id)).await?;
        session.click(&Locator::test_id(option_id)).await?;
        self.wait_closed(session).await
    }

    async fn is_open(&self, session: &Session) -> ParityResult<bool> {
        Ok(session
            .query(&control())
            .await?
            .is_some_and(|trigger| trigger.attr("aria-expanded") == Some("true")))
    }

    fn as_dyn(&self) -> &dyn SelectorAdapter {
        self
    }
}

/// Adapter for a variant
#[must_use]
pub fn adapter_for(variant: Variant) -> Arc<dyn SelectorAdapter> {
    match variant {
        Variant::Native => Arc::new(NativeSelectAdapter),
        Variant::Composite => Arc::new(CompositeSelectAdapter),
    }
}
