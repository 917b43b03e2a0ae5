//! Page driver seam.
//!
//! A [`PageDriver`] is one isolated browser page. Everything above this trait
//! (sessions, adapters, scenarios) talks to the page only through element
//! snapshots and a handful of input primitives, so the same scenarios run
//! against Chromium over CDP and against the in-memory [`crate::mock`] DOM.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SessionFactory::open() ──► Box<dyn PageDriver>              │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │  CdpSessionFactory           │  MockBrowser                  │
//! │  (feature = "browser")       │  (always available)           │
//! │  chromiumoxide, one tab per  │  fixture DOM rendered in      │
//! │  session                     │  process, fault injection     │
//! └──────────────────────────────┴───────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::locator::Selector;
use crate::result::ParityResult;

/// Driver-independent view of one DOM element at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Lower-case tag name
    pub tag: String,
    /// Element id, if any
    pub id: Option<String>,
    /// Trimmed text content
    pub text: String,
    /// All attributes as rendered
    pub attributes: BTreeMap<String, String>,
    /// Form value (`select`, `option`, `input`)
    pub value: Option<String>,
    /// Explicit or implicit ARIA role
    pub role: Option<String>,
    /// Accessible name
    pub name: String,
    /// Rendered with a non-empty box and not hidden
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Currently the active element
    pub focused: bool,
}

impl ElementSnapshot {
    /// Create a snapshot with a tag name
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            visible: true,
            enabled: true,
            ..Self::default()
        }
    }

    /// Attribute value by name
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Present, visible and enabled
    #[must_use]
    pub const fn is_actionable(&self) -> bool {
        self.visible && self.enabled
    }

    /// First reason this element is not actionable
    #[must_use]
    pub const fn blocker(&self) -> Option<&'static str> {
        if !self.visible {
            Some("not visible")
        } else if !self.enabled {
            Some("disabled")
        } else {
            None
        }
    }
}

/// Keys the harness sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Move to the next option
    ArrowDown,
    /// Move to the previous option
    ArrowUp,
    /// Confirm
    Enter,
    /// Dismiss
    Escape,
    /// Toggle / confirm
    Space,
}

impl Key {
    /// DOM `KeyboardEvent.key`
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::ArrowDown => "ArrowDown",
            Self::ArrowUp => "ArrowUp",
            Self::Enter => "Enter",
            Self::Escape => "Escape",
            Self::Space => " ",
        }
    }

    /// DOM `KeyboardEvent.code`
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ArrowDown => "ArrowDown",
            Self::ArrowUp => "ArrowUp",
            Self::Enter => "Enter",
            Self::Escape => "Escape",
            Self::Space => "Space",
        }
    }

    /// Windows virtual key code
    #[must_use]
    pub const fn virtual_key_code(&self) -> i64 {
        match self {
            Self::ArrowDown => 40,
            Self::ArrowUp => 38,
            Self::Enter => 13,
            Self::Escape => 27,
            Self::Space => 32,
        }
    }

    /// Text produced by the key, if any
    #[must_use]
    pub const fn text(&self) -> Option<&'static str> {
        match self {
            Self::Enter => Some("\r"),
            Self::Space => Some(" "),
            _ => None,
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One isolated browser page
///
/// Element-targeting calls take a selector plus the index of the match, as
/// returned by [`PageDriver::query_all`]; the session resolves locators and
/// performs actionability checks before calling them.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the document to load
    async fn navigate(&self, url: &str) -> ParityResult<()>;

    /// Current document URL
    async fn current_url(&self) -> ParityResult<String>;

    /// Snapshot every element matching `selector`, in document order
    async fn query_all(&self, selector: &Selector) -> ParityResult<Vec<ElementSnapshot>>;

    /// Click the `index`-th match
    async fn click(&self, selector: &Selector, index: usize) -> ParityResult<()>;

    /// Send one key press to the focused element
    async fn press_key(&self, key: Key) -> ParityResult<()>;

    /// Set a `<select>` value through the form API and fire `input`/`change`.
    ///
    /// Fails with `OptionNotFound` when no option carries `value`.
    async fn set_select_value(
        &self,
        selector: &Selector,
        index: usize,
        value: &str,
    ) -> ParityResult<()>;

    /// Release the page
    async fn close(&self) -> ParityResult<()>;
}

/// Opens isolated pages
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Short name for logs and reports
    fn name(&self) -> &str;

    /// Open a fresh page
    async fn open(&self) -> ParityResult<Box<dyn PageDriver>>;

    /// Tear down the underlying browser
    async fn shutdown(&self) -> ParityResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults_actionable() {
        let snap = ElementSnapshot::new("select");
        assert!(snap.is_actionable());
        assert!(snap.blocker().is_none());
        assert!(!snap.focused);
    }

    #[test]
    fn test_snapshot_blockers() {
        let mut snap = ElementSnapshot::new("button");
        snap.enabled = false;
        assert_eq!(snap.blocker(), Some("disabled"));
        snap.visible = false;
        assert_eq!(snap.blocker(), Some("not visible"));
    }

    #[test]
    fn test_snapshot_attr() {
        let mut snap = ElementSnapshot::new("select");
        snap.attributes
            .insert("aria-required".to_string(), "true".to_string());
        assert_eq!(snap.attr("aria-required"), Some("true"));
        assert_eq!(snap.attr("aria-label"), None);
    }

    #[test]
    fn test_key_codes() {
        assert_eq!(Key::ArrowDown.virtual_key_code(), 40);
        assert_eq!(Key::Enter.text(), Some("\r"));
        assert_eq!(Key::Escape.text(), None);
        assert_eq!(Key::Space.key(), " ");
        assert_eq!(Key::ArrowDown.to_string(), "ArrowDown");
    }
}
