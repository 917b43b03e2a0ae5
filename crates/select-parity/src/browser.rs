//! Chromium driver over the Chrome `DevTools` Protocol.
//!
//! With the `browser` feature, [`CdpSessionFactory`] launches one Chromium
//! process and opens a fresh page per (fixture, scenario) pair. Element
//! queries run as a single `Runtime.evaluate` that returns
//! [`ElementSnapshot`](crate::driver::ElementSnapshot)s, so role and
//! accessible-name resolution follow the same rules as the mock DOM.

use serde::{Deserialize, Serialize};

/// Browser launch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Helpers evaluated in front of every query. `roleOf` and `nameOf` mirror
/// the mock DOM: hidden and `aria-hidden` subtrees have no role.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const DOM_HELPERS: &str = r#"
const IMPLICIT_ROLES = { BUTTON: 'button', SELECT: 'combobox', OPTION: 'option', NAV: 'navigation', MAIN: 'main', H1: 'heading', H2: 'heading', P: 'paragraph' };
const roleOf = (el) => {
  if (el.closest('[hidden],[aria-hidden="true"]')) return null;
  const explicit = (el.getAttribute('role') || '').trim();
  if (explicit) return explicit.split(/\s+/)[0];
  if (el.tagName === 'A') return el.hasAttribute('href') ? 'link' : null;
  return IMPLICIT_ROLES[el.tagName] || null;
};
const nameOf = (el) => {
  const label = el.getAttribute('aria-label');
  if (label) return label.trim();
  const labelledBy = el.getAttribute('aria-labelledby');
  if (labelledBy) {
    return labelledBy.split(/\s+/)
      .map(id => document.getElementById(id))
      .filter(Boolean)
      .map(n => n.textContent.trim())
      .join(' ');
  }
  if (el.id && ['SELECT', 'BUTTON', 'INPUT'].includes(el.tagName)) {
    const bound = document.querySelector(`label[for="${CSS.escape(el.id)}"]`);
    if (bound) return bound.textContent.trim();
  }
  if (['BUTTON', 'OPTION', 'A', 'H1', 'H2'].includes(el.tagName) || ['option', 'button', 'link', 'heading'].includes(el.getAttribute('role'))) {
    return (el.textContent || '').trim();
  }
  return '';
};
const isVisible = (el) => {
  const box = el.tagName === 'OPTION' && el.closest('select') ? el.closest('select') : el;
  if (box.closest('[hidden]')) return false;
  const style = window.getComputedStyle(box);
  if (style.display === 'none' || style.visibility === 'hidden') return false;
  const rect = box.getBoundingClientRect();
  return rect.width > 0 && rect.height > 0;
};
const snapshot = (el) => {
  const attributes = {};
  for (const a of el.attributes) attributes[a.name] = a.value;
  const formish = ['SELECT', 'OPTION', 'INPUT', 'TEXTAREA'].includes(el.tagName);
  return {
    tag: el.tagName.toLowerCase(),
    id: el.id || null,
    text: (el.textContent || '').trim(),
    attributes,
    value: formish ? el.value : null,
    role: roleOf(el),
    name: nameOf(el),
    visible: isVisible(el),
    enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
    focused: document.activeElement === el,
  };
};
"#;

/// Wrap a script body so the DOM helpers are in scope
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn script(body: &str) -> String {
    format!("(() => {{\n{DOM_HELPERS}\n{body}\n}})()")
}

/// Drop the `data-parity-handle` tag a click left behind
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn clear_handle_script(token: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector('[data-parity-handle=\"{token}\"]'); \
         if (el) el.removeAttribute('data-parity-handle'); return true; }})()"
    )
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchKeyEventParams, DispatchKeyEventType,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use super::{clear_handle_script, script, BrowserConfig};
    use crate::driver::{ElementSnapshot, Key, PageDriver, SessionFactory};
    use crate::locator::Selector;
    use crate::result::{ParityError, ParityResult};

    /// One Chromium process; every `open` is a new tab
    #[derive(Debug)]
    pub struct CdpSessionFactory {
        config: BrowserConfig,
        browser: Arc<Mutex<CdpBrowser>>,
        handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    }

    impl CdpSessionFactory {
        /// Launch Chromium
        ///
        /// # Errors
        ///
        /// `BrowserLaunch` if the executable cannot be found or started.
        pub async fn launch(config: BrowserConfig) -> ParityResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| ParityError::BrowserLaunch { message })?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
                ParityError::BrowserLaunch {
                    message: e.to_string(),
                }
            })?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            tracing::info!(headless = config.headless, "chromium launched");
            Ok(Self {
                config,
                browser: Arc::new(Mutex::new(browser)),
                handle: Mutex::new(Some(handle)),
            })
        }

        /// Launch configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }
    }

    #[async_trait]
    impl SessionFactory for CdpSessionFactory {
        fn name(&self) -> &str {
            "chromium"
        }

        async fn open(&self) -> ParityResult<Box<dyn PageDriver>> {
            let browser = self.browser.lock().await;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| ParityError::page(e.to_string()))?;
            Ok(Box::new(CdpPageDriver {
                page: Mutex::new(Some(page)),
            }))
        }

        async fn shutdown(&self) -> ParityResult<()> {
            let mut browser = self.browser.lock().await;
            browser
                .close()
                .await
                .map_err(|e| ParityError::driver(e.to_string()))?;
            if let Some(handle) = self.handle.lock().await.take() {
                handle.abort();
            }
            tracing::info!("chromium closed");
            Ok(())
        }
    }

    /// A tab driven over CDP
    #[derive(Debug)]
    pub struct CdpPageDriver {
        page: Mutex<Option<CdpPage>>,
    }

    impl CdpPageDriver {
        async fn eval<T: DeserializeOwned>(&self, expr: String) -> ParityResult<T> {
            let guard = self.page.lock().await;
            let page = guard
                .as_ref()
                .ok_or_else(|| ParityError::page("page already closed"))?;
            let result = page
                .evaluate(expr)
                .await
                .map_err(|e| ParityError::page(e.to_string()))?;
            result
                .into_value()
                .map_err(|e| ParityError::page(e.to_string()))
        }

        async fn dispatch(&self, params: DispatchKeyEventParams) -> ParityResult<()> {
            let guard = self.page.lock().await;
            let page = guard
                .as_ref()
                .ok_or_else(|| ParityError::page("page already closed"))?;
            page.execute(params)
                .await
                .map_err(|e| ParityError::driver(e.to_string()))?;
            Ok(())
        }
    }

    #[async_trait]
    impl PageDriver for CdpPageDriver {
        async fn navigate(&self, url: &str) -> ParityResult<()> {
            {
                let guard = self.page.lock().await;
                let page = guard
                    .as_ref()
                    .ok_or_else(|| ParityError::page("page already closed"))?;
                page.goto(url)
                    .await
                    .map_err(|e| ParityError::NavigationError {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
            }

            let status: u16 = self
                .eval(
                    "(() => { const e = performance.getEntriesByType('navigation')[0]; \
                     return e && typeof e.responseStatus === 'number' ? e.responseStatus : 0; })()"
                        .to_string(),
                )
                .await?;
            if status >= 400 {
                return Err(ParityError::NavigationError {
                    url: url.to_string(),
                    message: format!("HTTP {status}"),
                });
            }
            Ok(())
        }

        async fn current_url(&self) -> ParityResult<String> {
            let guard = self.page.lock().await;
            let page = guard
                .as_ref()
                .ok_or_else(|| ParityError::page("page already closed"))?;
            let url = page
                .url()
                .await
                .map_err(|e| ParityError::page(e.to_string()))?;
            Ok(url.unwrap_or_default())
        }

        async fn query_all(&self, selector: &Selector) -> ParityResult<Vec<ElementSnapshot>> {
            let body = format!("return ({}).map(snapshot);", selector.to_elements_js());
            self.eval(script(&body)).await
        }

        async fn click(&self, selector: &Selector, index: usize) -> ParityResult<()> {
            let token = Uuid::new_v4().simple().to_string();
            let body = format!(
                "const el = ({})[{index}]; if (!el) return false; \
                 el.setAttribute('data-parity-handle', '{token}'); return true;",
                selector.to_elements_js()
            );
            let tagged: bool = self.eval(script(&body)).await?;
            if !tagged {
                return Err(ParityError::driver(format!(
                    "{selector} has no match at index {index}"
                )));
            }

            {
                let guard = self.page.lock().await;
                let page = guard
                    .as_ref()
                    .ok_or_else(|| ParityError::page("page already closed"))?;
                let element = page
                    .find_element(format!("[data-parity-handle=\"{token}\"]"))
                    .await
                    .map_err(|e| ParityError::driver(e.to_string()))?;
                element
                    .click()
                    .await
                    .map_err(|e| ParityError::driver(e.to_string()))?;
            }

            // The click may have navigated; a missing element is fine.
            let cleaned: ParityResult<bool> = self.eval(clear_handle_script(&token)).await;
            if let Err(err) = cleaned {
                tracing::debug!(%token, error = %err, "click handle not cleared");
            }
            Ok(())
        }

        async fn press_key(&self, key: Key) -> ParityResult<()> {
            let down_type = if key.text().is_some() {
                DispatchKeyEventType::KeyDown
            } else {
                DispatchKeyEventType::RawKeyDown
            };

            let mut down = DispatchKeyEventParams::builder()
                .r#type(down_type)
                .key(key.key())
                .code(key.code())
                .windows_virtual_key_code(key.virtual_key_code())
                .native_virtual_key_code(key.virtual_key_code());
            if let Some(text) = key.text() {
                down = down.text(text);
            }
            let down = down.build().map_err(ParityError::driver)?;

            let up = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyUp)
                .key(key.key())
                .code(key.code())
                .windows_virtual_key_code(key.virtual_key_code())
                .native_virtual_key_code(key.virtual_key_code())
                .build()
                .map_err(ParityError::driver)?;

            self.dispatch(down).await?;
            self.dispatch(up).await
        }

        async fn set_select_value(
            &self,
            selector: &Selector,
            index: usize,
            value: &str,
        ) -> ParityResult<()> {
            let value_js = serde_json::Value::String(value.to_string()).to_string();
            let body = format!(
                "const el = ({})[{index}]; if (!el) return 'missing'; \
                 if (!Array.from(el.options || []).some(o => o.value === {value_js})) return 'no-option'; \
                 el.value = {value_js}; \
                 el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                 el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                 return 'ok';",
                selector.to_elements_js()
            );
            let outcome: String = self.eval(script(&body)).await?;
            match outcome.as_str() {
                "ok" => Ok(()),
                "no-option" => Err(ParityError::OptionNotFound {
                    value: value.to_string(),
                }),
                _ => Err(ParityError::driver(format!(
                    "{selector} has no match at index {index}"
                ))),
            }
        }

        async fn close(&self) -> ParityResult<()> {
            if let Some(page) = self.page.lock().await.take() {
                page.close()
                    .await
                    .map_err(|e| ParityError::page(e.to_string()))?;
            }
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{CdpPageDriver, CdpSessionFactory};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert!(config.sandbox);
        assert!(config.chromium_path.is_none());
    }

    #[test]
    fn test_config_builders() {
        let config = BrowserConfig::default()
            .with_headless(false)
            .with_no_sandbox()
            .with_viewport(800, 600)
            .with_chromium_path("/usr/bin/chromium");
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!((config.viewport_width, config.viewport_height), (800, 600));
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
    }

    #[test]
    fn test_script_puts_helpers_in_scope() {
        let js = script("return 1;");
        assert!(js.starts_with("(() => {"));
        assert!(js.contains("const roleOf"));
        assert!(js.contains("const nameOf"));
        assert!(js.trim_end().ends_with("})()"));
    }

    #[test]
    fn test_clear_handle_script_targets_token() {
        let js = clear_handle_script("abc123");
        assert!(js.contains("[data-parity-handle=\"abc123\"]"));
        assert!(js.contains("removeAttribute('data-parity-handle')"));
        assert!(js.ends_with("})()"));
    }
}
