//! Inspect command: dump the labels and controls a fixture renders

use std::fmt::Write as _;

use select_parity::{locator, ElementSnapshot, Locator, Session, SessionFactory};
use serde::Serialize;

use crate::commands::InspectArgs;
use crate::error::CliResult;
use crate::handlers::setup::{open_factory, prepare_fixtures, resolve_harness};

/// What a route renders, as seen through the page driver
#[derive(Debug, Clone, Serialize)]
pub struct PageInspection {
    /// Inspected URL
    pub url: String,
    /// Every `<label>`
    pub labels: Vec<ElementSnapshot>,
    /// Every `<select>`, visible or hidden
    pub selects: Vec<ElementSnapshot>,
    /// The element carrying the control id
    pub control: Option<ElementSnapshot>,
    /// Options currently in the DOM (native or listbox)
    pub options: Vec<ElementSnapshot>,
}

impl PageInspection {
    /// Human-readable dump
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = format!("{}\n", self.url);
        section(&mut out, "labels", &self.labels);
        section(&mut out, "selects", &self.selects);
        section(&mut out, "control", self.control.as_slice());
        section(&mut out, "options", &self.options);
        out
    }
}

fn section(out: &mut String, title: &str, elements: &[ElementSnapshot]) {
    let _ = writeln!(out, "\n{title} ({})", elements.len());
    for el in elements {
        let _ = write!(out, "  <{}", el.tag);
        for (name, value) in &el.attributes {
            let _ = write!(out, " {name}={value:?}");
        }
        let _ = writeln!(out, ">");
        if !el.text.is_empty() {
            let _ = writeln!(out, "    text: {:?}", el.text);
        }
        if let Some(role) = &el.role {
            let _ = writeln!(out, "    role: {role}, name: {:?}", el.name);
        }
        if !el.visible || !el.enabled {
            let _ = writeln!(out, "    visible: {}, enabled: {}", el.visible, el.enabled);
        }
    }
}

/// Navigate and collect an inspection
pub async fn inspect_route(session: &Session, route: &str) -> CliResult<PageInspection> {
    session.goto(route).await?;
    session.wait_for(&locator::control()).await?;
    let mut options = session.query_all(&Locator::new("option")).await?;
    options.extend(
        session
            .query_all(&Locator::new("[role=\"option\"]"))
            .await?,
    );
    Ok(PageInspection {
        url: session.current_url().await?,
        labels: session.query_all(&Locator::new("label")).await?,
        selects: session.query_all(&Locator::new("select")).await?,
        control: session.query(&locator::control()).await?,
        options,
    })
}

/// Execute the inspect command
pub async fn execute_inspect(args: &InspectArgs, cwd: &std::path::Path) -> CliResult<String> {
    let harness = resolve_harness(&args.harness, cwd)?;
    let origin = match args.driver {
        crate::commands::DriverArg::Mock => None,
        crate::commands::DriverArg::Chromium => Some(prepare_fixtures(&harness, true).await?),
    };
    let factory = open_factory(args.driver, &harness, &[]).await?;

    let result = inspect_with(factory.as_ref(), harness.session_options(), &args.route).await;

    if let Err(e) = factory.shutdown().await {
        tracing::warn!(error = %e, "browser shutdown failed");
    }
    if let Some(origin) = origin {
        origin.shutdown();
    }

    let inspection = result?;
    if args.json {
        Ok(serde_json::to_string_pretty(&inspection).map_err(std::io::Error::other)?)
    } else {
        Ok(inspection.render_text())
    }
}

async fn inspect_with(
    factory: &dyn SessionFactory,
    options: select_parity::SessionOptions,
    route: &str,
) -> CliResult<PageInspection> {
    let session = Session::new(factory.open().await?, options);
    let result = inspect_route(&session, route).await;
    if let Err(e) = session.close().await {
        tracing::debug!(error = %e, "page close failed");
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use select_parity::{MockBrowser, RetryConfig, SessionOptions};

    async fn inspect_mock(route: &str) -> PageInspection {
        let browser = MockBrowser::new();
        let options = SessionOptions::new("http://127.0.0.1:5173").with_retry(RetryConfig::fast());
        inspect_with(&browser, options, route).await.unwrap()
    }

    #[tokio::test]
    async fn test_plain_page_shape() {
        let page = inspect_mock("/plain").await;
        assert!(page.url.ends_with("/plain"));
        assert_eq!(page.labels.len(), 1);
        assert_eq!(page.labels[0].text, "Select your favorite fruit");
        assert_eq!(page.selects.len(), 1);
        assert_eq!(page.control.as_ref().unwrap().tag, "select");
        assert_eq!(page.options.len(), 6);
    }

    #[tokio::test]
    async fn test_shadcn_page_shape() {
        let page = inspect_mock("/shadcn").await;
        let control = page.control.unwrap();
        assert_eq!(control.tag, "button");
        assert_eq!(control.attr("aria-haspopup"), Some("listbox"));
        // the hidden select and its options are still in the DOM
        assert_eq!(page.selects.len(), 1);
        assert!(!page.selects[0].visible);
    }

    #[tokio::test]
    async fn test_render_text_lists_attributes() {
        let text = inspect_mock("/plain").await.render_text();
        assert!(text.contains("labels (1)"));
        assert!(text.contains("data-testid=\"selectFruit\""));
        assert!(text.contains("role: combobox"));
    }
}
