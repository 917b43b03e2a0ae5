//! In-memory browser.
//!
//! [`MockBrowser`] renders both fixture variants without a real browser and
//! implements their interaction semantics: a platform `<select>` at `/plain`
//! and a combobox trigger with a popup listbox and hidden synchronized
//! `<select>` at `/shadcn`. It can delay rendering to exercise auto-waiting
//! and inject [`Fault`]s to exercise failure reporting.

mod dom;
mod fault;

pub use fault::{Fault, FaultSpec};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::driver::{ElementSnapshot, Key, PageDriver, SessionFactory};
use crate::fixture::Variant;
use crate::locator::Selector;
use crate::result::{ParityError, ParityResult};

use dom::{ControlState, MockElement, RenderContext, Route};

/// Factory for mock pages
#[derive(Debug, Clone, Default)]
pub struct MockBrowser {
    render_delay: Duration,
    navigation_latency: Duration,
    faults: Vec<FaultSpec>,
    counters: Arc<PageCounters>,
}

#[derive(Debug, Default)]
struct PageCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl MockBrowser {
    /// Create a mock browser with no latency and no faults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay between navigation and the control appearing
    #[must_use]
    pub const fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    /// Time each navigation takes
    #[must_use]
    pub const fn with_navigation_latency(mut self, latency: Duration) -> Self {
        self.navigation_latency = latency;
        self
    }

    /// Inject a fault into one variant
    #[must_use]
    pub fn with_fault(mut self, spec: FaultSpec) -> Self {
        self.faults.push(spec);
        self
    }

    /// Inject several faults
    #[must_use]
    pub fn with_faults(mut self, specs: impl IntoIterator<Item = FaultSpec>) -> Self {
        self.faults.extend(specs);
        self
    }

    /// Pages opened so far
    #[must_use]
    pub fn pages_opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Pages closed so far
    #[must_use]
    pub fn pages_closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    fn faults_by_variant(&self) -> HashMap<Variant, Vec<Fault>> {
        let mut map: HashMap<Variant, Vec<Fault>> = HashMap::new();
        for spec in &self.faults {
            map.entry(spec.variant).or_default().push(spec.fault);
        }
        map
    }
}

#[async_trait]
impl SessionFactory for MockBrowser {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(&self) -> ParityResult<Box<dyn PageDriver>> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPage {
            render_delay: self.render_delay,
            navigation_latency: self.navigation_latency,
            faults: self.faults_by_variant(),
            counters: Arc::clone(&self.counters),
            state: Mutex::new(PageState::default()),
        }))
    }
}

#[derive(Debug)]
struct PageState {
    url: String,
    route: Option<Route>,
    control: ControlState,
    loaded_at: Instant,
    /// Values committed per variant, replayed by `StickySelection`
    remembered: HashMap<Variant, String>,
    closed: bool,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
            route: None,
            control: ControlState::default(),
            loaded_at: Instant::now(),
            remembered: HashMap::new(),
            closed: false,
        }
    }
}

/// One mock page
#[derive(Debug)]
pub struct MockPage {
    render_delay: Duration,
    navigation_latency: Duration,
    faults: HashMap<Variant, Vec<Fault>>,
    counters: Arc<PageCounters>,
    state: Mutex<PageState>,
}

impl MockPage {
    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults_for(&self, route: Option<Route>) -> &[Fault] {
        match route {
            Some(Route::Fixture(variant)) => self
                .faults
                .get(&variant)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            _ => &[],
        }
    }

    fn has_fault(&self, route: Option<Route>, fault: Fault) -> bool {
        self.faults_for(route).contains(&fault)
    }

    fn render(&self, state: &PageState) -> ParityResult<Vec<MockElement>> {
        if state.closed {
            return Err(ParityError::page("page is closed"));
        }
        let Some(route) = state.route else {
            return Ok(Vec::new());
        };
        Ok(dom::render(&RenderContext {
            route,
            state: &state.control,
            faults: self.faults_for(Some(route)),
            rendered: state.loaded_at.elapsed() >= self.render_delay,
        }))
    }

    fn resolve(
        &self,
        state: &PageState,
        selector: &Selector,
        index: usize,
    ) -> ParityResult<(Vec<MockElement>, usize)> {
        let dom = self.render(state)?;
        let matches = dom::query(&dom, selector)?;
        let found = matches.get(index).copied().ok_or_else(|| {
            ParityError::driver(format!("{selector} matched {} element(s), wanted #{index}", matches.len()))
        })?;
        Ok((dom, found))
    }

    fn commit(&self, state: &mut PageState, value: &str) {
        let desync = self.has_fault(state.route, Fault::ValueDesync);
        state.control.value = value.to_string();
        if !desync {
            state.control.hidden_value = value.to_string();
        }
        if let Some(Route::Fixture(variant)) = state.route {
            state.remembered.insert(variant, value.to_string());
        }
    }

    fn options(&self, state: &PageState) -> Vec<String> {
        dom::rendered_options(self.faults_for(state.route))
            .into_iter()
            .map(|o| o.value)
            .collect()
    }
}

/// Path component of an absolute or relative URL
fn path_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = if url.contains("://") {
        without_scheme.find('/').map_or("/", |i| &without_scheme[i..])
    } else {
        without_scheme
    };
    path.split(['?', '#']).next().unwrap_or(path)
}

#[async_trait]
impl PageDriver for MockPage {
    async fn navigate(&self, url: &str) -> ParityResult<()> {
        if !self.navigation_latency.is_zero() {
            tokio::time::sleep(self.navigation_latency).await;
        }

        let route = Route::from_path(path_of(url)).ok_or_else(|| ParityError::NavigationError {
            url: url.to_string(),
            message: "404 Not Found".to_string(),
        })?;
        if self.has_fault(Some(route), Fault::Unreachable) {
            return Err(ParityError::NavigationError {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }

        let sticky = self.has_fault(Some(route), Fault::StickySelection);
        let mut state = self.state();
        if state.closed {
            return Err(ParityError::page("page is closed"));
        }
        let value = match route {
            Route::Fixture(variant) if sticky => state.remembered.get(&variant).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        state.url = url.to_string();
        state.route = Some(route);
        state.loaded_at = Instant::now();
        state.control = ControlState {
            hidden_value: value.clone(),
            value,
            ..ControlState::default()
        };
        Ok(())
    }

    async fn current_url(&self) -> ParityResult<String> {
        Ok(self.state().url.clone())
    }

    async fn query_all(&self, selector: &Selector) -> ParityResult<Vec<ElementSnapshot>> {
        let state = self.state();
        let dom = self.render(&state)?;
        let focused = state.control.focused.as_deref();
        Ok(dom::query(&dom, selector)?
            .into_iter()
            .map(|i| dom::snapshot(&dom, i, focused))
            .collect())
    }

    async fn click(&self, selector: &Selector, index: usize) -> ParityResult<()> {
        let follow = {
            let mut state = self.state();
            let (dom, target) = self.resolve(&state, selector, index)?;
            let el = &dom[target];
            if el.attrs.contains_key("disabled") {
                return Err(ParityError::driver(format!("{selector} is disabled")));
            }
            if el.key == "control" && self.has_fault(state.route, Fault::PanicOnClick) {
                panic!("injected fault: click handler crashed");
            }

            let key = el.key.as_str();
            if key == "control" {
                if el.tag == "button" {
                    let current = state.control.value.clone();
                    let highlight = self.options(&state).iter().position(|v| *v == current);
                    state.control.open = !state.control.open;
                    state.control.highlight = highlight.unwrap_or(0);
                }
                state.control.focused = Some("control".to_string());
                None
            } else if let Some(value) = key.strip_prefix("item:") {
                self.commit(&mut state, value);
                state.control.open = false;
                state.control.focused = Some("control".to_string());
                None
            } else if let Some(value) = key.strip_prefix("option:") {
                self.commit(&mut state, value);
                state.control.focused = Some("control".to_string());
                None
            } else if let Some(route) = key.strip_prefix("link:") {
                let origin = state.url.trim_end_matches(path_of(&state.url));
                Some(format!("{origin}{route}"))
            } else {
                state.control.focused = None;
                None
            }
        };

        match follow {
            Some(url) => self.navigate(&url).await,
            None => Ok(()),
        }
    }

    async fn press_key(&self, key: Key) -> ParityResult<()> {
        let mut state = self.state();
        if state.closed {
            return Err(ParityError::page("page is closed"));
        }
        if self.has_fault(state.route, Fault::IgnoreKeyboard)
            || state.control.focused.as_deref() != Some("control")
        {
            return Ok(());
        }

        let options = self.options(&state);
        let last = options.len().saturating_sub(1);
        match state.route {
            Some(Route::Fixture(Variant::Native)) => {
                let current = options
                    .iter()
                    .position(|v| *v == state.control.value)
                    .unwrap_or(0);
                let next = match key {
                    Key::ArrowDown => (current + 1).min(last),
                    Key::ArrowUp => current.saturating_sub(1),
                    _ => current,
                };
                if next != current {
                    if let Some(value) = options.get(next).cloned() {
                        self.commit(&mut state, &value);
                    }
                }
            }
            Some(Route::Fixture(Variant::Composite)) => {
                let control = &mut state.control;
                match (control.open, key) {
                    (false, Key::ArrowDown | Key::ArrowUp | Key::Enter | Key::Space) => {
                        control.open = true;
                        control.highlight = options
                            .iter()
                            .position(|v| *v == control.value)
                            .unwrap_or(0);
                    }
                    (true, Key::ArrowDown) => control.highlight = (control.highlight + 1).min(last),
                    (true, Key::ArrowUp) => control.highlight = control.highlight.saturating_sub(1),
                    (true, Key::Enter | Key::Space) => {
                        if let Some(value) = options.get(control.highlight).cloned() {
                            control.open = false;
                            self.commit(&mut state, &value);
                        }
                    }
                    (true, Key::Escape) => control.open = false,
                    (false, Key::Escape) => {}
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn set_select_value(
        &self,
        selector: &Selector,
        index: usize,
        value: &str,
    ) -> ParityResult<()> {
        let mut state = self.state();
        let (dom, target) = self.resolve(&state, selector, index)?;
        let el = &dom[target];
        if el.tag != "select" {
            return Err(ParityError::driver(format!("{selector} is not a <select>")));
        }
        if el.attrs.contains_key("disabled") {
            return Err(ParityError::driver(format!("{selector} is disabled")));
        }
        let has_option = dom
            .iter()
            .any(|o| o.parent == Some(target) && o.value.as_deref() == Some(value));
        if !has_option {
            return Err(ParityError::OptionNotFound {
                value: value.to_string(),
            });
        }
        self.commit(&mut state, value);
        Ok(())
    }

    async fn close(&self) -> ParityResult<()> {
        let mut state = self.state();
        if !state.closed {
            state.closed = true;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
