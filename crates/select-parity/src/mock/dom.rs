//! In-memory DOM for the mock browser.
//!
//! Pages are re-rendered from interaction state on every query, then
//! matched with a small CSS subset (type, `#id`, `.class`, `[attr]`,
//! `[attr="v"]`, descendant combinator) or by computed role and name.

use std::collections::BTreeMap;

use crate::catalog::{
    fruit_options, OptionRecord, CONTROL_ID, CONTROL_TEST_ID, DESCRIPTION_ID, LABEL_TEXT,
    TRIGGER_NAME,
};
use crate::driver::ElementSnapshot;
use crate::fixture::Variant;
use crate::locator::Selector;
use crate::result::{ParityError, ParityResult};

use super::fault::Fault;

/// One rendered element
#[derive(Debug, Clone)]
pub(crate) struct MockElement {
    /// Stable identity across re-renders
    pub key: String,
    pub tag: &'static str,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
    pub parent: Option<usize>,
    pub hidden: bool,
    pub value: Option<String>,
}

impl MockElement {
    fn new(key: impl Into<String>, tag: &'static str) -> Self {
        Self {
            key: key.into(),
            tag,
            attrs: BTreeMap::new(),
            text: String::new(),
            parent: None,
            hidden: false,
            value: None,
        }
    }

    fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// What the page currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    Home,
    Fixture(Variant),
}

impl Route {
    pub(crate) fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "" => Some(Self::Home),
            "/plain" => Some(Self::Fixture(Variant::Native)),
            "/shadcn" => Some(Self::Fixture(Variant::Composite)),
            _ => None,
        }
    }
}

/// Interaction state of the selector on the current document
#[derive(Debug, Clone, Default)]
pub(crate) struct ControlState {
    /// Committed value (native select / composite trigger)
    pub value: String,
    /// Value of the composite's hidden select
    pub hidden_value: String,
    pub open: bool,
    /// Highlighted index into the rendered options
    pub highlight: usize,
    /// Key of the focused element
    pub focused: Option<String>,
}

/// Render inputs
pub(crate) struct RenderContext<'a> {
    pub route: Route,
    pub state: &'a ControlState,
    pub faults: &'a [Fault],
    /// False while the simulated render delay has not elapsed
    pub rendered: bool,
}

impl RenderContext<'_> {
    fn has(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }
}

/// Options as a variant renders them, honoring option faults
pub(crate) fn rendered_options(faults: &[Fault]) -> Vec<OptionRecord> {
    let mut options = fruit_options();
    if faults.contains(&Fault::SwappedOptions) {
        options.swap(2, 3);
    }
    if faults.contains(&Fault::MissingPlaceholder) {
        options.retain(|o| !o.is_placeholder());
    }
    options
}

/// Build the element tree for the current state
pub(crate) fn render(ctx: &RenderContext<'_>) -> Vec<MockElement> {
    let mut dom = Dom::default();
    let body = dom.push(None, MockElement::new("body", "body"));

    match ctx.route {
        Route::Home => {
            dom.push(Some(body), MockElement::new("heading", "h1").text("Fruit selectors"));
            let nav = dom.push(Some(body), MockElement::new("nav", "nav"));
            dom.push(
                Some(nav),
                MockElement::new("link:/plain", "a")
                    .attr("href", "/plain")
                    .text("Plain HTML Select"),
            );
            dom.push(
                Some(nav),
                MockElement::new("link:/shadcn", "a")
                    .attr("href", "/shadcn")
                    .text("Shadcn Select"),
            );
        }
        Route::Fixture(_) if !ctx.rendered => {}
        Route::Fixture(variant) => {
            let main = dom.push(Some(body), MockElement::new("main", "main"));
            dom.push(
                Some(main),
                MockElement::new("label", "label")
                    .attr("for", CONTROL_ID)
                    .text(LABEL_TEXT),
            );
            match variant {
                Variant::Native => render_native(&mut dom, main, ctx),
                Variant::Composite => render_composite(&mut dom, main, ctx),
            }
            dom.push(
                Some(main),
                MockElement::new("description", "p")
                    .attr("id", DESCRIPTION_ID)
                    .text("Pick the fruit you like best."),
            );
        }
    }

    dom.elements
}

fn control_attrs(mut el: MockElement, ctx: &RenderContext<'_>) -> MockElement {
    el = el
        .attr("id", CONTROL_ID)
        .attr("data-testid", CONTROL_TEST_ID)
        .attr("aria-describedby", DESCRIPTION_ID);
    if !ctx.has(Fault::MissingAria) {
        el = el.attr("aria-required", "true");
    }
    if ctx.has(Fault::DisabledControl) {
        el = el.attr("disabled", "");
    }
    el
}

fn render_native(dom: &mut Dom, parent: usize, ctx: &RenderContext<'_>) {
    let mut select = control_attrs(MockElement::new("control", "select"), ctx)
        .attr("name", CONTROL_ID);
    select.value = Some(ctx.state.value.clone());
    let select = dom.push(Some(parent), select);

    for option in rendered_options(ctx.faults) {
        let mut el = MockElement::new(format!("option:{}", option.value), "option")
            .attr("value", option.value.clone())
            .text(option.label.clone());
        if let Some(test_id) = option.test_id() {
            el = el.attr("data-testid", test_id);
        }
        if option.value == ctx.state.value {
            el = el.attr("selected", "");
        }
        el.value = Some(option.value.clone());
        dom.push(Some(select), el);
    }
}

fn render_composite(dom: &mut Dom, parent: usize, ctx: &RenderContext<'_>) {
    let options = rendered_options(ctx.faults);
    let shown = options
        .iter()
        .find(|o| o.value == ctx.state.value)
        .map_or_else(String::new, |o| o.label.clone());

    let trigger = control_attrs(MockElement::new("control", "button"), ctx)
        .attr("type", "button")
        .attr("aria-label", TRIGGER_NAME)
        .attr("aria-haspopup", "listbox")
        .attr("aria-expanded", if ctx.state.open { "true" } else { "false" })
        .attr("data-state", if ctx.state.open { "open" } else { "closed" })
        .text(shown);
    let trigger = if ctx.state.open {
        trigger.attr("aria-controls", "fruit-listbox")
    } else {
        trigger
    };
    dom.push(Some(parent), trigger);

    if !ctx.has(Fault::NoHiddenSelect) {
        let mut hidden = MockElement::new("hidden-select", "select")
            .attr("name", CONTROL_ID)
            .attr("aria-hidden", "true")
            .attr("tabindex", "-1");
        hidden.hidden = true;
        hidden.value = Some(ctx.state.hidden_value.clone());
        let hidden = dom.push(Some(parent), hidden);
        for option in &options {
            let mut el = MockElement::new(format!("hidden-option:{}", option.value), "option")
                .attr("value", option.value.clone())
                .text(option.label.clone());
            el.value = Some(option.value.clone());
            dom.push(Some(hidden), el);
        }
    }

    if ctx.state.open {
        let listbox = dom.push(
            Some(parent),
            MockElement::new("listbox", "div")
                .attr("id", "fruit-listbox")
                .attr("role", "listbox"),
        );
        for (index, option) in options.iter().enumerate() {
            let mut el = MockElement::new(format!("item:{}", option.value), "div")
                .attr("role", "option")
                .attr("data-value", option.value.clone())
                .attr(
                    "aria-selected",
                    if option.value == ctx.state.value { "true" } else { "false" },
                )
                .text(option.label.clone());
            if let Some(test_id) = option.test_id() {
                el = el.attr("data-testid", test_id);
            }
            if index == ctx.state.highlight {
                el = el.attr("data-highlighted", "");
            }
            dom.push(Some(listbox), el);
        }
    }
}

#[derive(Default)]
struct Dom {
    elements: Vec<MockElement>,
}

impl Dom {
    fn push(&mut self, parent: Option<usize>, mut el: MockElement) -> usize {
        el.parent = parent;
        self.elements.push(el);
        self.elements.len() - 1
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Indices of elements matching `selector`, in document order
pub(crate) fn query(dom: &[MockElement], selector: &Selector) -> ParityResult<Vec<usize>> {
    match selector {
        Selector::Css(css) => {
            let compiled = parse_css(css)?;
            Ok((0..dom.len())
                .filter(|&i| matches_css(dom, i, &compiled))
                .collect())
        }
        Selector::TestId(id) => Ok((0..dom.len())
            .filter(|&i| dom[i].get("data-testid") == Some(id.as_str()))
            .collect()),
        Selector::Role { role, name } => Ok((0..dom.len())
            .filter(|&i| role_of(dom, i).as_deref() == Some(role.as_str()))
            .filter(|&i| name.as_ref().map_or(true, |n| name_of(dom, i) == *n))
            .collect()),
    }
}

/// Driver-independent snapshot of one element
pub(crate) fn snapshot(dom: &[MockElement], index: usize, focused: Option<&str>) -> ElementSnapshot {
    let el = &dom[index];
    ElementSnapshot {
        tag: el.tag.to_string(),
        id: el.get("id").map(str::to_string),
        text: text_content(dom, index).trim().to_string(),
        attributes: el.attrs.clone(),
        value: el.value.clone(),
        role: role_of(dom, index),
        name: name_of(dom, index),
        visible: !ancestors_and_self(dom, index).any(|i| dom[i].hidden),
        enabled: el.get("disabled").is_none(),
        focused: focused == Some(el.key.as_str()),
    }
}

fn ancestors_and_self(dom: &[MockElement], index: usize) -> impl Iterator<Item = usize> + '_ {
    std::iter::successors(Some(index), move |&i| dom[i].parent)
}

fn text_content(dom: &[MockElement], index: usize) -> String {
    let mut text = dom[index].text.clone();
    for child in (0..dom.len()).filter(|&i| dom[i].parent == Some(index)) {
        text.push_str(&text_content(dom, child));
    }
    text
}

fn role_of(dom: &[MockElement], index: usize) -> Option<String> {
    let excluded = ancestors_and_self(dom, index)
        .any(|i| dom[i].hidden || dom[i].get("aria-hidden") == Some("true"));
    if excluded {
        return None;
    }
    let el = &dom[index];
    if let Some(role) = el.get("role") {
        return role.split_whitespace().next().map(str::to_string);
    }
    let implicit = match el.tag {
        "button" => "button",
        "select" => "combobox",
        "option" => "option",
        "a" if el.get("href").is_some() => "link",
        "nav" => "navigation",
        "main" => "main",
        "h1" => "heading",
        "p" => "paragraph",
        _ => return None,
    };
    Some(implicit.to_string())
}

fn name_of(dom: &[MockElement], index: usize) -> String {
    let el = &dom[index];
    if let Some(label) = el.get("aria-label") {
        return label.trim().to_string();
    }
    if let Some(ids) = el.get("aria-labelledby") {
        return ids
            .split_whitespace()
            .filter_map(|id| dom.iter().position(|e| e.get("id") == Some(id)))
            .map(|i| text_content(dom, i).trim().to_string())
            .collect::<Vec<_>>()
            .join(" ");
    }
    if matches!(el.tag, "select" | "button" | "input") {
        if let Some(id) = el.get("id") {
            let bound = dom
                .iter()
                .position(|e| e.tag == "label" && e.get("for") == Some(id));
            if let Some(label) = bound {
                return text_content(dom, label).trim().to_string();
            }
        }
    }
    match role_of(dom, index).as_deref() {
        Some("button" | "option" | "link" | "heading") => {
            text_content(dom, index).trim().to_string()
        }
        _ => String::new(),
    }
}

// ============================================================================
// CSS subset
// ============================================================================

#[derive(Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

fn parse_css(css: &str) -> ParityResult<Vec<Compound>> {
    let unsupported = || ParityError::driver(format!("unsupported selector: {css}"));

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;
    for ch in css.trim().chars() {
        match (ch, quote) {
            (c, Some(q)) if c == q => {
                quote = None;
                current.push(c);
            }
            (c, Some(_)) => current.push(c),
            ('"' | '\'', None) => {
                quote = Some(ch);
                current.push(ch);
            }
            ('[', None) => {
                in_brackets = true;
                current.push(ch);
            }
            (']', None) => {
                in_brackets = false;
                current.push(ch);
            }
            (c, None) if c.is_whitespace() && !in_brackets => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            (',' | '>' | '+' | '~' | ':', None) if !in_brackets => return Err(unsupported()),
            (c, None) => current.push(c),
        }
    }
    if quote.is_some() || in_brackets {
        return Err(unsupported());
    }
    if !current.is_empty() {
        parts.push(current);
    }
    if parts.is_empty() {
        return Err(unsupported());
    }

    parts
        .iter()
        .map(|part| parse_compound(part).ok_or_else(unsupported))
        .collect()
}

fn parse_compound(part: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut rest = part;

    let tag_len = rest
        .find(|c: char| matches!(c, '#' | '.' | '['))
        .unwrap_or(rest.len());
    let tag = &rest[..tag_len];
    if !tag.is_empty() && tag != "*" {
        compound.tag = Some(tag.to_ascii_lowercase());
    }
    rest = &rest[tag_len..];

    while let Some(first) = rest.chars().next() {
        match first {
            '#' | '.' => {
                let end = rest[1..]
                    .find(|c: char| matches!(c, '#' | '.' | '['))
                    .map_or(rest.len(), |i| i + 1);
                let ident = rest[1..end].to_string();
                if ident.is_empty() {
                    return None;
                }
                if first == '#' {
                    compound.id = Some(ident);
                } else {
                    compound.classes.push(ident);
                }
                rest = &rest[end..];
            }
            '[' => {
                let end = rest.find(']')?;
                let body = &rest[1..end];
                let attr = match body.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim();
                        let unquoted = value
                            .strip_prefix('"')
                            .and_then(|v| v.strip_suffix('"'))
                            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                            .unwrap_or(value);
                        (name.trim().to_string(), Some(unquoted.to_string()))
                    }
                    None => (body.trim().to_string(), None),
                };
                if attr.0.is_empty() {
                    return None;
                }
                compound.attrs.push(attr);
                rest = &rest[end + 1..];
            }
            _ => return None,
        }
    }
    Some(compound)
}

fn matches_compound(el: &MockElement, compound: &Compound) -> bool {
    if compound.tag.as_deref().is_some_and(|tag| tag != el.tag) {
        return false;
    }
    if compound.id.as_deref().is_some_and(|id| el.get("id") != Some(id)) {
        return false;
    }
    let classes: Vec<&str> = el.get("class").map_or_else(Vec::new, |c| c.split_whitespace().collect());
    if !compound.classes.iter().all(|c| classes.contains(&c.as_str())) {
        return false;
    }
    compound.attrs.iter().all(|(name, value)| match value {
        Some(v) => el.get(name) == Some(v.as_str()),
        None => el.get(name).is_some(),
    })
}

fn matches_css(dom: &[MockElement], index: usize, compounds: &[Compound]) -> bool {
    let Some((last, ancestors)) = compounds.split_last() else {
        return false;
    };
    if !matches_compound(&dom[index], last) {
        return false;
    }
    let mut cursor = dom[index].parent;
    for compound in ancestors.iter().rev() {
        loop {
            let Some(i) = cursor else {
                return false;
            };
            cursor = dom[i].parent;
            if matches_compound(&dom[i], compound) {
                break;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(variant: Variant, state: &ControlState, faults: &[Fault]) -> Vec<MockElement> {
        render(&RenderContext {
            route: Route::Fixture(variant),
            state,
            faults,
            rendered: true,
        })
    }

    fn select(dom: &[MockElement], selector: &Selector) -> Vec<ElementSnapshot> {
        query(dom, selector)
            .unwrap()
            .into_iter()
            .map(|i| snapshot(dom, i, None))
            .collect()
    }

    mod css_tests {
        use super::*;

        #[test]
        fn test_parse_compound() {
            let parsed = parse_css("select#favoriteFruit option[value=\"\"]").unwrap();
            assert_eq!(parsed.len(), 2);
            assert_eq!(parsed[0].tag.as_deref(), Some("select"));
            assert_eq!(parsed[0].id.as_deref(), Some("favoriteFruit"));
            assert_eq!(
                parsed[1].attrs,
                vec![("value".to_string(), Some(String::new()))]
            );
        }

        #[test]
        fn test_unsupported_combinators() {
            assert!(parse_css("select > option").is_err());
            assert!(parse_css("option:checked").is_err());
            assert!(parse_css("a, b").is_err());
            assert!(parse_css("   ").is_err());
            assert!(parse_css("[data-testid=\"x\"").is_err());
        }

        #[test]
        fn test_attribute_value_with_space() {
            let parsed = parse_css("[aria-label=\"Select a fruit\"]").unwrap();
            assert_eq!(
                parsed[0].attrs[0],
                ("aria-label".to_string(), Some("Select a fruit".to_string()))
            );
        }

        #[test]
        fn test_descendant_match() {
            let state = ControlState::default();
            let dom = fixture(Variant::Native, &state, &[]);
            let options = select(&dom, &Selector::css("select#favoriteFruit option"));
            assert_eq!(options.len(), 6);
            assert_eq!(options[0].text, "--Please choose an option--");
            assert_eq!(options[1].value.as_deref(), Some("apple"));

            let none = select(&dom, &Selector::css("nav option"));
            assert!(none.is_empty());
        }
    }

    mod render_tests {
        use super::*;

        #[test]
        fn test_native_control_contract() {
            let state = ControlState::default();
            let dom = fixture(Variant::Native, &state, &[]);
            let control = select(&dom, &Selector::css("#favoriteFruit"));
            assert_eq!(control.len(), 1);
            let control = &control[0];
            assert_eq!(control.tag, "select");
            assert_eq!(control.role.as_deref(), Some("combobox"));
            assert_eq!(control.name, LABEL_TEXT);
            assert_eq!(control.attr("aria-required"), Some("true"));
            assert_eq!(control.value.as_deref(), Some(""));
        }

        #[test]
        fn test_composite_trigger_is_named_button() {
            let state = ControlState::default();
            let dom = fixture(Variant::Composite, &state, &[]);
            let buttons = select(&dom, &Selector::role_named("button", TRIGGER_NAME));
            assert_eq!(buttons.len(), 1);
            assert_eq!(buttons[0].id.as_deref(), Some(CONTROL_ID));
            assert_eq!(buttons[0].attr("aria-expanded"), Some("false"));
        }

        #[test]
        fn test_hidden_select_excluded_from_roles() {
            let state = ControlState {
                open: true,
                ..ControlState::default()
            };
            let dom = fixture(Variant::Composite, &state, &[]);
            let apple = select(&dom, &Selector::role_named("option", "Apple"));
            assert_eq!(apple.len(), 1);
            assert_eq!(apple[0].attr("data-testid"), Some("select-apple"));

            let hidden = select(&dom, &Selector::css("select[name=\"favoriteFruit\"]"));
            assert_eq!(hidden.len(), 1);
            assert!(!hidden[0].visible);
            assert!(hidden[0].role.is_none());
        }

        #[test]
        fn test_listbox_absent_when_closed() {
            let state = ControlState::default();
            let dom = fixture(Variant::Composite, &state, &[]);
            assert!(select(&dom, &Selector::role("option")).is_empty());
        }

        #[test]
        fn test_render_delay_hides_control() {
            let state = ControlState::default();
            let dom = render(&RenderContext {
                route: Route::Fixture(Variant::Native),
                state: &state,
                faults: &[],
                rendered: false,
            });
            assert!(select(&dom, &Selector::css("label")).is_empty());
        }

        #[test]
        fn test_option_faults() {
            let options = rendered_options(&[Fault::MissingPlaceholder]);
            assert_eq!(options.len(), 5);
            let options = rendered_options(&[Fault::SwappedOptions]);
            assert_eq!(options[2].value, "blueberry");
            assert_eq!(options[3].value, "banana");
        }

        #[test]
        fn test_routes() {
            assert_eq!(Route::from_path("/"), Some(Route::Home));
            assert_eq!(Route::from_path(""), Some(Route::Home));
            assert_eq!(
                Route::from_path("/shadcn/"),
                Some(Route::Fixture(Variant::Composite))
            );
            assert_eq!(Route::from_path("/radio"), None);
        }
    }
}
