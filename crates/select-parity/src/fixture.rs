//! Fixture descriptors: which implementation variant lives at which route.

use serde::{Deserialize, Serialize};

/// Route used only as an intermediate navigation target
pub const HOME_ROUTE: &str = "/";

/// Implementation shape behind a fixture route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Platform `<select>` element
    Native,
    /// ARIA combobox widget with a hidden synchronized `<select>`
    Composite,
}

impl Variant {
    /// Both variants, in report order
    pub const ALL: [Self; 2] = [Self::Native, Self::Composite];

    /// Short name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Composite => "composite",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" | "plain" => Ok(Self::Native),
            "composite" | "shadcn" => Ok(Self::Composite),
            other => Err(format!("unknown variant '{other}' (native|composite)")),
        }
    }
}

/// Identifies one implementation variant under test
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixtureDescriptor {
    /// Route serving the page, e.g. `/plain`
    pub route: String,
    /// Human-readable description used in reports
    pub description: String,
    /// Adapter selector
    pub variant: Variant,
}

impl FixtureDescriptor {
    /// Create a new descriptor
    #[must_use]
    pub fn new(route: impl Into<String>, description: impl Into<String>, variant: Variant) -> Self {
        Self {
            route: route.into(),
            description: description.into(),
            variant,
        }
    }

    /// The native `<select>` fixture
    #[must_use]
    pub fn plain() -> Self {
        Self::new("/plain", "Plain HTML Select Component", Variant::Native)
    }

    /// The composite widget fixture
    #[must_use]
    pub fn shadcn() -> Self {
        Self::new("/shadcn", "Shadcn Select Component", Variant::Composite)
    }

    /// Absolute URL of this fixture under `base_url`
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        join_url(base_url, &self.route)
    }
}

impl std::fmt::Display for FixtureDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description, self.route)
    }
}

/// Statically enumerated fixtures, one per variant
#[must_use]
pub fn default_fixtures() -> Vec<FixtureDescriptor> {
    vec![FixtureDescriptor::plain(), FixtureDescriptor::shadcn()]
}

/// Join a base URL and an absolute route without doubling slashes
#[must_use]
pub fn join_url(base_url: &str, route: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        route.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fixtures_cover_both_variants() {
        let fixtures = default_fixtures();
        assert_eq!(fixtures.len(), 2);
        assert_eq!(fixtures[0].variant, Variant::Native);
        assert_eq!(fixtures[1].variant, Variant::Composite);
        assert_eq!(fixtures[0].route, "/plain");
        assert_eq!(fixtures[1].route, "/shadcn");
    }

    #[test]
    fn test_url_join() {
        let plain = FixtureDescriptor::plain();
        assert_eq!(plain.url("http://localhost:5173"), "http://localhost:5173/plain");
        assert_eq!(plain.url("http://localhost:5173/"), "http://localhost:5173/plain");
        assert_eq!(join_url("http://h:1", HOME_ROUTE), "http://h:1/");
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("plain".parse::<Variant>(), Ok(Variant::Native));
        assert_eq!("Composite".parse::<Variant>(), Ok(Variant::Composite));
        assert!("radio".parse::<Variant>().is_err());
    }

    #[test]
    fn test_descriptor_display() {
        let text = FixtureDescriptor::shadcn().to_string();
        assert!(text.contains("Shadcn"));
        assert!(text.contains("/shadcn"));
    }
}
