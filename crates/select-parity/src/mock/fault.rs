//! Fault injection for the mock browser.

use serde::{Deserialize, Serialize};

use crate::fixture::Variant;

/// A deliberate defect in one rendered variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fault {
    /// Composite commit updates the trigger but not the hidden select
    ValueDesync,
    /// Composite renders no hidden select
    NoHiddenSelect,
    /// Placeholder option is not rendered
    MissingPlaceholder,
    /// Banana and Blueberry rendered in swapped order
    SwappedOptions,
    /// Selection survives navigation
    StickySelection,
    /// Control lacks `aria-required`
    MissingAria,
    /// Control rendered disabled
    DisabledControl,
    /// Key presses are ignored
    IgnoreKeyboard,
    /// The route never loads
    Unreachable,
    /// Clicking the control panics inside the driver
    PanicOnClick,
}

impl Fault {
    /// Every fault, for listings
    pub const ALL: [Self; 10] = [
        Self::ValueDesync,
        Self::NoHiddenSelect,
        Self::MissingPlaceholder,
        Self::SwappedOptions,
        Self::StickySelection,
        Self::MissingAria,
        Self::DisabledControl,
        Self::IgnoreKeyboard,
        Self::Unreachable,
        Self::PanicOnClick,
    ];

    /// Kebab-case name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValueDesync => "value-desync",
            Self::NoHiddenSelect => "no-hidden-select",
            Self::MissingPlaceholder => "missing-placeholder",
            Self::SwappedOptions => "swapped-options",
            Self::StickySelection => "sticky-selection",
            Self::MissingAria => "missing-aria",
            Self::DisabledControl => "disabled-control",
            Self::IgnoreKeyboard => "ignore-keyboard",
            Self::Unreachable => "unreachable",
            Self::PanicOnClick => "panic-on-click",
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Fault {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|fault| fault.as_str() == s)
            .ok_or_else(|| format!("unknown fault '{s}'"))
    }
}

/// A fault bound to the variant it applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaultSpec {
    /// Affected variant
    pub variant: Variant,
    /// Injected defect
    pub fault: Fault,
}

impl FaultSpec {
    /// Create a new fault spec
    #[must_use]
    pub const fn new(variant: Variant, fault: Fault) -> Self {
        Self { variant, fault }
    }
}

impl std::fmt::Display for FaultSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.variant, self.fault)
    }
}

/// Parses `variant:fault`, e.g. `composite:value-desync`
impl std::str::FromStr for FaultSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (variant, fault) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <variant>:<fault>, got '{s}'"))?;
        Ok(Self {
            variant: variant.parse()?,
            fault: fault.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_names_round_trip() {
        for fault in Fault::ALL {
            assert_eq!(fault.as_str().parse::<Fault>(), Ok(fault));
        }
    }

    #[test]
    fn test_fault_spec_parse() {
        let spec: FaultSpec = "shadcn:value-desync".parse().unwrap();
        assert_eq!(spec, FaultSpec::new(Variant::Composite, Fault::ValueDesync));
        assert_eq!(spec.to_string(), "composite:value-desync");

        assert!("composite".parse::<FaultSpec>().is_err());
        assert!("native:melted".parse::<FaultSpec>().is_err());
        assert!("radio:unreachable".parse::<FaultSpec>().is_err());
    }
}
