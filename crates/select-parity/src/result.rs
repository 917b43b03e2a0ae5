//! Result and error types for select-parity.

use thiserror::Error;

/// Result type for harness operations
pub type ParityResult<T> = Result<T, ParityError>;

/// Errors that can occur while driving or asserting a selector
#[derive(Debug, Error)]
pub enum ParityError {
    /// Fixture route unreachable or never became ready
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// No rendered option carries the requested value
    #[error("No option with value {value:?}")]
    OptionNotFound {
        /// Requested option value
        value: String,
    },

    /// No option record carries the requested label
    #[error("No option labelled {label:?}")]
    LabelNotFound {
        /// Requested option label
        label: String,
    },

    /// Target never became present, visible and enabled
    #[error("{target} not actionable after {ms}ms: {reason}")]
    ActionabilityTimeout {
        /// Description of the target
        target: String,
        /// Timeout in milliseconds
        ms: u64,
        /// Last observed blocker
        reason: String,
    },

    /// An expectation did not hold within its deadline
    #[error("{assertion}: expected {expected:?}, got {actual:?}")]
    ScenarioFailure {
        /// What was being asserted
        assertion: String,
        /// Expected value
        expected: String,
        /// Last observed value
        actual: String,
    },

    /// A pending wait was abandoned because its page navigated away
    #[error("Wait for {what} abandoned: page navigated")]
    WaitAbandoned {
        /// Description of the wait
        what: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page error (creation, closing, evaluation)
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Driver-level failure (input dispatch, protocol errors)
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Scenario body panicked
    #[error("Scenario panicked: {message}")]
    Panicked {
        /// Panic payload
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ParityError {
    /// Create a scenario failure from an assertion mismatch
    #[must_use]
    pub fn mismatch(
        assertion: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ScenarioFailure {
            assertion: assertion.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Stable short name of the error kind, used in reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NavigationError { .. } => "NavigationError",
            Self::OptionNotFound { .. } => "OptionNotFound",
            Self::LabelNotFound { .. } => "LabelNotFound",
            Self::ActionabilityTimeout { .. } => "ActionabilityTimeout",
            Self::ScenarioFailure { .. } => "ScenarioFailure",
            Self::WaitAbandoned { .. } => "WaitAbandoned",
            Self::BrowserLaunch { .. } => "BrowserLaunch",
            Self::Page { .. } => "PageError",
            Self::Driver { .. } => "DriverError",
            Self::Config { .. } => "ConfigError",
            Self::Panicked { .. } => "Panicked",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
            Self::Yaml(_) => "Yaml",
        }
    }

    /// Expected/actual payload for assertion mismatches
    #[must_use]
    pub fn expected_actual(&self) -> Option<(&str, &str)> {
        match self {
            Self::ScenarioFailure {
                expected, actual, ..
            } => Some((expected.as_str(), actual.as_str())),
            _ => None,
        }
    }
}
