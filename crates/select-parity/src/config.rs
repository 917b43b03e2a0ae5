//! Harness configuration.
//!
//! Loaded from `parity.yaml` when present; every field has a default, so an
//! empty file is valid. CLI flags override file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::browser::BrowserConfig;
use crate::result::{ParityError, ParityResult};
use crate::session::SessionOptions;
use crate::wait::{
    RetryConfig, DEFAULT_EXPECT_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS,
};

/// Default fixture server port
pub const DEFAULT_PORT: u16 = 5173;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "parity.yaml";

/// Configuration for a parity run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Fixture server port
    pub port: u16,
    /// Fixture server bind host
    pub host: String,
    /// Test against this origin instead of the local fixture server
    pub base_url: Option<String>,
    /// Use a server already listening on `port` instead of starting one
    pub reuse_existing_server: bool,
    /// Directory holding the fixture markup
    pub fixtures_dir: PathBuf,
    /// Shell command run before serving (e.g. a bundler)
    pub build_command: Option<String>,
    /// Expectation deadline
    pub expect_timeout_ms: u64,
    /// Delay between expectation probes
    pub poll_interval_ms: u64,
    /// Navigation deadline
    pub navigation_timeout_ms: u64,
    /// Concurrent pairs; 0 means available parallelism
    pub jobs: usize,
    /// Run Chromium headless
    pub headless: bool,
    /// Chromium executable (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Chromium sandbox (disable in containers)
    pub sandbox: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "127.0.0.1".to_string(),
            base_url: None,
            reuse_existing_server: true,
            fixtures_dir: PathBuf::from("fixtures"),
            build_command: None,
            expect_timeout_ms: DEFAULT_EXPECT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            jobs: 0,
            headless: true,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl HarnessConfig {
    /// Create a new builder
    #[must_use]
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::default()
    }

    /// Parse YAML
    ///
    /// # Errors
    ///
    /// `Yaml` on malformed input, `Config` if the values are invalid.
    pub fn from_yaml_str(yaml: &str) -> ParityResult<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    ///
    /// # Errors
    ///
    /// I/O, parse or validation errors.
    pub fn from_yaml_file(path: &Path) -> ParityResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Load `path` if given, else `parity.yaml` in `dir` if present, else defaults
    ///
    /// # Errors
    ///
    /// I/O, parse or validation errors.
    pub fn discover(path: Option<&Path>, dir: &Path) -> ParityResult<Self> {
        match path {
            Some(path) => Self::from_yaml_file(path),
            None => {
                let candidate = dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::from_yaml_file(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Serialize to YAML
    ///
    /// # Errors
    ///
    /// Serialization errors.
    pub fn to_yaml(&self) -> ParityResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Reject values no run could work with
    ///
    /// # Errors
    ///
    /// `Config` naming the offending field.
    pub fn validate(&self) -> ParityResult<()> {
        if self.port == 0 && self.base_url.is_none() {
            return Err(ParityError::config("port must be non-zero"));
        }
        if self.expect_timeout_ms == 0 {
            return Err(ParityError::config("expect_timeout_ms must be non-zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ParityError::config("poll_interval_ms must be non-zero"));
        }
        if self.poll_interval_ms > self.expect_timeout_ms {
            return Err(ParityError::config(
                "poll_interval_ms must not exceed expect_timeout_ms",
            ));
        }
        if self.navigation_timeout_ms == 0 {
            return Err(ParityError::config("navigation_timeout_ms must be non-zero"));
        }
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ParityError::config(format!(
                    "base_url must be an http(s) URL, got {url:?}"
                )));
            }
        }
        Ok(())
    }

    /// Origin the fixtures are loaded from
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
    }

    /// Whether the run needs a local fixture server at all
    #[must_use]
    pub const fn uses_local_server(&self) -> bool {
        self.base_url.is_none()
    }

    /// Expectation timing
    #[must_use]
    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new(Duration::from_millis(self.expect_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }

    /// Per-session options
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::new(self.base_url())
            .with_retry(self.retry())
            .with_navigation_timeout(Duration::from_millis(self.navigation_timeout_ms))
    }

    /// Chromium launch options
    #[must_use]
    pub fn browser_config(&self) -> BrowserConfig {
        let mut config = BrowserConfig::default().with_headless(self.headless);
        if !self.sandbox {
            config = config.with_no_sandbox();
        }
        if let Some(path) = &self.chromium_path {
            config = config.with_chromium_path(path.clone());
        }
        config
    }
}

/// Builder for `HarnessConfig`
#[derive(Debug, Clone, Default)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    /// Set the fixture server port
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the bind host
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Test against an external origin
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Reuse a server already on the port
    #[must_use]
    pub fn reuse_existing_server(mut self, reuse: bool) -> Self {
        self.config.reuse_existing_server = reuse;
        self
    }

    /// Set the fixture directory
    #[must_use]
    pub fn fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.fixtures_dir = dir.into();
        self
    }

    /// Set the pre-serve build command
    #[must_use]
    pub fn build_command(mut self, command: impl Into<String>) -> Self {
        self.config.build_command = Some(command.into());
        self
    }

    /// Set the expectation deadline
    #[must_use]
    pub fn expect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.expect_timeout_ms = ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the navigation deadline
    #[must_use]
    pub fn navigation_timeout_ms(mut self, ms: u64) -> Self {
        self.config.navigation_timeout_ms = ms;
        self
    }

    /// Set concurrency
    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = jobs;
        self
    }

    /// Headless or headed Chromium
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Chromium executable
    #[must_use]
    pub fn chromium_path(mut self, path: impl Into<String>) -> Self {
        self.config.chromium_path = Some(path.into());
        self
    }

    /// Chromium sandbox
    #[must_use]
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Validate and build
    ///
    /// # Errors
    ///
    /// `Config` if a value is invalid.
    pub fn build(self) -> ParityResult<HarnessConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.port, 5173);
        assert!(config.reuse_existing_server);
        assert_eq!(config.fixtures_dir, PathBuf::from("fixtures"));
        assert_eq!(config.base_url(), "http://127.0.0.1:5173");
        assert!(config.uses_local_server());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(HarnessConfig::from_yaml_str("").unwrap(), HarnessConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = HarnessConfig::from_yaml_str(
            "port: 4000\nreuse_existing_server: false\nexpect_timeout_ms: 2000\n",
        )
        .unwrap();
        assert_eq!(config.port, 4000);
        assert!(!config.reuse_existing_server);
        assert_eq!(config.retry().timeout, Duration::from_millis(2000));
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = HarnessConfig::from_yaml_str("prot: 4000\n").unwrap_err();
        assert!(matches!(err, ParityError::Yaml(_)));
    }

    #[test]
    fn test_validation() {
        let err = HarnessConfig::builder().poll_interval_ms(0).build().unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));

        let err = HarnessConfig::builder()
            .expect_timeout_ms(10)
            .poll_interval_ms(50)
            .build()
            .unwrap_err();
        assert!(matches!(err, ParityError::Config { .. }));

        let err = HarnessConfig::builder().base_url("localhost:3000").build().unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn test_base_url_override() {
        let config = HarnessConfig::builder()
            .base_url("https://staging.example.com")
            .build()
            .unwrap();
        assert!(!config.uses_local_server());
        assert_eq!(config.session_options().base_url, "https://staging.example.com");
    }

    #[test]
    fn test_browser_config_mapping() {
        let config = HarnessConfig::builder()
            .headless(false)
            .sandbox(false)
            .chromium_path("/opt/chromium")
            .build()
            .unwrap();
        let browser = config.browser_config();
        assert!(!browser.headless);
        assert!(!browser.sandbox);
        assert_eq!(browser.chromium_path.as_deref(), Some("/opt/chromium"));
    }

    #[test]
    fn test_file_round_trip_and_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::builder().port(6000).jobs(2).build().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), config.to_yaml().unwrap()).unwrap();

        let found = HarnessConfig::discover(None, dir.path()).unwrap();
        assert_eq!(found, config);

        let empty = tempfile::tempdir().unwrap();
        assert_eq!(
            HarnessConfig::discover(None, empty.path()).unwrap(),
            HarnessConfig::default()
        );
    }
}
