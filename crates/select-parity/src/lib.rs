//! select-parity: one behavioral contract, two DOM shapes.
//!
//! Drives a "favorite fruit" selector implemented twice, as a native
//! `<select>` at `/plain` and as an ARIA combobox widget at `/shadcn`, and
//! proves both behave identically to a user and to assistive technology.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────────┐   ┌─────────────────┐   ┌──────────────┐
//! │ Scenario      │──►│ Selector     │──►│ Session         │──►│ PageDriver   │
//! │ catalog       │   │ Adapter      │   │ (expect, wait,  │   │ (chromium or │
//! │ (written once)│   │ native/comp. │   │  actionability) │   │  mock DOM)   │
//! └───────────────┘   └──────────────┘   └─────────────────┘   └──────────────┘
//!         ▲
//!         │ every (fixture, scenario) pair, own page
//! ┌───────┴───────┐   ┌──────────────┐
//! │ ParityRunner  │──►│ ParityReport │──► text, matrix, JUnit, JSON
//! └───────────────┘   └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use select_parity::{HarnessConfig, MockBrowser, ParityRunner};
//!
//! # async fn run() {
//! let config = HarnessConfig::default();
//! let report = ParityRunner::new(Arc::new(MockBrowser::new()), config.session_options())
//!     .run()
//!     .await;
//! println!("{}", report.render_matrix());
//! # }
//! ```

#![warn(missing_docs)]

pub mod adapter;
pub mod browser;
pub mod catalog;
pub mod config;
pub mod driver;
pub mod expect;
pub mod fixture;
pub mod locator;
pub mod mock;
pub mod reporter;
mod result;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod wait;

pub use adapter::{adapter_for, CompositeSelectAdapter, NativeSelectAdapter, SelectorAdapter};
pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{CdpPageDriver, CdpSessionFactory};
pub use catalog::{fruit_options, OptionMismatch, OptionRecord};
pub use config::{HarnessConfig, HarnessConfigBuilder, CONFIG_FILE_NAME, DEFAULT_PORT};
pub use driver::{ElementSnapshot, Key, PageDriver, SessionFactory};
pub use expect::{expect, expect_selected, Expect, Expectation};
pub use fixture::{default_fixtures, FixtureDescriptor, Variant};
pub use locator::{Locator, Selector};
pub use mock::{Fault, FaultSpec, MockBrowser};
pub use reporter::{
    FailureDetail, FailureMode, MatrixRow, ParityReport, RunnerState, ScenarioResult, TestStatus,
};
pub use result::{ParityError, ParityResult};
pub use runner::{ParityRunner, ProgressFn, RunnerOptions};
pub use scenario::{catalog, Applicability, Scenario, ScenarioContext};
pub use session::{Session, SessionOptions};
pub use wait::{poll_until, PollOutcome, Probe, RetryConfig};

/// Prelude for writing scenarios and driving runs
pub mod prelude {
    pub use super::{
        adapter_for, expect, HarnessConfig, Locator, MockBrowser, ParityError, ParityReport,
        ParityResult, ParityRunner, ScenarioContext, SelectorAdapter, Session, SessionOptions,
        Variant,
    };
}
