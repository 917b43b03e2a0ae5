//! Command-line front end for select-parity.
//!
//! ```bash
//! parity run                          # both fixtures, full catalog, Chromium
//! parity run --driver mock            # in-memory DOM, no browser or server
//! parity run --filter keyboard -j 4   # subset, four pairs at a time
//! parity run --junit out/parity.xml   # CI report
//! parity serve                        # fixture pages on :5173
//! parity list                         # fixtures and scenarios
//! parity inspect /shadcn              # what a route renders
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod fixture_server;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, DriverArg, HarnessArgs, InspectArgs, ListArgs, RunArgs, ServeArgs,
    VariantArg,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use fixture_server::{FixtureServer, FixtureServerConfig, RunningServer};
pub use output::ProgressReporter;
