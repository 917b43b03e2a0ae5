//! `tracing` subscriber setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{ColorChoice, Verbosity};

/// Filter from `RUST_LOG`, else from the verbosity flags
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()))
}

/// Install the global subscriber, writing to stderr.
///
/// Later calls are ignored.
pub fn init(verbosity: Verbosity, color: ColorChoice) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(color.should_color())
        .with_target(verbosity == Verbosity::Debug);

    let _ = tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(layer)
        .try_init();
}
