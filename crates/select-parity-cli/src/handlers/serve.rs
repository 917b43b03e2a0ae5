//! Serve command: the fixture pages in the foreground

use std::path::Path;

use select_parity::HarnessConfig;

use crate::commands::ServeArgs;
use crate::error::CliResult;
use crate::fixture_server::{FixtureServer, FixtureServerConfig};
use crate::handlers::setup::{resolve_harness, run_build_command};
use crate::output::ProgressReporter;

/// Server settings for the serve command
pub fn serve_config(args: &ServeArgs, cwd: &Path) -> CliResult<(HarnessConfig, FixtureServerConfig)> {
    let harness = resolve_harness(&args.harness, cwd)?;
    let mut server = FixtureServerConfig::from_harness(&harness);
    if let Some(host) = &args.host {
        server.host.clone_from(host);
    }
    Ok((harness, server))
}

/// Execute the serve command
pub async fn execute_serve(args: &ServeArgs, cwd: &Path, reporter: &ProgressReporter) -> CliResult<()> {
    let (harness, config) = serve_config(args, cwd)?;
    if args.build {
        if let Some(command) = &harness.build_command {
            run_build_command(command).await?;
        } else {
            reporter.warning("--build given but no build_command is configured");
        }
    }

    let server = FixtureServer::new(config);
    server.check_fixtures()?;
    reporter.info(&format!(
        "Serving {} at http://{}:{} (Ctrl+C to stop)",
        server.config().directory.display(),
        server.config().host,
        server.config().port
    ));
    reporter.info("  /plain   native select");
    reporter.info("  /shadcn  composite combobox");
    server.run().await
}
