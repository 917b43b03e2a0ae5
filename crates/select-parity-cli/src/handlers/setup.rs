//! Shared setup: config resolution, fixture server and driver selection

use std::path::Path;
use std::sync::Arc;

use select_parity::{FaultSpec, HarnessConfig, MockBrowser, SessionFactory};

use crate::commands::{DriverArg, HarnessArgs};
use crate::error::{CliError, CliResult};
use crate::fixture_server::{is_listening, FixtureServer, FixtureServerConfig, RunningServer};

/// Load `parity.yaml` (or `--config`) and apply flag overrides
pub fn resolve_harness(args: &HarnessArgs, cwd: &Path) -> CliResult<HarnessConfig> {
    let mut config = HarnessConfig::discover(args.config.as_deref(), cwd)?;
    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

/// Flags win over file values
pub fn apply_overrides(config: &mut HarnessConfig, args: &HarnessArgs) {
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(url) = &args.base_url {
        config.base_url = Some(url.clone());
    }
    if let Some(dir) = &args.fixtures_dir {
        config.fixtures_dir = dir.clone();
    }
    if let Some(path) = &args.chromium_path {
        config.chromium_path = Some(path.clone());
    }
    if args.headed {
        config.headless = false;
    }
    if args.no_sandbox {
        config.sandbox = false;
    }
}

/// Run the configured build command through the shell
pub async fn run_build_command(command: &str) -> CliResult<()> {
    tracing::info!(%command, "running build command");
    let status = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .await
        .map_err(|e| CliError::build(format!("{command}: {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(CliError::build(format!("{command}: {status}")))
    }
}

/// Where the fixtures come from for one run
#[derive(Debug)]
pub enum FixtureOrigin {
    /// No server needed (mock driver)
    Unused,
    /// An external origin (`base_url`)
    External,
    /// A server already listening on the configured port
    Reused,
    /// A server this process started
    Started(RunningServer),
}

impl FixtureOrigin {
    /// Stop the server if this process owns it
    pub fn shutdown(self) {
        if let Self::Started(server) = self {
            server.shutdown();
        }
    }
}

/// Make the fixtures reachable at `config.base_url()`.
///
/// The build command only runs when a fresh server is started.
pub async fn prepare_fixtures(config: &HarnessConfig, reuse: bool) -> CliResult<FixtureOrigin> {
    if !config.uses_local_server() {
        tracing::info!(base_url = %config.base_url(), "using external origin");
        return Ok(FixtureOrigin::External);
    }
    if reuse && config.reuse_existing_server && is_listening(&config.host, config.port).await {
        tracing::info!(port = config.port, "reusing running fixture server");
        return Ok(FixtureOrigin::Reused);
    }
    if let Some(command) = &config.build_command {
        run_build_command(command).await?;
    }
    let server = FixtureServer::new(FixtureServerConfig::from_harness(config));
    server.check_fixtures()?;
    Ok(FixtureOrigin::Started(server.spawn().await?))
}

/// Build the session factory for the chosen driver
pub async fn open_factory(
    driver: DriverArg,
    config: &HarnessConfig,
    faults: &[FaultSpec],
) -> CliResult<Arc<dyn SessionFactory>> {
    match driver {
        DriverArg::Mock => Ok(Arc::new(
            MockBrowser::new().with_faults(faults.iter().copied()),
        )),
        DriverArg::Chromium => {
            if !faults.is_empty() {
                return Err(CliError::invalid_argument(
                    "--inject-fault requires --driver mock",
                ));
            }
            launch_chromium(config).await
        }
    }
}

#[cfg(feature = "browser")]
async fn launch_chromium(config: &HarnessConfig) -> CliResult<Arc<dyn SessionFactory>> {
    let factory = select_parity::CdpSessionFactory::launch(config.browser_config()).await?;
    Ok(Arc::new(factory))
}

#[cfg(not(feature = "browser"))]
async fn launch_chromium(_config: &HarnessConfig) -> CliResult<Arc<dyn SessionFactory>> {
    Err(CliError::config(
        "built without the `browser` feature; use --driver mock or rebuild with --features browser",
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use select_parity::{Fault, Variant};
    use tempfile::TempDir;

    #[test]
    fn test_overrides_win_over_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("parity.yaml"),
            "port: 4000\nheadless: true\nfixtures_dir: site\n",
        )
        .unwrap();

        let args = HarnessArgs {
            port: Some(4100),
            headed: true,
            ..HarnessArgs::default()
        };
        let config = resolve_harness(&args, dir.path()).unwrap();
        assert_eq!(config.port, 4100);
        assert!(!config.headless);
        assert_eq!(config.fixtures_dir, Path::new("site"));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let dir = TempDir::new().unwrap();
        let args = HarnessArgs {
            base_url: Some("localhost:5173".to_string()),
            ..HarnessArgs::default()
        };
        let err = resolve_harness(&args, dir.path()).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[tokio::test]
    async fn test_external_origin_skips_server() {
        let config = HarnessConfig::builder()
            .base_url("http://example.test")
            .build()
            .unwrap();
        let origin = prepare_fixtures(&config, true).await.unwrap();
        assert!(matches!(origin, FixtureOrigin::External));
    }

    #[tokio::test]
    async fn test_incomplete_fixtures_fail_before_serving() {
        let dir = TempDir::new().unwrap();
        let config = HarnessConfig::builder()
            .fixtures_dir(dir.path())
            .port(1)
            .reuse_existing_server(false)
            .build()
            .unwrap();
        let err = prepare_fixtures(&config, true).await.unwrap_err();
        assert!(err.to_string().contains("plain.html"));
    }

    #[tokio::test]
    async fn test_failing_build_command() {
        let err = run_build_command("exit 3").await.unwrap_err();
        assert!(matches!(err, CliError::Build { .. }));
    }

    #[tokio::test]
    async fn test_faults_need_mock_driver() {
        let config = HarnessConfig::default();
        let faults = [FaultSpec::new(Variant::Composite, Fault::ValueDesync)];
        let err = open_factory(DriverArg::Chromium, &config, &faults)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("--driver mock"));

        let factory = open_factory(DriverArg::Mock, &config, &faults).await.unwrap();
        assert_eq!(factory.name(), "mock");
    }
}
