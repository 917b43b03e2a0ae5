//! parity: native select vs. composite combobox parity harness
//!
//! ## Usage
//!
//! ```bash
//! parity run --driver mock
//! parity run --junit target/parity.xml
//! parity serve
//! ```

use std::process::ExitCode;

use clap::Parser;
use select_parity_cli::{
    handlers, logging, Cli, CliConfig, CliError, CliResult, ColorChoice, Commands,
    ProgressReporter, Verbosity,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(config.verbosity, config.color);

    let cwd = std::env::current_dir()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::config(format!("cannot start async runtime: {e}")))?;

    match cli.command {
        Commands::Run(args) => runtime.block_on(handlers::execute_run(&config, &args, &cwd)),
        Commands::Serve(args) => {
            let reporter =
                ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
            runtime.block_on(handlers::execute_serve(&args, &cwd, &reporter))
        }
        Commands::List(args) => {
            print!("{}", handlers::execute_list(&args)?);
            Ok(())
        }
        Commands::Inspect(args) => {
            let out = runtime.block_on(handlers::execute_inspect(&args, &cwd))?;
            println!("{out}");
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}
