//! CLI command definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use select_parity::{FaultSpec, Variant};

/// parity: prove a native select and a composite combobox behave the same
#[derive(Parser, Debug)]
#[command(name = "parity")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every scenario against every fixture and report parity
    Run(RunArgs),

    /// Serve the fixture pages in the foreground
    Serve(ServeArgs),

    /// List fixtures and scenarios
    List(ListArgs),

    /// Dump the labels and controls a fixture page renders
    Inspect(InspectArgs),
}

/// Options shared by commands that read the harness configuration
#[derive(clap::Args, Debug, Clone, Default)]
pub struct HarnessArgs {
    /// Config file (default: ./parity.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Fixture server port
    #[arg(long, env = "PARITY_PORT")]
    pub port: Option<u16>,

    /// Test an already running origin instead of the local fixtures
    #[arg(long, env = "PARITY_BASE_URL")]
    pub base_url: Option<String>,

    /// Directory holding the fixture pages
    #[arg(long)]
    pub fixtures_dir: Option<PathBuf>,

    /// Chromium executable
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub harness: HarnessArgs,

    /// Page driver
    #[arg(long, default_value = "chromium")]
    pub driver: DriverArg,

    /// Only scenarios whose name or title contains this
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Only this variant
    #[arg(long)]
    pub variant: Option<VariantArg>,

    /// Concurrent pairs (0 = available parallelism)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Stop scheduling after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Always start a fresh fixture server
    #[arg(long)]
    pub no_reuse: bool,

    /// Shell command to run before serving the fixtures
    #[arg(long)]
    pub build_command: Option<String>,

    /// Expectation timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Write JUnit XML here
    #[arg(long)]
    pub junit: Option<PathBuf>,

    /// Write the JSON report here
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Inject a mock fault, e.g. `composite:value-desync` (mock driver only)
    #[arg(long, hide = true)]
    pub inject_fault: Vec<FaultSpec>,
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub harness: HarnessArgs,

    /// Bind host
    #[arg(long)]
    pub host: Option<String>,

    /// Run the configured build command first
    #[arg(long)]
    pub build: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only scenarios whose name or title contains this
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub harness: HarnessArgs,

    /// Route to inspect, e.g. `/plain`
    #[arg(default_value = "/plain")]
    pub route: String,

    /// Page driver
    #[arg(long, default_value = "chromium")]
    pub driver: DriverArg,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Page driver choice
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriverArg {
    /// Real Chromium over CDP
    #[default]
    Chromium,
    /// In-memory DOM model of both fixtures
    Mock,
}

/// Variant choice
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantArg {
    /// Native `<select>` (`/plain`)
    #[value(alias = "plain")]
    Native,
    /// Composite combobox (`/shadcn`)
    #[value(alias = "shadcn")]
    Composite,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Native => Self::Native,
            VariantArg::Composite => Self::Composite,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
