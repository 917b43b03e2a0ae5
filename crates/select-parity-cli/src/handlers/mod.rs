//! Command handlers, one module per subcommand

pub mod inspect;
pub mod list;
pub mod run;
pub mod serve;
pub mod setup;

pub use inspect::{execute_inspect, PageInspection};
pub use list::{execute_list, render_list};
pub use run::execute_run;
pub use serve::execute_serve;
pub use setup::{prepare_fixtures, resolve_harness, FixtureOrigin};
