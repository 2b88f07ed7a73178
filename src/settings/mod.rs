//! Settings come from a TOML file (see `settings/dev.toml`) plus environment
//! overrides; `Cli` carries the command line.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
