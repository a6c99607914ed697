//! Command-line arguments of binaries that hand their suites to [`crate::cli::run`].

use crate::config::{ColorMode, OutputFormat};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "suitekit", version, about = "Runs registered test suites, selected by tag.")]
pub struct SuiteArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Run only tests carrying at least one of these tags.
    #[arg(short = 'n', long = "include", value_name = "TAG", global = true)]
    pub include: Vec<String>,

    /// Skip tests carrying any of these tags.
    #[arg(short = 'l', long = "exclude", value_name = "TAG", global = true)]
    pub exclude: Vec<String>,

    /// YAML run configuration; flags override its values.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Do not descend into nested suites.
    #[arg(long, global = true)]
    pub no_nested: bool,

    /// Run top-level suites on separate threads.
    #[arg(long, global = true)]
    pub parallel: bool,

    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    #[arg(long, value_enum, global = true)]
    pub color: Option<ColorMode>,

    /// More log output (-v, -vv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the selected tests (default).
    Run,
    /// Show every registered test and what the filter would do with it.
    List,
}
