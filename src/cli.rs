//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::{Env, WriteStyle};

use crate::commands;

/// Docset Updater - Build and publish documentation for new upstream releases
#[derive(Parser, Debug)]
#[command(name = "docset-updater")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build every new version and merge the archives into the doc-sets
    Run(commands::run::RunArgs),

    /// List the versions each project would build, without building
    Check(commands::check::CheckArgs),

    /// Validate the configuration and ledgers without network access
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    fn init_logging(&self) {
        let write_style = match self.color.to_lowercase().as_str() {
            "always" => WriteStyle::Always,
            "never" => WriteStyle::Never,
            _ => WriteStyle::Auto,
        };
        env_logger::Builder::from_env(Env::default().default_filter_or(self.log_level.as_str()))
            .write_style(write_style)
            .format_timestamp_secs()
            .init();
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logging();

        match self.command {
            Commands::Run(args) => commands::run::execute(args, &self.color),
            Commands::Check(args) => commands::check::execute(args, &self.color),
            Commands::Validate(args) => commands::validate::execute(args, &self.color),
        }
    }
}
