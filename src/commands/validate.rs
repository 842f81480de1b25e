//! # Validate Command Implementation
//!
//! The `validate` subcommand loads and resolves the configuration and checks
//! that every project's ledger exists and parses. It touches no network and
//! writes nothing, so it is safe to run before a first `run`.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use docset_updater::config::DEFAULT_CONFIG_FILE;
use docset_updater::output::{OutputConfig, Status};
use docset_updater::updater;

/// Validate the configuration file and ledgers
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the configuration file to validate.
    #[arg(short, long, value_name = "FILE", env = "DOCSET_UPDATER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!("Validating configuration: {}", args.config.display());

    let config = super::load_config(&args.config, &[])?;
    println!(
        "{} {} project(s), {} docset(s)",
        out.marker(Status::Ok),
        config.sources.len(),
        config.docsets.len()
    );

    let problems = updater::validate(&config);
    for problem in &problems {
        println!("{} {}", out.marker(Status::Error), problem);
    }

    if !problems.is_empty() {
        bail!("Validation failed with {} problem(s)", problems.len());
    }
    println!("{} Configuration is valid", out.marker(Status::Ok));
    Ok(())
}
