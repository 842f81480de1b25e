//! # Check Command Implementation
//!
//! The `check` subcommand initializes and fetches every selected project's
//! clone and lists the versions a `run` would build. It never builds, and it
//! never writes a ledger or a manifest.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use docset_updater::config::DEFAULT_CONFIG_FILE;
use docset_updater::output::{OutputConfig, Status};
use docset_updater::updater::{self, ProjectStatus, RunOptions};
use docset_updater::version::Version;

/// List the versions each project would build
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE", env = "DOCSET_UPDATER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Only check the named project. May be repeated.
    #[arg(short, long = "project", value_name = "NAME")]
    pub projects: Vec<String>,
}

/// Execute the `check` command.
pub fn execute(args: CheckArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = super::load_config(&args.config, &args.projects)?;

    let report = updater::run(&config, &RunOptions { dry_run: true });

    for outcome in &report.projects {
        match &outcome.status {
            ProjectStatus::Checked(selection) if selection.candidates.is_empty() => {
                println!("{} {}: up to date", out.marker(Status::Ok), outcome.project);
            }
            ProjectStatus::Checked(selection) => {
                println!(
                    "{} {}: {}",
                    out.marker(Status::Info),
                    outcome.project,
                    selection
                        .candidates
                        .iter()
                        .map(Version::raw)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            ProjectStatus::Failed(e) => {
                println!("{} {}: {}", out.marker(Status::Error), outcome.project, e);
            }
            ProjectStatus::Ran(_) => {}
        }
    }

    if !report.is_success() {
        bail!("Check finished with errors");
    }
    Ok(())
}
