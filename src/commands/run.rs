//! # Run Command Implementation
//!
//! The `run` subcommand performs a full update: for every selected project it
//! discovers new versions, builds them oldest first, records each success in
//! the project's ledger, and merges the new archives into the project's
//! doc-set before moving on to the next project.
//!
//! The exit status is non-zero when any project or doc-set failed fatally.
//! Individual build failures are reported but do not fail the run; the
//! version is attempted again next time.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use docset_updater::config::DEFAULT_CONFIG_FILE;
use docset_updater::output::{OutputConfig, Status};
use docset_updater::updater::{self, ProjectStatus, RunOptions};

/// Build new versions and merge them into the doc-sets
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE", env = "DOCSET_UPDATER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Only update the named project. May be repeated.
    #[arg(short, long = "project", value_name = "NAME")]
    pub projects: Vec<String>,
}

/// Execute the `run` command.
pub fn execute(args: RunArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = super::load_config(&args.config, &args.projects)?;

    let report = updater::run(&config, &RunOptions::default());

    println!("\nSummary:");
    for outcome in &report.projects {
        match &outcome.status {
            ProjectStatus::Ran(run) => {
                let status = if run.aborted.is_some() {
                    Status::Error
                } else if run.failures.is_empty() {
                    Status::Ok
                } else {
                    Status::Warn
                };
                println!(
                    "{} {}: {} built, {} failed",
                    out.marker(status),
                    outcome.project,
                    run.built.len(),
                    run.failures.len()
                );
                for (version, artifact) in &run.built {
                    println!("     + {} ({})", version, artifact.display());
                }
                for failure in &run.failures {
                    println!("     - {}", failure.summary());
                }
                if let Some(e) = &run.aborted {
                    println!("     ! {}", e);
                }
            }
            ProjectStatus::Failed(e) => {
                println!("{} {}: {}", out.marker(Status::Error), outcome.project, e);
            }
            ProjectStatus::Checked(_) => {}
        }
    }

    for merge in &report.merges {
        match &merge.result {
            Ok(merged) => {
                let current = merged
                    .current
                    .as_ref()
                    .map(|v| format!(", current is now {}", v))
                    .unwrap_or_default();
                let status = if merged.failed.is_empty() {
                    Status::Ok
                } else {
                    Status::Error
                };
                println!(
                    "{} {} <- {}: {} added{}",
                    out.marker(status),
                    merge.docset,
                    merge.project,
                    merged.added.len(),
                    current
                );
                for (version, reason) in &merged.failed {
                    println!("     ! {}: {}", version, reason);
                }
            }
            Err(e) => {
                println!(
                    "{} {} <- {}: {}",
                    out.marker(Status::Error),
                    merge.docset,
                    merge.project,
                    e
                );
            }
        }
    }

    if !report.is_success() {
        bail!("Update finished with errors");
    }
    Ok(())
}
