//! # CLI Command Implementations
//!
//! Each subcommand of `docset-updater` lives in its own file with:
//! - an `Args` struct derived with `clap`,
//! - an `execute` function that loads the configuration, calls into the
//!   `docset_updater` library and prints a summary.

pub mod check;
pub mod run;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use docset_updater::config::{self, Config};

/// Loads the configuration and restricts it to `projects` (all when empty).
pub(crate) fn load_config(path: &Path, projects: &[String]) -> Result<Config> {
    let config = config::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok(config.select(projects)?)
}
