//! # Docset Updater CLI
//!
//! This is the binary entry point for the `docset-updater` command-line tool.
//!
//! It parses arguments with `clap`, initializes logging, and dispatches to the
//! command implementations. All update logic lives in the `docset_updater`
//! library; the binary only formats results and sets the exit status.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
