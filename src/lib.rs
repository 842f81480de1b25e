//! # Docset Updater Library
//!
//! This library keeps offline documentation sets current with upstream
//! releases. For each tracked project it discovers released versions in the
//! project's Git repository, runs an external build step for every version not
//! yet processed, and merges the resulting archives into a shared doc-set
//! whose `docset.json` manifest lists every version and marks the current one.
//!
//! It powers the `docset-updater` command-line tool.
//!
//! ## Quick Example
//!
//! ```
//! use docset_updater::version::Version;
//!
//! let mut versions: Vec<Version> = ["1.10.0", "1.2.0", "1.2.0rc1", "1.2.0.post1"]
//!     .iter()
//!     .map(|raw| raw.parse().unwrap())
//!     .collect();
//! versions.sort();
//!
//! let raws: Vec<_> = versions.iter().map(Version::raw).collect();
//! assert_eq!(raws, ["1.2.0rc1", "1.2.0", "1.2.0.post1", "1.10.0"]);
//! assert!(versions[1].is_stable());
//! ```
//!
//! ## Core Concepts
//!
//! - **Versions (`version`)**: PEP 440-style parsing and total ordering, with
//!   stability classification.
//! - **Source repositories (`repository`, `git`)**: initialize or open a local
//!   clone, fetch, list tags, read files at the remote head.
//! - **Ledger (`ledger`)**: the durable per-project record of versions already
//!   built, which makes runs idempotent and resumable.
//! - **Builds (`build`)**: render and run the per-version build command.
//! - **Pipeline (`pipeline`)**: discovery, candidate selection and building for
//!   one project.
//! - **Doc-sets (`docset`)**: merge archives into the shared manifest and
//!   maintain the current-version pointer.
//! - **Composition (`config`, `updater`)**: resolve the YAML configuration and
//!   run every project with per-project failure isolation.

pub mod build;
pub mod config;
pub mod docset;
pub mod error;
pub mod git;
pub mod ledger;
pub mod output;
pub mod persist;
pub mod pipeline;
pub mod repository;
pub mod updater;
pub mod version;

#[cfg(test)]
mod version_proptest;
