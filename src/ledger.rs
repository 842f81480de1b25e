//! # Processed Version Ledger
//!
//! Each project keeps a small YAML file listing every version whose
//! documentation was built successfully:
//!
//! ```yaml
//! versions:
//! - 1.0.0
//! - 1.1.0
//! ```
//!
//! The ledger is what makes runs idempotent and resumable. A version is added
//! only after its build succeeded, the whole file is rewritten immediately
//! (ascending, for reproducible diffs), and entries are never removed.
//!
//! The file must exist before the first run. An operator seeds it, usually
//! with the versions already published, so that a new project does not
//! rebuild its entire history by accident.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::persist;
use crate::version::Version;

/// Membership and recording of processed versions.
pub trait VersionLedger {
    /// True when an equal version (by ordering key) was already processed.
    fn contains(&self, version: &Version) -> bool;

    /// Durably records `version`. Once this returns `Ok`, the version
    /// survives a crash of the process.
    fn record(&mut self, version: &Version) -> Result<()>;
}

/// On-disk shape of the ledger file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    versions: Vec<String>,
}

/// A ledger backed by a YAML file.
#[derive(Debug)]
pub struct ProcessedVersionLedger {
    path: PathBuf,
    versions: BTreeSet<Version>,
}

impl ProcessedVersionLedger {
    /// Loads the ledger of `project` from `path`.
    ///
    /// A missing file is [`Error::LedgerMissing`]. An entry that is not a
    /// version is [`Error::VersionParse`]: the file is operator-maintained, so
    /// a bad entry is a configuration mistake rather than something to skip.
    pub fn load(project: &str, path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::LedgerMissing {
                    project: project.to_string(),
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(Error::filesystem("read ledger", path, e)),
        };

        let file: LedgerFile = if content.trim().is_empty() {
            LedgerFile::default()
        } else {
            serde_yaml::from_str(&content)?
        };

        let versions = file
            .versions
            .iter()
            .map(|raw| Version::parse(raw))
            .collect::<Result<BTreeSet<_>>>()?;

        debug!(
            "Loaded {} processed version(s) for {} from {}",
            versions.len(),
            project,
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            versions,
        })
    }

    /// Recorded versions, ascending.
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Location of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        let file = LedgerFile {
            versions: self.versions.iter().map(|v| v.raw().to_string()).collect(),
        };
        let yaml = serde_yaml::to_string(&file)?;
        persist::atomic_write(&self.path, yaml.as_bytes())
    }
}

impl VersionLedger for ProcessedVersionLedger {
    fn contains(&self, version: &Version) -> bool {
        self.versions.contains(version)
    }

    fn record(&mut self, version: &Version) -> Result<()> {
        if !self.versions.insert(version.clone()) {
            return Ok(());
        }
        if let Err(e) = self.persist() {
            // Keep memory in line with disk so a retry rewrites it.
            self.versions.remove(version);
            return Err(e);
        }
        Ok(())
    }
}
