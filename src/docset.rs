//! # Doc-Set Merging
//!
//! Built archives end up in a shared documentation-set repository laid out
//! like Dash user contributions:
//!
//! ```text
//! <doc-set root>/
//!   docset.json                     manifest
//!   Vault.tgz                       current (default) version
//!   versions/
//!     1.4.2/Vault.tgz
//!     1.5.0/Vault.tgz
//! ```
//!
//! The manifest lists every stored version under `specific_versions` (newest
//! first) and names the current one under `version`:
//!
//! ```json
//! {
//!   "name": "Vault",
//!   "version": "1.5.0",
//!   "specific_versions": [
//!     { "version": "1.5.0", "archive": "versions/1.5.0/Vault.tgz" },
//!     { "version": "1.4.2", "archive": "versions/1.4.2/Vault.tgz" }
//!   ]
//! }
//! ```
//!
//! Fields this module does not manage (`name`, `author`, `aliases`, ...) are
//! carried through every rewrite untouched.
//!
//! ## Current version
//!
//! After merging, the current pointer moves to the latest *stable* entry. When
//! that entry was built in this run its fresh artifact is copied to the root.
//! When it was built in an earlier run, its stored archive under `versions/`
//! is copied instead, provided it exists. The pointer never names a version
//! that is missing from `specific_versions` or is not stable.

use std::cmp::Reverse;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::persist;
use crate::version::Version;

/// File name of the manifest inside a doc-set root.
pub const MANIFEST_FILE_NAME: &str = "docset.json";

/// Directory, relative to the doc-set root, holding per-version archives.
pub const VERSIONS_DIR: &str = "versions";

/// One stored version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub version: String,
    /// Archive path relative to the doc-set root.
    pub archive: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManifestEntry {
    fn parsed_version(&self) -> Option<Version> {
        Version::parse(&self.version).ok()
    }
}

/// The doc-set manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Current (default) version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub specific_versions: Vec<ManifestEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Entry whose version equals `version` by ordering key.
    pub fn entry(&self, version: &Version) -> Option<&ManifestEntry> {
        self.specific_versions
            .iter()
            .find(|entry| entry.parsed_version().as_ref() == Some(version))
    }

    /// Sorts entries newest first. Entries that are not versions keep their
    /// relative order at the end.
    fn sort_descending(&mut self) {
        self.specific_versions
            .sort_by_cached_key(|entry| Reverse(entry.parsed_version()));
    }

    /// Latest stable entry, if any.
    fn latest_stable(&self) -> Option<(Version, &ManifestEntry)> {
        self.specific_versions
            .iter()
            .filter_map(|entry| entry.parsed_version().map(|v| (v, entry)))
            .filter(|(version, _)| version.is_stable())
            .max_by(|a, b| a.0.cmp(&b.0))
    }
}

/// Summary of one [`DocsetMerger::add_versions`] call.
#[derive(Debug, Default, PartialEq)]
pub struct MergeReport {
    /// Versions that got a new manifest entry.
    pub added: Vec<Version>,
    /// Versions that were already listed.
    pub already_present: Vec<Version>,
    /// Versions whose archive could not be stored, with the reason.
    pub failed: Vec<(Version, String)>,
    /// New current version, when the pointer moved.
    pub current: Option<Version>,
}

/// Merges one project's archives into one doc-set.
#[derive(Debug, Clone)]
pub struct DocsetMerger {
    name: String,
    root: PathBuf,
    archive_file_name: String,
}

impl DocsetMerger {
    pub fn new(name: impl Into<String>, root: PathBuf, archive_file_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root,
            archive_file_name: archive_file_name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    /// Archive path of `version`, relative to the doc-set root.
    pub fn relative_archive_path(&self, version: &Version) -> String {
        format!("{}/{}/{}", VERSIONS_DIR, version.raw(), self.archive_file_name)
    }

    /// Reads the manifest. A doc-set without one starts empty; one that
    /// exists but cannot be read or parsed is [`Error::ManifestCorruption`].
    pub fn load_manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No manifest at {}, starting a new one", path.display());
                return Ok(Manifest::default());
            }
            Err(e) => {
                return Err(Error::ManifestCorruption {
                    path,
                    message: e.to_string(),
                });
            }
        };

        serde_json::from_str(&content).map_err(|e| Error::ManifestCorruption {
            path,
            message: e.to_string(),
        })
    }

    fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        let mut json = serde_json::to_string_pretty(manifest)?;
        json.push('\n');
        persist::atomic_write(&self.manifest_path(), json.as_bytes())
    }

    /// Stores `artifact` under `versions/<version>/` and lists it in the
    /// manifest. Returns `false` when the version was already listed, in
    /// which case the archive the existing entry points at is refreshed and
    /// the manifest is left as it was.
    pub fn add_version(&self, version: &Version, artifact: &Path) -> Result<bool> {
        let mut manifest = self.load_manifest()?;
        if let Some(entry) = manifest.entry(version) {
            persist::atomic_copy(artifact, &self.root.join(&entry.archive))?;
            debug!("{}: {} already listed as {}", self.name, version, entry.version);
            return Ok(false);
        }

        let relative = self.relative_archive_path(version);
        persist::atomic_copy(artifact, &self.root.join(&relative))?;

        manifest.specific_versions.push(ManifestEntry {
            version: version.raw().to_string(),
            archive: relative,
            extra: Map::new(),
        });
        manifest.sort_descending();
        self.save_manifest(&manifest)?;

        info!("{}: added {}", self.name, version);
        Ok(true)
    }

    /// Moves the current pointer to the latest stable listed version.
    ///
    /// `updated` holds the archives built in this run. Returns the new
    /// current version when the pointer moved.
    pub fn update_current(&self, updated: &[(Version, PathBuf)]) -> Result<Option<Version>> {
        let mut manifest = self.load_manifest()?;

        let Some((latest, entry)) = manifest.latest_stable() else {
            debug!("{}: no stable version listed, current left as is", self.name);
            return Ok(None);
        };
        let latest_raw = entry.version.clone();
        let stored_archive = self.root.join(&entry.archive);

        let source = if let Some((_, artifact)) = updated.iter().find(|(v, _)| *v == latest) {
            artifact.clone()
        } else {
            let already_current = manifest
                .version
                .as_deref()
                .and_then(|raw| Version::parse(raw).ok())
                .is_some_and(|current| current == latest);
            if already_current {
                return Ok(None);
            }
            if !stored_archive.is_file() {
                warn!(
                    "{}: latest stable {} has no archive at {}, current left as is",
                    self.name,
                    latest,
                    stored_archive.display()
                );
                return Ok(None);
            }
            stored_archive
        };

        persist::atomic_copy(&source, &self.root.join(&self.archive_file_name))?;
        manifest.version = Some(latest_raw);
        self.save_manifest(&manifest)?;

        info!("{}: current version is now {}", self.name, latest);
        Ok(Some(latest))
    }

    /// Adds every built archive, then updates the current pointer once.
    ///
    /// A version whose archive cannot be stored is reported in
    /// [`MergeReport::failed`] and the rest of the batch still merges. A
    /// corrupt manifest aborts the whole batch.
    pub fn add_versions(&self, versions: &[(Version, PathBuf)]) -> Result<MergeReport> {
        let mut report = MergeReport::default();
        let mut stored = Vec::with_capacity(versions.len());

        for (version, artifact) in versions {
            match self.add_version(version, artifact) {
                Ok(true) => report.added.push(version.clone()),
                Ok(false) => report.already_present.push(version.clone()),
                Err(e @ Error::ManifestCorruption { .. }) => return Err(e),
                Err(e) => {
                    warn!("{}: could not merge {}: {}", self.name, version, e);
                    report.failed.push((version.clone(), e.to_string()));
                    continue;
                }
            }
            stored.push((version.clone(), artifact.clone()));
        }

        report.current = self.update_current(&stored)?;
        Ok(report)
    }
}
