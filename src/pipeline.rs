//! # Per-Project Update Pipeline
//!
//! An [`UpdatePipeline`] brings one project's documentation up to date. It
//! combines three capabilities, each behind its own trait so that tests can
//! substitute any of them:
//!
//! - a [`TagSource`] + [`ContentSource`] for the upstream repository,
//! - a [`VersionLedger`] of versions already processed,
//! - a [`Builder`] that turns a version into an archive.
//!
//! ## Process
//!
//! 1.  **Discovery**: initialize and fetch the clone, then collect raw version
//!     strings according to the project's [`Discovery`] variant: every tag
//!     name, or the single version extracted from a tracked file.
//! 2.  **Selection**: normalize and parse each string (unparseable ones are
//!     skipped and reported), drop versions below the minimum, drop unstable
//!     versions when the project requires stability, drop versions already in
//!     the ledger, then sort ascending and remove duplicates.
//! 3.  **Build**: build candidates oldest first. A failed build is reported and
//!     the next candidate is attempted; nothing is retried.
//!
//! Building oldest first means an interrupted run resumes from the next
//! unbuilt version on the following run, and the ledger always grows as a
//! contiguous history.

use std::path::PathBuf;

use log::{debug, info, warn};
use regex::Regex;

use crate::build::{BuildFailure, BuildResult, Builder};
use crate::error::{Error, Result};
use crate::ledger::VersionLedger;
use crate::repository::{ContentSource, TagSource};
use crate::version::{TagNormalizer, Version};

/// How a project's candidate versions are discovered.
#[derive(Debug, Clone)]
pub enum Discovery {
    /// Every tag of the repository is a potential version.
    TagBased,
    /// The version is written in `file` at the remote head; `pattern`'s first
    /// capture group extracts it.
    ContentDerived { file: String, pattern: Regex },
}

/// Filters applied to discovered versions.
#[derive(Debug, Clone, Default)]
pub struct VersionPolicy {
    /// Versions below this are ignored.
    pub minimum_version: Option<Version>,
    /// When set, pre-, post- and development releases are ignored.
    pub stability_required: bool,
    /// Transform applied to each raw string before parsing.
    pub normalizer: TagNormalizer,
}

/// A discovered string that was not a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTag {
    pub tag: String,
    pub reason: String,
}

/// Versions selected for building, plus what was skipped on the way.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Ascending, unique by version.
    pub candidates: Vec<Version>,
    pub skipped: Vec<SkippedTag>,
}

/// Outcome of [`UpdatePipeline::run`].
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Successfully built versions and their archives, in build order.
    pub built: Vec<(Version, PathBuf)>,
    pub failures: Vec<BuildFailure>,
    pub skipped: Vec<SkippedTag>,
    /// Set when the run stopped early; `built` still holds what finished.
    pub aborted: Option<Error>,
}

/// Selects the versions to build from raw discovered strings.
///
/// Pure: depends only on its inputs, so the same tags and ledger always give
/// the same candidates in the same order.
pub fn select_candidates<'a, I>(raws: I, policy: &VersionPolicy, ledger: &dyn VersionLedger) -> Selection
where
    I: IntoIterator<Item = &'a str>,
{
    let mut selection = Selection::default();

    for raw in raws {
        let normalized = policy.normalizer.normalize(raw);
        let version = match Version::parse(&normalized) {
            Ok(version) => version,
            Err(e) => {
                debug!("Skipping '{}': {}", raw, e);
                selection.skipped.push(SkippedTag {
                    tag: raw.to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if policy
            .minimum_version
            .as_ref()
            .is_some_and(|minimum| &version < minimum)
        {
            continue;
        }
        if policy.stability_required && !version.is_stable() {
            continue;
        }
        if ledger.contains(&version) {
            continue;
        }

        selection.candidates.push(version);
    }

    selection
        .candidates
        .sort_by(|a, b| a.cmp(b).then_with(|| a.raw().cmp(b.raw())));
    selection.candidates.dedup();

    selection
}

/// Pulls the version string out of a tracked file's contents.
pub fn extract_version<'c>(content: &'c str, pattern: &Regex) -> Option<&'c str> {
    pattern
        .captures(content)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// The per-project pipeline.
pub struct UpdatePipeline<R, L, B> {
    project: String,
    discovery: Discovery,
    policy: VersionPolicy,
    repository: R,
    ledger: L,
    builder: B,
}

impl<R, L, B> UpdatePipeline<R, L, B>
where
    R: TagSource + ContentSource,
    L: VersionLedger,
    B: Builder,
{
    pub fn new(
        project: impl Into<String>,
        discovery: Discovery,
        policy: VersionPolicy,
        repository: R,
        ledger: L,
        builder: B,
    ) -> Self {
        Self {
            project: project.into(),
            discovery,
            policy,
            repository,
            ledger,
            builder,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Fetches upstream and returns the raw strings to consider.
    fn discover(&self) -> Result<Vec<String>> {
        self.repository.ensure_initialized()?;
        self.repository.fetch_tags()?;

        match &self.discovery {
            Discovery::TagBased => self.repository.list_tag_names(),
            Discovery::ContentDerived { file, pattern } => {
                let content = self.repository.read_head_file(file)?;
                let raw = extract_version(&content, pattern).ok_or_else(|| Error::ContentNotFound {
                    file: file.clone(),
                    revision: crate::git::REMOTE_HEAD.to_string(),
                    message: format!("pattern '{}' did not match", pattern.as_str()),
                })?;
                Ok(vec![raw.to_string()])
            }
        }
    }

    /// Discovers and selects candidates without building anything.
    pub fn candidates(&self) -> Result<Selection> {
        let raws = self.discover()?;
        let selection = select_candidates(raws.iter().map(String::as_str), &self.policy, &self.ledger);

        if !selection.skipped.is_empty() {
            info!(
                "{}: ignored {} tag(s) that are not versions",
                self.project,
                selection.skipped.len()
            );
        }
        info!(
            "{}: {} version(s) to build{}",
            self.project,
            selection.candidates.len(),
            if selection.candidates.is_empty() {
                String::new()
            } else {
                format!(
                    ": {}",
                    selection
                        .candidates
                        .iter()
                        .map(Version::raw)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        );

        Ok(selection)
    }

    /// Builds every candidate, oldest first.
    ///
    /// Returns `Err` when discovery fails (nothing was built). An error during
    /// the build loop stops the loop and is reported in
    /// [`PipelineReport::aborted`] alongside the versions that were built.
    pub fn run(&mut self) -> Result<PipelineReport> {
        let selection = self.candidates()?;
        let mut report = PipelineReport {
            skipped: selection.skipped,
            ..Default::default()
        };

        for version in selection.candidates {
            match self.builder.build(&version, &mut self.ledger) {
                Ok(BuildResult::Success { version, artifact_path, .. }) => {
                    report.built.push((version, artifact_path));
                }
                Ok(BuildResult::Failure(failure)) => {
                    report.failures.push(failure);
                }
                Err(e) => {
                    warn!("{}: stopping after {}: {}", self.project, version, e);
                    report.aborted = Some(e);
                    break;
                }
            }
        }

        Ok(report)
    }
}
