//! # Run Composition
//!
//! [`run`] is the single place where configuration turns into components. For
//! every selected project it opens the ledger, wires a [`GitRepository`] and a
//! [`BuildOrchestrator`] into an [`UpdatePipeline`], and runs it. As soon as a
//! project finishes, its archives are merged into the doc-set it feeds, so a
//! later project's build already sees them.
//!
//! A failure in one project or one doc-set merge is logged and recorded in the
//! [`RunReport`]; the remaining projects still run.

use log::{debug, error, info, warn};

use crate::build::BuildOrchestrator;
use crate::config::{Config, Source};
use crate::docset::{DocsetMerger, MergeReport};
use crate::error::{Error, Result};
use crate::ledger::ProcessedVersionLedger;
use crate::pipeline::{PipelineReport, Selection, UpdatePipeline};
use crate::repository::GitRepository;

/// Options for one invocation of [`run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Discover candidates only: no builds, no ledger or manifest writes.
    pub dry_run: bool,
}

/// What happened to one project.
#[derive(Debug)]
pub enum ProjectStatus {
    /// Dry run: the versions that would be built.
    Checked(Selection),
    /// Pipeline ran; see [`PipelineReport::aborted`] for early stops.
    Ran(PipelineReport),
    /// The project could not run at all.
    Failed(Error),
}

#[derive(Debug)]
pub struct ProjectOutcome {
    pub project: String,
    pub status: ProjectStatus,
}

impl ProjectOutcome {
    /// True when the project failed or stopped early.
    pub fn is_fatal(&self) -> bool {
        match &self.status {
            ProjectStatus::Checked(_) => false,
            ProjectStatus::Ran(report) => report.aborted.is_some(),
            ProjectStatus::Failed(_) => true,
        }
    }
}

/// Result of merging one project's archives into its doc-set.
#[derive(Debug)]
pub struct MergeOutcome {
    pub docset: String,
    pub project: String,
    pub result: Result<MergeReport>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub projects: Vec<ProjectOutcome>,
    pub merges: Vec<MergeOutcome>,
}

impl RunReport {
    /// True when no project or doc-set failed and every built archive was
    /// merged. Individual build failures do not count.
    pub fn is_success(&self) -> bool {
        !self.projects.iter().any(ProjectOutcome::is_fatal)
            && self
                .merges
                .iter()
                .all(|m| m.result.as_ref().is_ok_and(|merge| merge.failed.is_empty()))
    }

    /// Number of builds that exited unsuccessfully.
    pub fn build_failures(&self) -> usize {
        self.projects
            .iter()
            .map(|p| match &p.status {
                ProjectStatus::Ran(report) => report.failures.len(),
                _ => 0,
            })
            .sum()
    }
}

fn pipeline_for(source: &Source) -> Result<UpdatePipeline<GitRepository, ProcessedVersionLedger, BuildOrchestrator>> {
    let ledger = ProcessedVersionLedger::load(&source.identifier, &source.ledger_path)?;
    let repository = GitRepository::new(
        source.clone_path.clone(),
        source.remote_url.clone(),
        source.ssh_username.clone(),
    );
    Ok(UpdatePipeline::new(
        source.identifier.clone(),
        source.discovery.clone(),
        source.version_policy(),
        repository,
        ledger,
        BuildOrchestrator::new(source.build_spec()),
    ))
}

fn run_project(source: &Source, options: &RunOptions) -> ProjectStatus {
    let result = pipeline_for(source).and_then(|mut pipeline| {
        if options.dry_run {
            pipeline.candidates().map(ProjectStatus::Checked)
        } else {
            pipeline.run().map(ProjectStatus::Ran)
        }
    });

    match result {
        Ok(status) => {
            if let ProjectStatus::Ran(report) = &status {
                info!(
                    "{}: built {}, failed {}",
                    source.identifier,
                    report.built.len(),
                    report.failures.len()
                );
                for failure in &report.failures {
                    warn!("{}: {}", source.identifier, failure.summary());
                }
                if let Some(e) = &report.aborted {
                    error!("{}: {}", source.identifier, e);
                }
            }
            status
        }
        Err(e) => {
            error!("{}: {}", source.identifier, e);
            ProjectStatus::Failed(e)
        }
    }
}

fn merge_project(config: &Config, source: &Source, report: &PipelineReport) -> Option<MergeOutcome> {
    let name = source.doc_set.as_deref()?;
    let Some(docset) = config.docset(name) else {
        warn!("{}: doc-set '{}' is not configured", source.identifier, name);
        return None;
    };

    let merger = DocsetMerger::new(&docset.name, docset.root_path.clone(), &source.archive_file_name);
    let result = merger.add_versions(&report.built);
    match &result {
        Ok(merge) => {
            info!(
                "{}: merged {} new version(s) from {}",
                docset.name,
                merge.added.len(),
                source.identifier
            );
            for (version, reason) in &merge.failed {
                error!("{}: {} from {} not merged: {}", docset.name, version, source.identifier, reason);
            }
        }
        Err(e) => error!("{}: merge from {} failed: {}", docset.name, source.identifier, e),
    }

    Some(MergeOutcome {
        docset: docset.name.clone(),
        project: source.identifier.clone(),
        result,
    })
}

/// Runs every configured project in order, merging each one's archives into
/// its doc-set before the next project starts.
pub fn run(config: &Config, options: &RunOptions) -> RunReport {
    let mut report = RunReport::default();

    for source in &config.sources {
        info!("{}: updating", source.identifier);
        let status = run_project(source, options);

        if let ProjectStatus::Ran(pipeline_report) = &status {
            report.merges.extend(merge_project(config, source, pipeline_report));
        }

        report.projects.push(ProjectOutcome {
            project: source.identifier.clone(),
            status,
        });
    }

    report
}

/// Checks what can be checked without network access: every ledger loads.
/// Returns the problems found, empty when the configuration is usable.
pub fn validate(config: &Config) -> Vec<Error> {
    let mut problems = Vec::new();
    for source in &config.sources {
        match ProcessedVersionLedger::load(&source.identifier, &source.ledger_path) {
            Ok(ledger) => debug!(
                "{}: {} lists {} version(s)",
                source.identifier,
                ledger.path().display(),
                ledger.len()
            ),
            Err(e) => problems.push(e),
        }
        if !source.generator_root_path.is_dir() {
            warn!(
                "{}: generator root {} does not exist yet",
                source.identifier,
                source.generator_root_path.display()
            );
        }
    }
    problems
}
