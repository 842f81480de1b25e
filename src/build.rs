//! # Build Orchestration
//!
//! Documentation archives are produced by a project-specific shell command
//! (typically `./build.sh <version>`) run inside the project's generator root.
//! This module renders that command for one version, runs it to completion,
//! and turns the outcome into a [`BuildResult`].
//!
//! ## Contract
//!
//! - Exit status 0 means success. The archive is then expected at
//!   `generator_root/build_output_folder/<version>/archive_file_name`.
//! - Any other status (or termination by a signal) is a failure. The captured
//!   stdout, stderr and elapsed time are returned for reporting and the ledger
//!   is left untouched.
//! - On success the version is recorded in the ledger *before* the result is
//!   returned, so a version is never reported as built without being durable.
//!
//! No timeout is imposed; a hung build blocks until it is killed externally.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::error::{Error, Result};
use crate::ledger::VersionLedger;
use crate::version::Version;

/// Placeholder substituted with the version's raw name.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Substitutes the version's raw name into `template`.
///
/// A template without a `{version}` placeholder gets the raw name appended as
/// its final argument, so `./build.sh` behaves like `./build.sh {version}`.
pub fn render_command(template: &str, version: &Version) -> String {
    if template.contains(VERSION_PLACEHOLDER) {
        template.replace(VERSION_PLACEHOLDER, version.raw())
    } else {
        format!("{} {}", template.trim_end(), version.raw())
    }
}

/// Everything needed to build one project's documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    /// Working directory of the build command.
    pub generator_root: PathBuf,
    /// Shell command with an optional `{version}` placeholder.
    pub command_template: String,
    /// Folder, relative to the generator root, holding per-version output.
    pub build_output_folder: PathBuf,
    /// File name of the produced archive.
    pub archive_file_name: String,
}

impl BuildSpec {
    /// Where a successful build of `version` leaves its archive.
    pub fn artifact_path(&self, version: &Version) -> PathBuf {
        self.generator_root
            .join(&self.build_output_folder)
            .join(version.raw())
            .join(&self.archive_file_name)
    }
}

/// Captured outcome of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a rendered command - allows mocking in tests.
pub trait CommandRunner {
    fn run(&self, command: &str, working_dir: &Path) -> Result<CommandOutput>;
}

/// Runs commands through `sh -c`, blocking until they exit.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, working_dir: &Path) -> Result<CommandOutput> {
        let start = Instant::now();
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .output()
            .map_err(|source| Error::BuildSpawn {
                command: command.to_string(),
                working_dir: working_dir.to_path_buf(),
                source,
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed: start.elapsed(),
        })
    }
}

/// Diagnostics of a build that did not succeed.
#[derive(Debug, Clone)]
pub struct BuildFailure {
    pub version: Version,
    pub command: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl BuildFailure {
    /// One-line summary for reports.
    pub fn summary(&self) -> String {
        let status = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        format!(
            "{} failed after {:.1}s ({})",
            self.version,
            self.elapsed.as_secs_f64(),
            status
        )
    }
}

/// Result of building one version. Never both an artifact and diagnostics.
#[derive(Debug, Clone)]
pub enum BuildResult {
    Success {
        version: Version,
        artifact_path: PathBuf,
        elapsed: Duration,
    },
    Failure(BuildFailure),
}

/// Builds one version and records it on success.
pub trait Builder {
    fn build(&self, version: &Version, ledger: &mut dyn VersionLedger) -> Result<BuildResult>;
}

/// The default [`Builder`]: a [`BuildSpec`] run through a [`CommandRunner`].
pub struct BuildOrchestrator {
    spec: BuildSpec,
    runner: Box<dyn CommandRunner>,
}

impl BuildOrchestrator {
    pub fn new(spec: BuildSpec) -> Self {
        Self::with_runner(spec, Box::new(ShellRunner))
    }

    /// Creates an orchestrator with a custom runner, mainly for tests.
    pub fn with_runner(spec: BuildSpec, runner: Box<dyn CommandRunner>) -> Self {
        Self { spec, runner }
    }

    /// Runs the build for `version`.
    ///
    /// Returns `Err` only when the command could not be started or the ledger
    /// could not be written; a failing build is `Ok(BuildResult::Failure)`.
    pub fn execute(&self, version: &Version, ledger: &mut dyn VersionLedger) -> Result<BuildResult> {
        let command = render_command(&self.spec.command_template, version);
        info!(
            "Building {} with `{}` in {}",
            version,
            command,
            self.spec.generator_root.display()
        );

        let output = self.runner.run(&command, &self.spec.generator_root)?;

        if !output.success() {
            let failure = BuildFailure {
                version: version.clone(),
                command,
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
                elapsed: output.elapsed,
            };
            warn!("Build of {}", failure.summary());
            return Ok(BuildResult::Failure(failure));
        }

        let artifact_path = self.spec.artifact_path(version);
        if !artifact_path.is_file() {
            warn!(
                "Build of {} succeeded but {} does not exist",
                version,
                artifact_path.display()
            );
        }

        ledger.record(version)?;
        info!(
            "Built {} in {:.1}s: {}",
            version,
            output.elapsed.as_secs_f64(),
            artifact_path.display()
        );

        Ok(BuildResult::Success {
            version: version.clone(),
            artifact_path,
            elapsed: output.elapsed,
        })
    }
}

impl Builder for BuildOrchestrator {
    fn build(&self, version: &Version, ledger: &mut dyn VersionLedger) -> Result<BuildResult> {
        self.execute(version, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn v(raw: &str) -> Version {
        Version::parse(raw).unwrap()
    }

    #[derive(Default)]
    struct MemoryLedger {
        versions: BTreeSet<Version>,
        fail_writes: bool,
    }

    impl VersionLedger for MemoryLedger {
        fn contains(&self, version: &Version) -> bool {
            self.versions.contains(version)
        }

        fn record(&mut self, version: &Version) -> Result<()> {
            if self.fail_writes {
                return Err(Error::Filesystem {
                    message: "read-only".to_string(),
                });
            }
            self.versions.insert(version.clone());
            Ok(())
        }
    }

    struct FixedRunner(Option<i32>);

    impl CommandRunner for FixedRunner {
        fn run(&self, _command: &str, _working_dir: &Path) -> Result<CommandOutput> {
            Ok(CommandOutput {
                exit_code: self.0,
                stdout: "building\n".to_string(),
                stderr: "boom\n".to_string(),
                elapsed: Duration::from_millis(1500),
            })
        }
    }

    fn spec(root: &Path, template: &str) -> BuildSpec {
        BuildSpec {
            generator_root: root.to_path_buf(),
            command_template: template.to_string(),
            build_output_folder: PathBuf::from("build"),
            archive_file_name: "Vault.tgz".to_string(),
        }
    }

    #[test]
    fn test_render_command_substitutes_placeholder() {
        assert_eq!(
            render_command("source env/bin/activate && ./build.sh {version}", &v("1.9.0")),
            "source env/bin/activate && ./build.sh 1.9.0"
        );
        assert_eq!(
            render_command("make VERSION={version} OUT=build/{version}", &v("2.0")),
            "make VERSION=2.0 OUT=build/2.0"
        );
    }

    #[test]
    fn test_render_command_appends_without_placeholder() {
        assert_eq!(render_command("./build.sh ", &v("1.4.2")), "./build.sh 1.4.2");
    }

    #[test]
    fn test_artifact_path() {
        let spec = spec(Path::new("/srv/vault-dash"), "./build.sh");
        assert_eq!(
            spec.artifact_path(&v("1.4.2")),
            PathBuf::from("/srv/vault-dash/build/1.4.2/Vault.tgz")
        );
    }

    #[test]
    fn test_execute_success_records_and_returns_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator = BuildOrchestrator::new(spec(
            temp_dir.path(),
            "mkdir -p build/{version} && printf docs > build/{version}/Vault.tgz",
        ));
        let mut ledger = MemoryLedger::default();

        let result = orchestrator.execute(&v("1.4.2"), &mut ledger).unwrap();

        match result {
            BuildResult::Success { version, artifact_path, .. } => {
                assert_eq!(version, v("1.4.2"));
                assert_eq!(artifact_path, temp_dir.path().join("build/1.4.2/Vault.tgz"));
                assert_eq!(fs::read_to_string(artifact_path).unwrap(), "docs");
            }
            BuildResult::Failure(f) => panic!("unexpected failure: {}", f.summary()),
        }
        assert!(ledger.contains(&v("1.4.2")));
    }

    #[test]
    fn test_execute_failure_captures_output_and_leaves_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator = BuildOrchestrator::new(spec(
            temp_dir.path(),
            "echo progress; echo 'missing toolchain' >&2; exit 1",
        ));
        let mut ledger = MemoryLedger::default();

        let result = orchestrator.execute(&v("2.0.0"), &mut ledger).unwrap();

        match result {
            BuildResult::Failure(failure) => {
                assert_eq!(failure.exit_code, Some(1));
                assert_eq!(failure.stdout.trim(), "progress");
                assert_eq!(failure.stderr.trim(), "missing toolchain");
                assert!(failure.command.contains("exit 1"));
            }
            BuildResult::Success { .. } => panic!("expected failure"),
        }
        assert!(ledger.versions.is_empty());
    }

    #[test]
    fn test_execute_with_mock_runner_failure_summary() {
        let orchestrator = BuildOrchestrator::with_runner(
            spec(Path::new("/srv/vault-dash"), "./build.sh"),
            Box::new(FixedRunner(Some(2))),
        );
        let mut ledger = MemoryLedger::default();

        let result = orchestrator.execute(&v("1.0.0"), &mut ledger).unwrap();
        let BuildResult::Failure(failure) = result else {
            panic!("expected failure");
        };
        assert_eq!(failure.command, "./build.sh 1.0.0");
        assert_eq!(failure.summary(), "1.0.0 failed after 1.5s (exit code 2)");
    }

    #[test]
    fn test_execute_signal_is_failure() {
        let orchestrator = BuildOrchestrator::with_runner(
            spec(Path::new("/srv/vault-dash"), "./build.sh"),
            Box::new(FixedRunner(None)),
        );
        let mut ledger = MemoryLedger::default();

        let result = orchestrator.execute(&v("1.0.0"), &mut ledger).unwrap();
        let BuildResult::Failure(failure) = result else {
            panic!("expected failure");
        };
        assert!(failure.summary().contains("terminated by signal"));
        assert!(ledger.versions.is_empty());
    }

    #[test]
    fn test_execute_ledger_write_error_is_not_success() {
        let orchestrator = BuildOrchestrator::with_runner(
            spec(Path::new("/srv/vault-dash"), "./build.sh"),
            Box::new(FixedRunner(Some(0))),
        );
        let mut ledger = MemoryLedger {
            fail_writes: true,
            ..Default::default()
        };

        assert!(orchestrator.execute(&v("1.0.0"), &mut ledger).is_err());
    }

    #[test]
    fn test_execute_missing_working_dir_is_spawn_error() {
        let temp_dir = TempDir::new().unwrap();
        let orchestrator =
            BuildOrchestrator::new(spec(&temp_dir.path().join("missing"), "true"));
        let mut ledger = MemoryLedger::default();

        let err = orchestrator.execute(&v("1.0.0"), &mut ledger).unwrap_err();
        assert!(matches!(err, Error::BuildSpawn { .. }));
    }

    #[test]
    fn test_execute_warns_when_artifact_missing() {
        testing_logger::setup();
        let orchestrator = BuildOrchestrator::with_runner(
            spec(Path::new("/nonexistent/vault-dash"), "./build.sh"),
            Box::new(FixedRunner(Some(0))),
        );
        let mut ledger = MemoryLedger::default();

        let result = orchestrator.execute(&v("1.0.0"), &mut ledger).unwrap();
        assert!(matches!(result, BuildResult::Success { .. }));
        assert!(ledger.contains(&v("1.0.0")));

        testing_logger::validate(|logs| {
            assert!(logs
                .iter()
                .any(|l| l.level == log::Level::Warn && l.body.contains("does not exist")));
        });
    }
}
