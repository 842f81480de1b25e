//! # Error Handling
//!
//! This module defines the centralized error type for the `docset-updater`
//! library. It uses `thiserror` to describe every anticipated failure mode with
//! enough context to report it without a backtrace.
//!
//! ## Scope of Failures
//!
//! Errors are grouped by how far their effect reaches during a run:
//!
//! - **Single candidate**: `VersionParse`. A tag that is not a version is
//!   skipped and the run continues.
//! - **One project**: `LedgerMissing`, `GitClone`, `GitCommand`,
//!   `ContentNotFound`, `BuildSpawn`. The affected project is abandoned for
//!   this run; other projects still run.
//! - **One doc-set**: `ManifestCorruption`. The merge step for that doc-set is
//!   abandoned.
//! - **Whole run**: `ConfigParse`. The configuration could not be loaded, so
//!   nothing can run.
//!
//! A build that exits with a non-zero status is not an error at all. It is a
//! [`crate::build::BuildResult::Failure`] value, since the pipeline treats it
//! as an expected outcome.
//!
//! The `Result` alias is used throughout the library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for docset-updater operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file could not be parsed or resolved.
    ///
    /// Carries an optional hint about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A project's ledger file does not exist.
    ///
    /// Ledgers are seeded by the operator; they are never created implicitly.
    #[error("Ledger for project '{project}' not found at {}\n  hint: create it with an initial 'versions:' list", path.display())]
    LedgerMissing { project: String, path: PathBuf },

    /// A string could not be parsed as a version.
    #[error("Invalid version format '{raw}': {message}")]
    VersionParse { raw: String, message: String },

    /// Cloning a project's repository failed.
    #[error("Git clone error for {url}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// A Git command against an existing clone failed.
    #[error("Git command failed in {}: {command} - {stderr}", repository.display())]
    GitCommand {
        command: String,
        repository: PathBuf,
        stderr: String,
    },

    /// A content-derived version could not be located in the tracked file.
    #[error("No version found in {file} at {revision}: {message}")]
    ContentNotFound {
        file: String,
        revision: String,
        message: String,
    },

    /// The build shell could not be started at all.
    #[error("Failed to start build command `{command}` in {}: {source}", working_dir.display())]
    BuildSpawn {
        command: String,
        working_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A doc-set manifest exists but could not be read or understood.
    #[error("Manifest corrupted at {}: {message}", path.display())]
    ManifestCorruption { path: PathBuf, message: String },

    /// A host filesystem operation failed.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Shorthand for a [`Error::Filesystem`] describing `action` on `path`.
    pub(crate) fn filesystem(
        action: &str,
        path: &std::path::Path,
        err: impl std::fmt::Display,
    ) -> Self {
        Error::Filesystem {
            message: format!("Failed to {} '{}': {}", action, path.display(), err),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_parse() {
        let error = Error::ConfigParse {
            message: "Invalid YAML".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration parsing error"));
        assert!(display.contains("Invalid YAML"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "Unknown preset 'nomad'".to_string(),
            hint: Some("Use one of: kubernetes, consul".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Unknown preset 'nomad'"));
        assert!(display.contains("hint:"));
        assert!(display.contains("kubernetes, consul"));
    }

    #[test]
    fn test_error_display_ledger_missing() {
        let error = Error::LedgerMissing {
            project: "consul".to_string(),
            path: PathBuf::from("/srv/consul/consul.yml"),
        };
        let display = format!("{}", error);
        assert!(display.contains("consul"));
        assert!(display.contains("/srv/consul/consul.yml"));
        assert!(display.contains("versions:"));
    }

    #[test]
    fn test_error_display_version_parse() {
        let error = Error::VersionParse {
            raw: "nightly".to_string(),
            message: "not a recognised version format".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Invalid version format"));
        assert!(display.contains("nightly"));
    }

    #[test]
    fn test_error_display_git_clone_with_hint() {
        let error = Error::GitClone {
            url: "git@github.com:hashicorp/vault.git".to_string(),
            message: "Permission denied".to_string(),
            hint: Some("Check SSH keys".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git clone error"));
        assert!(display.contains("hashicorp/vault"));
        assert!(display.contains("hint:"));
        assert!(display.contains("Check SSH keys"));
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "fetch --all --prune".to_string(),
            repository: PathBuf::from("/srv/vault/repo"),
            stderr: "Could not resolve host".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git command failed"));
        assert!(display.contains("/srv/vault/repo"));
        assert!(display.contains("fetch --all --prune"));
        assert!(display.contains("Could not resolve host"));
    }

    #[test]
    fn test_error_display_manifest_corruption() {
        let error = Error::ManifestCorruption {
            path: PathBuf::from("docsets/Vault/docset.json"),
            message: "expected value at line 1".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Manifest corrupted"));
        assert!(display.contains("docsets/Vault/docset.json"));
    }

    #[test]
    fn test_error_build_spawn_keeps_source() {
        use std::error::Error as _;
        let error = Error::BuildSpawn {
            command: "./build.sh 1.0.0".to_string(),
            working_dir: PathBuf::from("/missing"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        };
        assert!(error.to_string().contains("./build.sh 1.0.0"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_error_filesystem_helper() {
        let error = Error::filesystem("copy", std::path::Path::new("a.tgz"), "disk full");
        let display = error.to_string();
        assert!(display.contains("Failed to copy 'a.tgz': disk full"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(format!("{}", error).contains("YAML parsing error"));
    }

    #[test]
    fn test_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(format!("{}", error).contains("JSON error"));
    }
}
