//! # Source Repository Access
//!
//! This module provides [`GitRepository`], the capability a project pipeline
//! uses to reach its upstream: make sure a local clone exists, bring it up to
//! date, enumerate its tags, and read files at the remote default branch.
//!
//! ## Design
//!
//! Callers depend on two small traits rather than on git directly:
//!
//! - **[`TagSource`]**: initialize-or-open, fetch, list tag names.
//! - **[`ContentSource`]**: read a tracked file at the remote head, for
//!   projects whose version is written in a file instead of a tag.
//!
//! `GitRepository` implements both on top of the [`GitOperations`] trait,
//! whose default implementation shells out to the system `git` binary (see
//! [`crate::git`]). Tests swap in a mock `GitOperations` to exercise the
//! initialization logic without a network.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::Result;
use crate::git::REMOTE_HEAD;

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// True when `path` already holds a clone.
    fn is_repository(&self, path: &Path) -> bool;

    /// Clones `url` into `target_dir`.
    fn clone_repository(&self, url: &str, target_dir: &Path, ssh_username: Option<&str>) -> Result<()>;

    /// Points the remote HEAD symbolic ref at the remote default branch.
    fn set_remote_head(&self, repo: &Path, ssh_username: Option<&str>) -> Result<()>;

    /// Fetches every configured remote with pruning.
    fn fetch_all(&self, repo: &Path, ssh_username: Option<&str>) -> Result<()>;

    /// Fetches `refs/tags/*` explicitly.
    fn fetch_tags(&self, repo: &Path, ssh_username: Option<&str>) -> Result<()>;

    /// Lists local tag names.
    fn list_tags(&self, repo: &Path) -> Result<Vec<String>>;

    /// Reads `file` at `revision`.
    fn show_file(&self, repo: &Path, revision: &str, file: &str) -> Result<String>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn is_repository(&self, path: &Path) -> bool {
        crate::git::is_repository(path)
    }

    fn clone_repository(&self, url: &str, target_dir: &Path, ssh_username: Option<&str>) -> Result<()> {
        crate::git::clone(url, target_dir, ssh_username)
    }

    fn set_remote_head(&self, repo: &Path, ssh_username: Option<&str>) -> Result<()> {
        crate::git::set_remote_head(repo, ssh_username)
    }

    fn fetch_all(&self, repo: &Path, ssh_username: Option<&str>) -> Result<()> {
        crate::git::fetch_all(repo, ssh_username)
    }

    fn fetch_tags(&self, repo: &Path, ssh_username: Option<&str>) -> Result<()> {
        crate::git::fetch_tags(repo, ssh_username)
    }

    fn list_tags(&self, repo: &Path) -> Result<Vec<String>> {
        crate::git::list_tags(repo)
    }

    fn show_file(&self, repo: &Path, revision: &str, file: &str) -> Result<String> {
        crate::git::show_file(repo, revision, file)
    }
}

/// A source of release tags.
pub trait TagSource {
    /// Clones the repository if no local clone exists, otherwise opens it
    /// without network access. Safe to call on every run.
    fn ensure_initialized(&self) -> Result<()>;

    /// Brings remote refs and tags up to date. Safe to repeat.
    fn fetch_tags(&self) -> Result<()>;

    /// All local tag names, in unspecified order.
    fn list_tag_names(&self) -> Result<Vec<String>>;
}

/// A source of tracked file contents at the remote default branch.
pub trait ContentSource {
    /// Reads `file` as of the remote HEAD.
    fn read_head_file(&self, file: &str) -> Result<String>;
}

/// A local clone of a project's upstream repository.
pub struct GitRepository {
    clone_path: PathBuf,
    remote_url: String,
    ssh_username: Option<String>,
    git_ops: Box<dyn GitOperations>,
}

impl GitRepository {
    /// Creates a handle backed by the system `git` binary. Nothing touches the
    /// disk until [`TagSource::ensure_initialized`] is called.
    pub fn new(clone_path: PathBuf, remote_url: String, ssh_username: Option<String>) -> Self {
        Self::with_operations(clone_path, remote_url, ssh_username, Box::new(DefaultGitOperations))
    }

    /// Creates a handle with a custom `GitOperations` implementation.
    ///
    /// This is primarily used for testing to inject mock operations.
    pub fn with_operations(
        clone_path: PathBuf,
        remote_url: String,
        ssh_username: Option<String>,
        git_ops: Box<dyn GitOperations>,
    ) -> Self {
        Self {
            clone_path,
            remote_url,
            ssh_username,
            git_ops,
        }
    }

    fn ssh_username(&self) -> Option<&str> {
        self.ssh_username.as_deref()
    }
}

impl TagSource for GitRepository {
    fn ensure_initialized(&self) -> Result<()> {
        if self.git_ops.is_repository(&self.clone_path) {
            debug!("Opening existing clone at {}", self.clone_path.display());
            return Ok(());
        }

        info!(
            "Cloning {} into {}",
            self.remote_url,
            self.clone_path.display()
        );
        self.git_ops
            .clone_repository(&self.remote_url, &self.clone_path, self.ssh_username())?;
        self.git_ops
            .set_remote_head(&self.clone_path, self.ssh_username())
    }

    fn fetch_tags(&self) -> Result<()> {
        self.git_ops.fetch_all(&self.clone_path, self.ssh_username())?;
        self.git_ops.fetch_tags(&self.clone_path, self.ssh_username())
    }

    fn list_tag_names(&self) -> Result<Vec<String>> {
        self.git_ops.list_tags(&self.clone_path)
    }
}

impl ContentSource for GitRepository {
    fn read_head_file(&self, file: &str) -> Result<String> {
        self.git_ops.show_file(&self.clone_path, REMOTE_HEAD, file)
    }
}
