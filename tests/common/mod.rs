//! Shared test utilities for integration and E2E tests.
//!
//! The fixture lays out a complete, network-free environment in a temporary
//! directory:
//!
//! - `upstream/`: a local Git repository standing in for the project remote,
//! - `vault-dash/`: the generator root holding the ledgers and build output,
//! - `docsets/Vault/`: the shared doc-set,
//! - `config.yml`: configuration tying them together.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new()
//!     .with_upstream_tags(&["v1.0.0", "v1.1.0"])
//!     .with_ledger(&[])
//!     .with_config(configs::VAULT);
//! fixture.command().arg("run").assert().success();
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// Configuration snippets. Paths are relative to the fixture root, which is
/// where `config.yml` lives; `{upstream}` is replaced with the absolute path
/// of the upstream repository.
#[allow(dead_code)]
pub mod configs {
    /// One tag-based project feeding one doc-set. The build script writes the
    /// archive the merger expects.
    pub const VAULT: &str = r#"
docsets:
  - name: Vault
    path: docsets/Vault
projects:
  - name: vault
    preset: vault
    path: vault-dash
    repository_path: vault-dash/vault
    git_url: "{upstream}"
    command: "mkdir -p build/{version} && printf '{version}' > build/{version}/Vault.tgz"
"#;

    /// The same project with a build that always fails.
    pub const VAULT_FAILING_BUILD: &str = r#"
docsets:
  - name: Vault
    path: docsets/Vault
projects:
  - name: vault
    preset: vault
    path: vault-dash
    repository_path: vault-dash/vault
    git_url: "{upstream}"
    command: "echo 'cannot build {version}' >&2; exit 3"
"#;

    /// A content-derived project reading its version from a tracked file.
    pub const TERRAFORM: &str = r#"
projects:
  - name: terraform
    preset: terraform
    path: vault-dash
    repository_path: vault-dash/terraform-website
    git_url: "{upstream}"
    ledger: terraform.yml
    command: "mkdir -p build/{version} && printf '{version}' > build/{version}/Terraform.tgz"
"#;

    /// Malformed YAML.
    pub const INVALID_YAML: &str = "projects: [unclosed\n";
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(args)
        .status()
        .expect("Failed to run git");
    assert!(status.success(), "git {:?} failed", args);
}

/// A temporary directory laid out as described in the module docs.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a fixture with empty generator root and doc-set directories.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("vault-dash")
            .create_dir_all()
            .expect("Failed to create generator root");
        temp_dir
            .child("docsets/Vault")
            .create_dir_all()
            .expect("Failed to create docset root");
        Self { temp_dir }
    }

    /// Write `config.yml`, substituting `{upstream}`.
    pub fn with_config(self, content: &str) -> Self {
        let upstream = self.upstream_path();
        self.temp_dir
            .child("config.yml")
            .write_str(&content.replace("{upstream}", &upstream.display().to_string()))
            .expect("Failed to write config file");
        self
    }

    /// Seed `vault-dash/vault.yml` with `versions`.
    pub fn with_ledger(self, versions: &[&str]) -> Self {
        self.with_named_ledger("vault.yml", versions)
    }

    /// Seed a ledger file under the generator root.
    pub fn with_named_ledger(self, name: &str, versions: &[&str]) -> Self {
        let mut content = String::from("versions:");
        if versions.is_empty() {
            content.push_str(" []");
        }
        content.push('\n');
        for version in versions {
            content.push_str(&format!("- {}\n", version));
        }
        self.temp_dir
            .child("vault-dash")
            .child(name)
            .write_str(&content)
            .expect("Failed to write ledger");
        self
    }

    /// Create the upstream repository with one commit per tag.
    pub fn with_upstream_tags(self, tags: &[&str]) -> Self {
        let upstream = self.upstream_path();
        std::fs::create_dir_all(&upstream).expect("Failed to create upstream");
        git(&upstream, &["init", "--quiet", "--initial-branch=main"]);
        for tag in tags {
            std::fs::write(upstream.join("RELEASE"), tag).expect("Failed to write file");
            git(&upstream, &["add", "RELEASE"]);
            git(&upstream, &["commit", "--quiet", "-m", tag]);
            git(&upstream, &["tag", tag]);
        }
        self
    }

    /// Add tags to an existing upstream repository.
    pub fn push_upstream_tags(&self, tags: &[&str]) {
        let upstream = self.upstream_path();
        for tag in tags {
            std::fs::write(upstream.join("RELEASE"), tag).expect("Failed to write file");
            git(&upstream, &["add", "RELEASE"]);
            git(&upstream, &["commit", "--quiet", "-m", tag]);
            git(&upstream, &["tag", tag]);
        }
    }

    /// Commit `content` to `path` in the upstream repository, creating the
    /// repository when needed.
    pub fn commit_upstream_file(self, path: &str, content: &str) -> Self {
        let upstream = self.upstream_path();
        if !upstream.join(".git").exists() {
            std::fs::create_dir_all(&upstream).expect("Failed to create upstream");
            git(&upstream, &["init", "--quiet", "--initial-branch=main"]);
        }
        let file = upstream.join(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(&file, content).expect("Failed to write file");
        git(&upstream, &["add", path]);
        git(&upstream, &["commit", "--quiet", "-m", "update"]);
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.yml")
    }

    pub fn upstream_path(&self) -> PathBuf {
        self.path().join("upstream")
    }

    pub fn generator_root(&self) -> PathBuf {
        self.path().join("vault-dash")
    }

    pub fn docset_root(&self) -> PathBuf {
        self.path().join("docsets/Vault")
    }

    /// Contents of the vault ledger.
    pub fn ledger_content(&self) -> String {
        std::fs::read_to_string(self.generator_root().join("vault.yml")).expect("Failed to read ledger")
    }

    /// Parsed doc-set manifest.
    pub fn manifest(&self) -> serde_json::Value {
        let content = std::fs::read_to_string(self.docset_root().join("docset.json"))
            .expect("Failed to read manifest");
        serde_json::from_str(&content).expect("Manifest is not JSON")
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command running in the fixture directory with its config.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("docset-updater");
        cmd.current_dir(self.path())
            .env_remove("DOCSET_UPDATER_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
