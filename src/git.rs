//! Thin wrappers over the system `git` binary.
//!
//! Using the installed `git` means authentication works the way it does on the
//! command line: SSH keys held by `ssh-agent`, credential helpers and anything
//! configured in `~/.gitconfig`. When an explicit SSH username is configured
//! for a project, git is told to connect as that user so the agent-backed key
//! is offered for it.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use log::debug;

use crate::error::{Error, Result};

/// Ref that tracks the remote's default branch once `set_remote_head` ran.
pub const REMOTE_HEAD: &str = "refs/remotes/origin/HEAD";

/// Refspec used to force-fetch every tag, since a plain fetch may skip them
/// depending on the remote configuration.
const TAG_REFSPEC: &str = "+refs/tags/*:refs/tags/*";

fn git_command(ssh_username: Option<&str>) -> Command {
    let mut cmd = Command::new("git");
    // Never block on an interactive credential prompt.
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    if let Some(user) = ssh_username {
        cmd.arg("-c").arg(format!("core.sshCommand=ssh -l {}", user));
    }
    cmd
}

fn run_in(repo: &Path, args: &[&str], ssh_username: Option<&str>) -> Result<Output> {
    debug!("git {} (in {})", args.join(" "), repo.display());

    let output = git_command(ssh_username)
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .map_err(|e| Error::GitCommand {
            command: args.join(" "),
            repository: repo.to_path_buf(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command: args.join(" "),
            repository: repo.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}

/// True when `path` already holds a git working tree.
pub fn is_repository(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Clone `url` into `target_dir`, creating parent directories first.
pub fn clone(url: &str, target_dir: &Path, ssh_username: Option<&str>) -> Result<()> {
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("git clone {} {}", url, target_dir.display());

    let output = git_command(ssh_username)
        .arg("clone")
        .arg(url)
        .arg(target_dir)
        .output()
        .map_err(|e| Error::GitClone {
            url: url.to_string(),
            message: e.to_string(),
            hint: Some("Make sure `git` is installed and on PATH".to_string()),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "Make sure the SSH key is loaded in ssh-agent, or set `ssh_username` \
                 for the project"
                    .to_string(),
            )
        } else {
            None
        };

        return Err(Error::GitClone {
            url: url.to_string(),
            message: stderr.trim().to_string(),
            hint,
        });
    }

    Ok(())
}

/// Point `refs/remotes/origin/HEAD` at the remote's default branch.
pub fn set_remote_head(repo: &Path, ssh_username: Option<&str>) -> Result<()> {
    run_in(repo, &["remote", "set-head", "origin", "--auto"], ssh_username)?;
    Ok(())
}

/// Fetch all remotes, pruning refs deleted upstream.
pub fn fetch_all(repo: &Path, ssh_username: Option<&str>) -> Result<()> {
    run_in(repo, &["fetch", "--all", "--prune"], ssh_username)?;
    Ok(())
}

/// Force-fetch every tag from `origin`.
pub fn fetch_tags(repo: &Path, ssh_username: Option<&str>) -> Result<()> {
    run_in(repo, &["fetch", "--prune", "origin", TAG_REFSPEC], ssh_username)?;
    Ok(())
}

/// Names of all local tags, in no particular order.
pub fn list_tags(repo: &Path) -> Result<Vec<String>> {
    let output = run_in(
        repo,
        &["for-each-ref", "--format=%(refname:short)", "refs/tags"],
        None,
    )?;

    Ok(parse_ref_list(&String::from_utf8_lossy(&output.stdout)))
}

/// Contents of `file` as of `revision`, without touching the working tree.
pub fn show_file(repo: &Path, revision: &str, file: &str) -> Result<String> {
    let spec = format!("{}:{}", revision, file);
    let output = run_in(repo, &["show", &spec], None)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_ref_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_ref_list() {
        let stdout = "v1.0.0\nv1.1.0\n\n  v2.0.0-rc1  \n";
        assert_eq!(parse_ref_list(stdout), vec!["v1.0.0", "v1.1.0", "v2.0.0-rc1"]);
    }

    #[test]
    fn test_parse_ref_list_empty() {
        assert!(parse_ref_list("").is_empty());
    }

    #[test]
    fn test_is_repository() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!is_repository(temp_dir.path()));

        fs::create_dir(temp_dir.path().join(".git")).unwrap();
        assert!(is_repository(temp_dir.path()));
    }

    #[test]
    fn test_git_command_sets_ssh_user() {
        let cmd = git_command(Some("deploy"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["-c", "core.sshCommand=ssh -l deploy"]);

        let cmd = git_command(None);
        assert_eq!(cmd.get_args().count(), 0);
    }

    #[test]
    fn test_run_in_missing_repository_is_git_command_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        let err = list_tags(&missing).unwrap_err();
        assert!(matches!(err, Error::GitCommand { .. }));
    }

    // Cloning and fetching need a reachable remote; those paths are covered by
    // the integration tests behind the `integration-tests` feature.
}
