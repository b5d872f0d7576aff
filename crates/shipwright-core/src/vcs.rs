//! Version-control transport: trait seam plus a `git` process-exec client.
//!
//! The publisher drives this seam; `GitCli` shells out to `git` one
//! subprocess per operation and surfaces captured stderr on failure.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use thiserror::Error;

use crate::domain::error::DeployError;

/// Errors from a single version-control operation.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} failed: {stderr}")]
    Failed { command: String, stderr: String },
}

impl From<VcsError> for DeployError {
    fn from(err: VcsError) -> Self {
        DeployError::Publish(err.to_string())
    }
}

/// The version-control operations the publisher needs.
pub trait VcsClient: Send + Sync {
    /// Initialize a working tree in `dir`. Idempotent: safe when one exists.
    fn init(&self, dir: &Path) -> Result<(), VcsError>;
    fn stage_all(&self, dir: &Path) -> Result<(), VcsError>;
    fn commit(&self, dir: &Path, message: &str) -> Result<(), VcsError>;
    fn set_branch(&self, dir: &Path, branch: &str) -> Result<(), VcsError>;
    fn add_remote(&self, dir: &Path, name: &str, url: &str) -> Result<(), VcsError>;
    fn force_push(&self, dir: &Path, remote: &str, branch: &str) -> Result<(), VcsError>;
}

/// `git` on `PATH`, one subprocess per operation.
///
/// Commit identity is passed per-invocation with `-c` so the pipeline never
/// depends on host-level git configuration.
#[derive(Debug, Clone)]
pub struct GitCli {
    author_name: String,
    author_email: String,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            author_name: "shipwright".to_string(),
            author_email: "shipwright@localhost".to_string(),
        }
    }

    pub fn with_author(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            author_name: name.into(),
            author_email: email.into(),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl VcsClient for GitCli {
    fn init(&self, dir: &Path) -> Result<(), VcsError> {
        run_git(dir, ["init"])
    }

    fn stage_all(&self, dir: &Path) -> Result<(), VcsError> {
        run_git(dir, ["add", "."])
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<(), VcsError> {
        let name = format!("user.name={}", self.author_name);
        let email = format!("user.email={}", self.author_email);
        run_git(
            dir,
            [
                "-c",
                name.as_str(),
                "-c",
                email.as_str(),
                "commit",
                "-m",
                message,
            ],
        )
    }

    fn set_branch(&self, dir: &Path, branch: &str) -> Result<(), VcsError> {
        run_git(dir, ["branch", "-M", branch])
    }

    fn add_remote(&self, dir: &Path, name: &str, url: &str) -> Result<(), VcsError> {
        // A retried publish into a reused tree may already carry the remote;
        // fall back to rewriting its URL. When both steps fail, the original
        // `remote add` diagnostic is the one worth surfacing.
        match run_git(dir, ["remote", "add", name, url]) {
            Ok(()) => Ok(()),
            Err(add_err) => run_git(dir, ["remote", "set-url", name, url]).map_err(|_| add_err),
        }
    }

    fn force_push(&self, dir: &Path, remote: &str, branch: &str) -> Result<(), VcsError> {
        run_git(dir, ["push", "--force", remote, branch])
    }
}

fn run_git<I, S>(dir: &Path, args: I) -> Result<(), VcsError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    let display = format!(
        "git {}",
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = Command::new("git")
        .args(&args)
        .current_dir(dir)
        .output()
        .map_err(|e| VcsError::Spawn {
            command: display.clone(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(VcsError::Failed {
            command: display,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
