//! Working copy backed by the system `git` binary.
//!
//! Every call runs one subprocess with an isolated environment: only the variables
//! git needs to reach a remote are forwarded, and terminal prompts are disabled so a
//! missing credential fails instead of hanging.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use super::describe;
use crate::domain::{CommitAuthor, Credentials, VcsError, WorkingCopy};

/// Environment variables forwarded to git subprocesses
const FORWARDED_ENV: &[&str] = &[
    "PATH",
    "HOME",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
    "http_proxy",
    "https_proxy",
    "no_proxy",
    "SSL_CERT_FILE",
    "SSL_CERT_DIR",
    "GIT_SSL_CAINFO",
];

const REDACTED: &str = "<redacted>";

/// Errors that can occur when running git
#[derive(Debug, Error)]
pub enum GitError {
    /// The git binary could not be started.
    #[error("failed to execute `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// git exited with a failure status.
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// No repository contains the given path.
    #[error("no git repository found at {}", path.display())]
    RepositoryNotFound {
        path: PathBuf,
        #[source]
        source: gix_discover::upwards::Error,
    },

    /// The repository has no work tree.
    #[error("repository at {} has no work tree", path.display())]
    BareRepository { path: PathBuf },
}

/// A non-bare repository driven through the `git` command line
#[derive(Debug, Clone)]
pub struct SystemGit {
    work_tree: PathBuf,
}

impl SystemGit {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::RepositoryNotFound`] if no repository contains `path` and
    /// [`GitError::BareRepository`] if the repository has no work tree.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let (repo_path, _trust) =
            gix_discover::upwards(path).map_err(|source| GitError::RepositoryNotFound {
                path: path.to_path_buf(),
                source,
            })?;

        let (_git_dir, work_tree) = repo_path.into_repository_and_work_tree_directories();
        let work_tree = work_tree.ok_or_else(|| GitError::BareRepository {
            path: path.to_path_buf(),
        })?;

        Ok(Self { work_tree })
    }

    /// Clone `url` into `destination` with `reference` (a branch or tag) checked out.
    ///
    /// # Errors
    ///
    /// Returns an error if the clone fails or the result cannot be opened.
    pub fn clone_at(url: &str, reference: &str, destination: &Path) -> Result<Self, GitError> {
        debug!("git clone {url} at {reference} into {}", destination.display());

        let mut cmd = isolated_command();
        cmd.args(["clone", "--quiet", "--branch", reference, url])
            .arg(destination);
        run(&mut cmd, "git clone")?;

        Self::open(destination)
    }

    #[must_use]
    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    /// Add a remote named `name` pointing at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote already exists or cannot be added.
    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        let mut cmd = self.git_cmd();
        cmd.args(["remote", "add", name, url]);
        run(&mut cmd, "git remote add").map(drop)
    }

    /// URL configured for remote `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote does not exist.
    pub fn remote_url(&self, name: &str) -> Result<String, GitError> {
        let mut cmd = self.git_cmd();
        cmd.args(["remote", "get-url", name]);
        run(&mut cmd, "git remote get-url").map(|out| out.trim().to_owned())
    }

    /// Name of the checked-out branch, or `HEAD` when detached.
    ///
    /// # Errors
    ///
    /// Returns an error if `HEAD` cannot be resolved.
    pub fn head_branch(&self) -> Result<String, GitError> {
        let mut cmd = self.git_cmd();
        cmd.args(["rev-parse", "--abbrev-ref", "HEAD"]);
        run(&mut cmd, "git rev-parse").map(|out| out.trim().to_owned())
    }

    /// Create `branch` at `HEAD` and check it out.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch exists or the checkout fails.
    pub fn create_branch(&self, branch: &str) -> Result<(), GitError> {
        let mut cmd = self.git_cmd();
        cmd.args(["checkout", "--quiet", "-b", branch]);
        run(&mut cmd, "git checkout -b").map(drop)
    }

    /// Check out the existing `branch`.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkout fails.
    pub fn checkout(&self, branch: &str) -> Result<(), GitError> {
        let mut cmd = self.git_cmd();
        cmd.args(["checkout", "--quiet", branch]);
        run(&mut cmd, "git checkout").map(drop)
    }

    /// Stage `paths`, relative to the work tree.
    ///
    /// # Errors
    ///
    /// Returns an error if any path cannot be added.
    pub fn add(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }

        let mut cmd = self.git_cmd();
        cmd.args(["add", "--"]).args(paths);
        run(&mut cmd, "git add").map(drop)
    }

    /// Commit the index with `author` as author and committer.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails, for instance because nothing is staged.
    pub fn commit_staged(&self, message: &str, author: &CommitAuthor) -> Result<(), GitError> {
        let mut cmd = self.git_cmd();
        cmd.arg("-c")
            .arg(format!("user.name={}", author.name))
            .arg("-c")
            .arg(format!("user.email={}", author.email))
            .args(["-c", "commit.gpgsign=false"])
            .args(["commit", "--quiet", "--author"])
            .arg(author.to_string())
            .args(["-m", message]);
        run(&mut cmd, "git commit").map(drop)
    }

    /// Pending changes in porcelain format, one line per path.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be read.
    pub fn porcelain_status(&self) -> Result<Vec<String>, GitError> {
        let mut cmd = self.git_cmd();
        cmd.args(["status", "--porcelain", "--untracked-files=all"]);
        let out = run(&mut cmd, "git status")?;

        Ok(out
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// Push `branch` to `remote`.
    ///
    /// HTTP(S) remotes get `credentials` as a basic auth header scoped to the remote
    /// URL. The header travels through the child environment, never the command line.
    /// Other remotes (local paths, SSH) are pushed to without it.
    ///
    /// # Errors
    ///
    /// Returns an error if the push fails. The token never appears in the error.
    pub fn push_branch(
        &self,
        remote: &str,
        branch: &str,
        credentials: &Credentials,
    ) -> Result<(), GitError> {
        let url = self.remote_url(remote)?;
        let mut cmd = self.push_command(&url, remote, branch, credentials);

        debug!("git push {remote} {branch}");

        run(&mut cmd, "git push").map(drop).map_err(|e| match e {
            GitError::CommandFailed { command, stderr } => GitError::CommandFailed {
                command,
                stderr: redact(&stderr, &credentials.token),
            },
            other => other,
        })
    }

    /// `git push` of `branch` to `remote`, authenticated when `url` is HTTP(S)
    fn push_command(
        &self,
        url: &str,
        remote: &str,
        branch: &str,
        credentials: &Credentials,
    ) -> Command {
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");

        let mut cmd = self.git_cmd();
        if let Some(key) = auth_header_key(url) {
            cmd.env("GIT_CONFIG_COUNT", "1")
                .env("GIT_CONFIG_KEY_0", key)
                .env("GIT_CONFIG_VALUE_0", basic_auth_header(credentials));
        }
        cmd.args(["push", "--quiet", remote, refspec.as_str()]);
        cmd
    }

    /// Create a git command running in the work tree with an isolated environment
    fn git_cmd(&self) -> Command {
        let mut cmd = isolated_command();
        cmd.arg("-C").arg(&self.work_tree);
        cmd
    }
}

impl WorkingCopy for SystemGit {
    fn current_branch(&self) -> Result<String, VcsError> {
        self.head_branch().map_err(|e| failed("rev-parse", &e))
    }

    fn create_and_checkout_branch(&self, branch: &str) -> Result<(), VcsError> {
        self.create_branch(branch).map_err(|e| failed("checkout -b", &e))
    }

    fn checkout_branch(&self, branch: &str) -> Result<(), VcsError> {
        self.checkout(branch).map_err(|e| failed("checkout", &e))
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError> {
        self.add(paths).map_err(|e| failed("add", &e))
    }

    fn commit(&self, message: &str, author: &CommitAuthor) -> Result<(), VcsError> {
        self.commit_staged(message, author)
            .map_err(|e| failed("commit", &e))
    }

    fn status(&self) -> Result<Vec<String>, VcsError> {
        self.porcelain_status().map_err(|e| failed("status", &e))
    }

    fn push(
        &self,
        remote: &str,
        branch: &str,
        credentials: &Credentials,
    ) -> Result<(), VcsError> {
        self.push_branch(remote, branch, credentials)
            .map_err(|e| failed("push", &e))
    }
}

fn failed(operation: &'static str, err: &GitError) -> VcsError {
    VcsError::OperationFailed {
        operation,
        reason: describe(err),
    }
}

/// A bare `git` command with only the forwarded environment
fn isolated_command() -> Command {
    let mut cmd = Command::new("git");

    cmd.env_clear();
    for key in FORWARDED_ENV {
        if let Ok(value) = std::env::var(key) {
            cmd.env(key, value);
        }
    }
    cmd.env("GIT_TERMINAL_PROMPT", "0");

    cmd.args(["-c", "core.quotePath=false"]);
    cmd.args(["-c", "advice.detachedHead=false"]);

    cmd
}

/// Run a git command, returning its stdout
fn run(cmd: &mut Command, command: &str) -> Result<String, GitError> {
    let output = cmd.output().map_err(|source| GitError::Spawn {
        command: command.to_owned(),
        source,
    })?;

    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: command.to_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Config key of an auth header scoped to `url`, for HTTP(S) URLs only
fn auth_header_key(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    Some(format!("http.{url}.extraHeader"))
}

fn basic_auth_header(credentials: &Credentials) -> String {
    let pair = format!("{}:{}", credentials.username, credentials.token);
    format!("Authorization: Basic {}", STANDARD.encode(pair))
}

fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        text.to_owned()
    } else {
        text.replace(secret, REDACTED)
    }
}
