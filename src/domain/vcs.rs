use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a working copy
#[derive(Debug, Clone, Error)]
pub enum VcsError {
    /// A git operation failed.
    #[error("git {operation} failed: {reason}")]
    OperationFailed {
        operation: &'static str,
        reason: String,
    },
}

/// Identity recorded as author and committer of release commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl fmt::Display for CommitAuthor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Username and token used to push over HTTPS
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Mutating operations the release workflow performs on a checked-out repository.
///
/// Paths are relative to the repository root.
pub trait WorkingCopy {
    /// Name of the checked-out branch, or `HEAD` when detached.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch cannot be determined.
    fn current_branch(&self) -> Result<String, VcsError>;

    /// Create a new branch at `HEAD` and check it out.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch already exists or cannot be checked out.
    fn create_and_checkout_branch(&self, branch: &str) -> Result<(), VcsError>;

    /// Check out an existing branch.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkout fails.
    fn checkout_branch(&self, branch: &str) -> Result<(), VcsError>;

    /// Add the given paths to the index.
    ///
    /// # Errors
    ///
    /// Returns an error if any path cannot be staged.
    fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError>;

    /// Commit the index with `author` as author and committer.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit cannot be created.
    fn commit(&self, message: &str, author: &CommitAuthor) -> Result<(), VcsError>;

    /// Pending changes in the working tree, one entry per path. Empty when clean.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be read.
    fn status(&self) -> Result<Vec<String>, VcsError>;

    /// Push `branch` to the branch of the same name on `remote`.
    ///
    /// # Errors
    ///
    /// Returns an error if the push is rejected or the remote is unreachable.
    fn push(&self, remote: &str, branch: &str, credentials: &Credentials)
    -> Result<(), VcsError>;
}
