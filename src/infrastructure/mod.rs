pub mod catalog;
pub mod git;
pub mod gitlab;

pub use catalog::{CatalogError, TransplantedManifests, transplant, update_package_index};
pub use git::{GitError, SystemGit};
pub use gitlab::{GitlabClient, GitlabError};

/// Render an error and its chain of sources on a single line
pub(crate) fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
