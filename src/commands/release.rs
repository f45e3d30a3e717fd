use log::{debug, info};
use std::path::Path;
use thiserror::Error;

use crate::config::{FORK_REMOTE, Settings};
use crate::domain::{
    CommitAuthor, MergeRequest, MergeRequestDraft, ReleaseTarget, ReviewError, ReviewPlatform,
    VcsError, WorkingCopy,
};
use crate::infrastructure::{CatalogError, transplant, update_package_index};

/// Name recorded on every release commit
pub const COMMIT_AUTHOR_NAME: &str = "Delorean";

/// Email recorded on every release commit
pub const COMMIT_AUTHOR_EMAIL: &str = "cloud-services-delorean@redhat.com";

/// Errors that can occur while releasing a version to one channel
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The checked-out branch of the catalog could not be determined.
    #[error("failed to determine the current branch")]
    BranchLookupFailed(#[source] VcsError),

    /// The catalog is not on the branch releases start from.
    #[error("expected the managed-tenants repo to be on {expected} but it is on {actual}")]
    NotOnBaseBranch { expected: String, actual: String },

    /// The release branch could not be created.
    #[error("failed to create branch {branch}")]
    BranchCreateFailed {
        branch: String,
        #[source]
        source: VcsError,
    },

    /// Manifests could not be copied or the package index could not be updated.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Copied files or the package index could not be staged.
    #[error("failed to stage changes")]
    StageFailed(#[source] VcsError),

    /// The release commit could not be created.
    #[error("failed to commit changes")]
    CommitFailed(#[source] VcsError),

    /// The working tree status could not be read.
    #[error("failed to read the working tree status")]
    StatusFailed(#[source] VcsError),

    /// Changes outside of the release commit were found in the catalog.
    #[error("working tree is not clean after commit:\n  {}", changes.join("\n  "))]
    DirtyTreeAfterCommit { changes: Vec<String> },

    /// The release branch could not be pushed to the fork.
    #[error("failed to push {branch} to {remote}")]
    PushFailed {
        branch: String,
        remote: String,
        #[source]
        source: VcsError,
    },

    /// The merge request could not be opened.
    #[error("failed to open a merge request for {branch}")]
    MergeRequestCreateFailed {
        branch: String,
        #[source]
        source: ReviewError,
    },

    /// The merge request exists but the catalog was left on the release branch.
    #[error("merge request {url} was opened but {branch} could not be checked out again")]
    RestoreFailed {
        url: String,
        branch: String,
        #[source]
        source: VcsError,
    },
}

/// Where the two working copies of a release run live, and how to reach the remotes
#[derive(Debug, Clone, Copy)]
pub struct ReleaseContext<'a> {
    /// Work tree of the integreatly-operator clone, checked out at the release tag
    pub operator_root: &'a Path,
    /// Work tree of the managed-tenants clone
    pub catalog_root: &'a Path,
    pub settings: &'a Settings,
}

/// Identity of release commits
#[must_use]
pub fn commit_author() -> CommitAuthor {
    CommitAuthor {
        name: COMMIT_AUTHOR_NAME.to_owned(),
        email: COMMIT_AUTHOR_EMAIL.to_owned(),
    }
}

/// Release `target` to its channel: commit the manifests on a new branch of the
/// catalog, push it to the fork and open a merge request against the origin.
///
/// `catalog` must be the working copy at `ctx.catalog_root`. Nothing is written to it
/// unless it is on the base branch. On success the base branch is checked out again.
///
/// # Errors
///
/// Returns the [`ReleaseError`] of the first step that fails. No step is retried and
/// nothing already done is undone.
pub fn release<W, R>(
    ctx: &ReleaseContext<'_>,
    catalog: &W,
    review: &R,
    target: &ReleaseTarget,
) -> Result<MergeRequest, ReleaseError>
where
    W: WorkingCopy,
    R: ReviewPlatform,
{
    let settings = ctx.settings;
    let base_branch = settings.base_branch.as_str();
    let branch = target.branch_name();

    let current = catalog
        .current_branch()
        .map_err(ReleaseError::BranchLookupFailed)?;
    if current != base_branch {
        return Err(ReleaseError::NotOnBaseBranch {
            expected: base_branch.to_owned(),
            actual: current,
        });
    }

    info!("create branch {branch}");
    catalog
        .create_and_checkout_branch(&branch)
        .map_err(|source| ReleaseError::BranchCreateFailed {
            branch: branch.clone(),
            source,
        })?;

    let manifests = transplant(ctx.operator_root, ctx.catalog_root, target)?;
    debug!(
        "copied {} files into {}",
        manifests.files.len(),
        manifests.directory.display()
    );
    catalog
        .stage(&manifests.files)
        .map_err(ReleaseError::StageFailed)?;

    let index = update_package_index(ctx.catalog_root, target)?;
    catalog
        .stage(std::slice::from_ref(&index))
        .map_err(ReleaseError::StageFailed)?;

    let message = target.commit_message();
    info!("commit changes: {message}");
    catalog
        .commit(&message, &commit_author())
        .map_err(ReleaseError::CommitFailed)?;

    let changes = catalog.status().map_err(ReleaseError::StatusFailed)?;
    if !changes.is_empty() {
        return Err(ReleaseError::DirtyTreeAfterCommit { changes });
    }

    info!("push branch {branch} to {FORK_REMOTE}");
    catalog
        .push(FORK_REMOTE, &branch, &settings.credentials())
        .map_err(|source| ReleaseError::PushFailed {
            branch: branch.clone(),
            remote: FORK_REMOTE.to_owned(),
            source,
        })?;

    let merge_request = open_merge_request(settings, review, target, &branch)?;
    info!("merge request created: {}", merge_request.web_url);

    catalog
        .checkout_branch(base_branch)
        .map_err(|source| ReleaseError::RestoreFailed {
            url: merge_request.web_url.clone(),
            branch: base_branch.to_owned(),
            source,
        })?;

    Ok(merge_request)
}

/// Open a merge request from `branch` of the fork into the base branch of the origin
fn open_merge_request<R: ReviewPlatform>(
    settings: &Settings,
    review: &R,
    target: &ReleaseTarget,
    branch: &str,
) -> Result<MergeRequest, ReleaseError> {
    let failed = |source| ReleaseError::MergeRequestCreateFailed {
        branch: branch.to_owned(),
        source,
    };

    let origin = review
        .find_project(&settings.managed_tenants_origin)
        .map_err(failed)?;
    debug!("target project {} has id {}", origin.path, origin.id);

    let draft = MergeRequestDraft {
        source_branch: branch.to_owned(),
        target_branch: settings.base_branch.clone(),
        title: target.merge_request_title(),
        description: settings.merge_request_description.clone(),
        target_project_id: origin.id,
    };

    review
        .create_merge_request(&settings.managed_tenants_fork, &draft)
        .map_err(failed)
}
