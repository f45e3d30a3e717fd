use log::info;
use std::io;
use std::path::PathBuf;
use tempfile::Builder;
use thiserror::Error;

use super::release::{ReleaseContext, ReleaseError, release};
use crate::config::{FORK_REMOTE, Settings};
use crate::domain::{
    MergeRequest, ReleaseChannel, ReleaseTarget, ReleaseVersion, ReviewPlatform, WorkingCopy,
};
use crate::infrastructure::{GitError, GitlabClient, GitlabError, SystemGit};

/// Errors that can occur while running a managed service release
#[derive(Debug, Error)]
pub enum AppError {
    /// A temporary working directory could not be created.
    #[error("failed to create a working directory")]
    WorkingDirectory(#[source] io::Error),

    /// A repository could not be cloned.
    #[error("failed to clone {url}")]
    Clone {
        url: String,
        #[source]
        source: GitError,
    },

    /// The fork remote could not be added.
    #[error("failed to add the {name} remote")]
    Remote {
        name: &'static str,
        #[source]
        source: GitError,
    },

    /// The GitLab client could not be initialized.
    #[error(transparent)]
    Gitlab(#[from] GitlabError),

    /// Releasing to one of the channels failed; later channels were not attempted.
    #[error("failed to release {version} to {channel}")]
    Release {
        channel: ReleaseChannel,
        version: ReleaseVersion,
        #[source]
        source: ReleaseError,
    },
}

/// Release `version` of the integreatly-operator to every channel it belongs on.
///
/// Both repositories are cloned into fresh working directories which are left on disk
/// afterwards. Returns the merge requests opened, one per channel, in channel order.
///
/// # Errors
///
/// Returns [`AppError::WorkingDirectory`], [`AppError::Clone`] or [`AppError::Remote`]
/// if the working copies cannot be prepared, [`AppError::Gitlab`] if the GitLab
/// client cannot be created and [`AppError::Release`] for the first channel that fails.
pub fn managed_service_release(
    settings: &Settings,
    version: &ReleaseVersion,
) -> Result<Vec<MergeRequest>, AppError> {
    let catalog_dir = working_directory("managed-tenants-")?;
    let origin_url = settings.managed_tenants_origin_url();
    info!(
        "clone the managed-tenants repo to {}",
        catalog_dir.display()
    );
    let catalog = SystemGit::clone_at(&origin_url, &settings.base_branch, &catalog_dir).map_err(
        |source| AppError::Clone {
            url: origin_url.clone(),
            source,
        },
    )?;
    catalog
        .add_remote(FORK_REMOTE, &settings.managed_tenants_fork_url())
        .map_err(|source| AppError::Remote {
            name: FORK_REMOTE,
            source,
        })?;

    let operator_dir = working_directory("integreatly-operator-")?;
    let operator_url = settings.integreatly_operator_url();
    info!(
        "clone the integreatly-operator to {}",
        operator_dir.display()
    );
    let operator = SystemGit::clone_at(&operator_url, &version.tag(), &operator_dir).map_err(
        |source| AppError::Clone {
            url: operator_url.clone(),
            source,
        },
    )?;

    let review = GitlabClient::new(&settings.gitlab_url, settings.gitlab_token.clone())?;

    let ctx = ReleaseContext {
        operator_root: operator.work_tree(),
        catalog_root: catalog.work_tree(),
        settings,
    };
    let merge_requests = run_channels(&ctx, &catalog, &review, version)?;

    for merge_request in &merge_requests {
        info!("merge request: {}", merge_request.web_url);
    }
    Ok(merge_requests)
}

/// Release `version` to each of its channels in order, stopping at the first failure.
///
/// # Errors
///
/// Returns [`AppError::Release`] for the first channel that fails.
pub fn run_channels<W, R>(
    ctx: &ReleaseContext<'_>,
    catalog: &W,
    review: &R,
    version: &ReleaseVersion,
) -> Result<Vec<MergeRequest>, AppError>
where
    W: WorkingCopy,
    R: ReviewPlatform,
{
    let channels = version.channels();
    let mut merge_requests = Vec::with_capacity(channels.len());

    for &channel in channels {
        info!("release {version} to {channel}");
        let target = ReleaseTarget::new(channel, version.clone());
        let merge_request =
            release(ctx, catalog, review, &target).map_err(|source| AppError::Release {
                channel,
                version: version.clone(),
                source,
            })?;
        merge_requests.push(merge_request);
    }

    Ok(merge_requests)
}

/// A new directory under the system temporary directory that outlives the process
fn working_directory(prefix: &str) -> Result<PathBuf, AppError> {
    Builder::new()
        .prefix(prefix)
        .tempdir()
        .map(tempfile::TempDir::keep)
        .map_err(AppError::WorkingDirectory)
}
