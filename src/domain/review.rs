use thiserror::Error;

/// Errors reported by the code review platform
#[derive(Debug, Clone, Error)]
pub enum ReviewError {
    /// The project could not be looked up.
    #[error("project {path} could not be found: {reason}")]
    ProjectLookupFailed { path: String, reason: String },

    /// The platform rejected the merge request.
    #[error("merge request from {source_branch} could not be created: {reason}")]
    MergeRequestFailed {
        source_branch: String,
        reason: String,
    },
}

/// A project hosted on the review platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub path: String,
    pub web_url: String,
}

/// Everything needed to open a merge request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequestDraft {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
    pub target_project_id: u64,
}

/// A merge request as created by the review platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub iid: u64,
    pub web_url: String,
}

/// Trait for the hosted review platform merge requests are opened on
pub trait ReviewPlatform {
    /// Look up a project by its `namespace/name` path
    ///
    /// # Errors
    ///
    /// Returns an error if the project does not exist or the lookup fails
    fn find_project(&self, path: &str) -> Result<Project, ReviewError>;

    /// Open a merge request from a branch of `source_project`
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the request
    fn create_merge_request(
        &self,
        source_project: &str,
        draft: &MergeRequestDraft,
    ) -> Result<MergeRequest, ReviewError>;
}
