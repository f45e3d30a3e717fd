use log::debug;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::describe;
use crate::domain::{MergeRequest, MergeRequestDraft, Project, ReviewError, ReviewPlatform};

const GITLAB_API_PATH: [&str; 2] = ["api", "v4"];
const USER_AGENT: &str = "delorean-cli";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur when interacting with the GitLab API
#[derive(Debug, Error)]
pub enum GitlabError {
    /// The HTTP client could not be built.
    #[error("failed to create HTTP client")]
    ClientInit(#[source] reqwest::Error),

    /// The base URL is not an absolute URL that can carry a path.
    #[error("invalid GitLab URL: {url}")]
    InvalidUrl { url: String },

    /// The request could not be sent or got no response.
    #[error("failed to {operation} at {url}")]
    Request {
        operation: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("GitLab API returned status {status} for {url}")]
    ApiStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    /// The response body is not the expected JSON.
    #[error("failed to parse response from {url}")]
    ParseResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    id: u64,
    path_with_namespace: String,
    web_url: String,
}

#[derive(Debug, Serialize)]
struct CreateMergeRequestBody<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
    description: &'a str,
    target_project_id: u64,
}

#[derive(Debug, Deserialize)]
struct MergeRequestResponse {
    iid: u64,
    web_url: String,
}

/// Client for the GitLab v4 REST API, authenticated with a personal access token
pub struct GitlabClient {
    client: reqwest::blocking::Client,
    base_url: Url,
    token: String,
}

impl GitlabClient {
    /// Create a client for the GitLab instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GitlabError::InvalidUrl`] if `base_url` is not an absolute URL and
    /// [`GitlabError::ClientInit`] if the HTTP client cannot be initialized.
    pub fn new(base_url: &str, token: String) -> Result<Self, GitlabError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GitlabError::InvalidUrl {
                url: base_url.to_owned(),
            })?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(GitlabError::ClientInit)?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// API URL of a project, with `namespace/name` encoded as a single path segment.
    ///
    /// # Errors
    ///
    /// Returns [`GitlabError::InvalidUrl`] if the base URL cannot carry a path.
    pub fn project_url(&self, project: &str, rest: &[&str]) -> Result<Url, GitlabError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GitlabError::InvalidUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(GITLAB_API_PATH)
            .push("projects")
            .push(project)
            .extend(rest);
        Ok(url)
    }

    /// Fetch a project by its `namespace/name` path.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API answers with a non-success
    /// status, or the response cannot be parsed.
    pub fn get_project(&self, path: &str) -> Result<Project, GitlabError> {
        let url = self.project_url(path, &[])?;
        debug!("GET {url}");

        let response = self
            .client
            .get(url.clone())
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .map_err(|source| GitlabError::Request {
                operation: "fetch project",
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(GitlabError::ApiStatus {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let project: ProjectResponse =
            response
                .json()
                .map_err(|source| GitlabError::ParseResponse {
                    url: url.to_string(),
                    source,
                })?;

        Ok(Project {
            id: project.id,
            path: project.path_with_namespace,
            web_url: project.web_url,
        })
    }

    /// Open a merge request from a branch of `source_project`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API answers with a non-success
    /// status, or the response cannot be parsed.
    pub fn open_merge_request(
        &self,
        source_project: &str,
        draft: &MergeRequestDraft,
    ) -> Result<MergeRequest, GitlabError> {
        let url = self.project_url(source_project, &["merge_requests"])?;
        debug!("POST {url}");

        let body = CreateMergeRequestBody {
            source_branch: &draft.source_branch,
            target_branch: &draft.target_branch,
            title: &draft.title,
            description: &draft.description,
            target_project_id: draft.target_project_id,
        };

        let response = self
            .client
            .post(url.clone())
            .header("PRIVATE-TOKEN", &self.token)
            .json(&body)
            .send()
            .map_err(|source| GitlabError::Request {
                operation: "create merge request",
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(GitlabError::ApiStatus {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let merge_request: MergeRequestResponse =
            response
                .json()
                .map_err(|source| GitlabError::ParseResponse {
                    url: url.to_string(),
                    source,
                })?;

        Ok(MergeRequest {
            iid: merge_request.iid,
            web_url: merge_request.web_url,
        })
    }
}

impl ReviewPlatform for GitlabClient {
    fn find_project(&self, path: &str) -> Result<Project, ReviewError> {
        self.get_project(path)
            .map_err(|e| ReviewError::ProjectLookupFailed {
                path: path.to_owned(),
                reason: describe(&e),
            })
    }

    fn create_merge_request(
        &self,
        source_project: &str,
        draft: &MergeRequestDraft,
    ) -> Result<MergeRequest, ReviewError> {
        self.open_merge_request(source_project, draft)
            .map_err(|e| ReviewError::MergeRequestFailed {
                source_branch: draft.source_branch.clone(),
                reason: describe(&e),
            })
    }
}
