use std::fmt;

use crate::domain::Credentials;

/// Base URL of the GitLab instance hosting the managed-tenants origin and fork
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.cee.redhat.com";

/// Base URL of the forge hosting the integreatly-operator repo
pub const DEFAULT_GITHUB_URL: &str = "https://github.com";

pub const DEFAULT_MANAGED_TENANTS_ORIGIN: &str = "service/managed-tenants";
pub const DEFAULT_MANAGED_TENANTS_FORK: &str = "integreatly-qe/managed-tenants";
pub const DEFAULT_INTEGREATLY_OPERATOR: &str = "integr8ly/integreatly-operator.git";

/// The branch release branches start from and merge requests target
pub const DEFAULT_BASE_BRANCH: &str = "master";

/// Name of the managed-tenants remote release branches are pushed to
pub const FORK_REMOTE: &str = "fork";

/// All settings of a release run, built once at startup.
#[derive(Clone)]
pub struct Settings {
    pub gitlab_url: String,
    pub github_url: String,
    pub gitlab_user: String,
    pub gitlab_token: String,
    pub merge_request_description: String,
    /// `namespace/name` of the managed-tenants repo merge requests target
    pub managed_tenants_origin: String,
    /// `namespace/name` of the managed-tenants fork release branches are pushed to
    pub managed_tenants_fork: String,
    /// `namespace/name` of the integreatly-operator repo on the source forge
    pub integreatly_operator: String,
    pub base_branch: String,
}

impl Settings {
    /// Settings with every optional value at its default.
    #[must_use]
    pub fn new(gitlab_user: String, gitlab_token: String) -> Self {
        Self {
            gitlab_url: DEFAULT_GITLAB_URL.to_owned(),
            github_url: DEFAULT_GITHUB_URL.to_owned(),
            gitlab_user,
            gitlab_token,
            merge_request_description: String::new(),
            managed_tenants_origin: DEFAULT_MANAGED_TENANTS_ORIGIN.to_owned(),
            managed_tenants_fork: DEFAULT_MANAGED_TENANTS_FORK.to_owned(),
            integreatly_operator: DEFAULT_INTEGREATLY_OPERATOR.to_owned(),
            base_branch: DEFAULT_BASE_BRANCH.to_owned(),
        }
    }

    #[must_use]
    pub fn managed_tenants_origin_url(&self) -> String {
        join_url(&self.gitlab_url, &self.managed_tenants_origin)
    }

    #[must_use]
    pub fn managed_tenants_fork_url(&self) -> String {
        join_url(&self.gitlab_url, &self.managed_tenants_fork)
    }

    #[must_use]
    pub fn integreatly_operator_url(&self) -> String {
        join_url(&self.github_url, &self.integreatly_operator)
    }

    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.gitlab_user.clone(),
            token: self.gitlab_token.clone(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("gitlab_url", &self.gitlab_url)
            .field("github_url", &self.github_url)
            .field("gitlab_user", &self.gitlab_user)
            .field("gitlab_token", &"<redacted>")
            .field("merge_request_description", &self.merge_request_description)
            .field("managed_tenants_origin", &self.managed_tenants_origin)
            .field("managed_tenants_fork", &self.managed_tenants_fork)
            .field("integreatly_operator", &self.integreatly_operator)
            .field("base_branch", &self.base_branch)
            .finish()
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
