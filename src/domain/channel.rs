use std::fmt;
use std::path::PathBuf;

use super::ReleaseVersion;

/// Name of the operator as published on stage and stable
const OPERATOR_NAME: &str = "integreatly-operator";

/// Name of the operator as published on edge
const INTERNAL_OPERATOR_NAME: &str = "integreatly-operator-internal";

/// Directory in the integreatly-operator repo with the OLM manifest files
const SOURCE_MANIFESTS_DIRECTORY: &str = "deploy/olm-catalog/integreatly-operator";

/// One of the three places (stage, edge, stable) where the integreatly-operator is published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseChannel {
    Stage,
    Edge,
    Stable,
}

impl ReleaseChannel {
    /// Every channel, in the order a final release is published to them.
    pub const ALL: [Self; 3] = [Self::Stage, Self::Edge, Self::Stable];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stage => "stage",
            Self::Edge => "edge",
            Self::Stable => "stable",
        }
    }

    /// Name of the integreatly-operator on this channel
    #[must_use]
    pub fn operator_name(self) -> &'static str {
        match self {
            Self::Stage | Self::Stable => OPERATOR_NAME,
            Self::Edge => INTERNAL_OPERATOR_NAME,
        }
    }

    /// Path of the managed-tenants repo holding the operator for this channel,
    /// relative to the repository root.
    #[must_use]
    pub fn directory(self) -> String {
        let addons = match self {
            Self::Stage => "addons-stage",
            Self::Edge | Self::Stable => "addons-production",
        };
        format!("{addons}/{}", self.operator_name())
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version released to a single channel.
///
/// Every name and path the release workflow touches is derived from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTarget {
    channel: ReleaseChannel,
    version: ReleaseVersion,
}

impl ReleaseTarget {
    #[must_use]
    pub fn new(channel: ReleaseChannel, version: ReleaseVersion) -> Self {
        Self { channel, version }
    }

    #[must_use]
    pub fn channel(&self) -> ReleaseChannel {
        self.channel
    }

    #[must_use]
    pub fn version(&self) -> &ReleaseVersion {
        &self.version
    }

    /// Branch pushed to the fork, e.g. `integreatly-operator-stage-v2.1.0-rc1`
    #[must_use]
    pub fn branch_name(&self) -> String {
        format!("{OPERATOR_NAME}-{}-v{}", self.channel, self.version)
    }

    #[must_use]
    pub fn commit_message(&self) -> String {
        format!("update {OPERATOR_NAME} {} to {}", self.channel, self.version)
    }

    #[must_use]
    pub fn merge_request_title(&self) -> String {
        format!("Update {OPERATOR_NAME} {} to {}", self.channel, self.version)
    }

    /// Manifest directory in the integreatly-operator repo, relative to its root
    #[must_use]
    pub fn source_manifest_dir(&self) -> PathBuf {
        PathBuf::from(SOURCE_MANIFESTS_DIRECTORY).join(format!("{OPERATOR_NAME}-{}", self.version))
    }

    /// Manifest directory in the managed-tenants repo, relative to its root
    #[must_use]
    pub fn destination_manifest_dir(&self) -> PathBuf {
        PathBuf::from(self.channel.directory()).join(self.version.to_string())
    }

    /// Package index file in the managed-tenants repo, relative to its root
    #[must_use]
    pub fn package_index_path(&self) -> PathBuf {
        PathBuf::from(self.channel.directory())
            .join(format!("{}.package.yaml", self.channel.operator_name()))
    }

    /// Value the package index `currentCSV` must point at after the release
    #[must_use]
    pub fn current_csv(&self) -> String {
        format!("{}.v{}", self.channel.operator_name(), self.version)
    }
}
