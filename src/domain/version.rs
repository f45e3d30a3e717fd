use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::ReleaseChannel;

const PRE_RELEASE_CHANNELS: &[ReleaseChannel] = &[ReleaseChannel::Stage];
const FINAL_RELEASE_CHANNELS: &[ReleaseChannel] = &ReleaseChannel::ALL;

/// Errors that can occur when parsing a release version
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The version string is empty.
    #[error("the version can not be empty")]
    Empty,

    /// The version string is not `base` or `base-build`.
    #[error("the version {version} is invalid: {reason}")]
    Invalid {
        version: String,
        reason: &'static str,
    },
}

/// An integreatly release identifier composed by a base part (2.0.0, 2.0.1, ...)
/// and an optional build part (ER1, RC2, ...) for pre-releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    base: String,
    build: Option<String>,
}

impl ReleaseVersion {
    /// Parse a version string of the form `base` or `base-build`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Empty`] for an empty string and [`VersionError::Invalid`]
    /// when either segment is empty or the string holds more than one `-`.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        if input.is_empty() {
            return Err(VersionError::Empty);
        }

        let invalid = |reason| VersionError::Invalid {
            version: input.to_owned(),
            reason,
        };

        let mut parts = input.split('-');
        let base = parts.next().unwrap_or_default();
        let build = parts.next();

        if parts.next().is_some() {
            return Err(invalid("expected at most one '-' separator"));
        }
        if base.is_empty() {
            return Err(invalid("the base part is empty"));
        }

        match build {
            None => Ok(Self {
                base: base.to_owned(),
                build: None,
            }),
            Some("") => Err(invalid("the build part is empty")),
            Some(build) => Ok(Self {
                base: base.to_owned(),
                build: Some(build.to_owned()),
            }),
        }
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// Returns true if the version ends with -ER1, -RC1, ...
    #[must_use]
    pub fn is_pre_release(&self) -> bool {
        self.build.is_some()
    }

    /// Channels this version is published to, in release order.
    ///
    /// Pre-releases only go to stage; final releases go to every channel.
    #[must_use]
    pub fn channels(&self) -> &'static [ReleaseChannel] {
        if self.is_pre_release() {
            PRE_RELEASE_CHANNELS
        } else {
            FINAL_RELEASE_CHANNELS
        }
    }

    /// The git tag the operator source is released under (e.g. `v2.1.0-rc1`).
    #[must_use]
    pub fn tag(&self) -> String {
        format!("v{self}")
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.build {
            Some(build) => write!(f, "{}-{}", self.base, build),
            None => write!(f, "{}", self.base),
        }
    }
}

impl FromStr for ReleaseVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
