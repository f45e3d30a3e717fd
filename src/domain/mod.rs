pub mod channel;
pub mod package_index;
pub mod review;
pub mod vcs;
pub mod version;

pub use channel::{ReleaseChannel, ReleaseTarget};
pub use package_index::{IndexError, PackageIndex};
pub use review::{MergeRequest, MergeRequestDraft, Project, ReviewError, ReviewPlatform};
pub use vcs::{CommitAuthor, Credentials, VcsError, WorkingCopy};
pub use version::{ReleaseVersion, VersionError};
