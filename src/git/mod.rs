//! Git workflow operations for release pipelines.
//!
//! Every operation works directly against the object database through libgit2
//! (no `git` binary), opens its own repository handle and releases it on return.
//! Commits and tags are authored by the service identity.

mod changelog;
mod commit;
mod merge;
mod remote;
mod tags;

pub use changelog::{CHANGELOG_HEADER, clean_commit_message, generate_changelog};
pub use commit::{commit, head_sha, tag};
pub use merge::{MERGE_REMOTE_NAME, MergeAnalysis, merge_remote_branch};
pub use remote::{authenticated_url, checkout, clone, fetch_ref, push};
pub use tags::{TagDetails, find_nearest_tag_name, get_tag_details};

use crate::error::{GitError, Result};
use chrono::{DateTime, Utc};
use git2::build::CheckoutBuilder;
use git2::{Repository, Signature};
use std::path::Path;

/// Name recorded on every commit and tag the pipeline creates
pub const SERVICE_NAME: &str = "kodegen-release";

/// Email recorded on every commit and tag the pipeline creates
pub const SERVICE_EMAIL: &str = "kodegen-release@users.noreply.github.com";

/// Open the repository at `path`, mapping failures to a filesystem error
pub(crate) fn open_repository(path: &Path) -> Result<Repository> {
    Repository::open(path).map_err(|e| {
        GitError::Filesystem {
            reason: format!("Failed to open repository at {}: {}", path.display(), e),
        }
        .into()
    })
}

/// Service identity stamped with the current time
pub(crate) fn service_signature() -> Result<Signature<'static>> {
    Ok(Signature::now(SERVICE_NAME, SERVICE_EMAIL)?)
}

/// Checkout strategy used when switching branches
///
/// Safe mode never overwrites local modifications; missing files are recreated.
pub(crate) fn safe_checkout<'cb>() -> CheckoutBuilder<'cb> {
    let mut builder = CheckoutBuilder::new();
    builder
        .safe()
        .recreate_missing(true)
        .allow_conflicts(true)
        .use_theirs(true);
    builder
}

/// Convert a libgit2 timestamp into UTC
pub(crate) fn git_time_to_utc(time: git2::Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.seconds(), 0).unwrap_or_default()
}
