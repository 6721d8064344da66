//! Mutable data shared by every step of one pipeline run.

use crate::error::{Result, ScmError};
use serde::Deserialize;
use std::path::PathBuf;

/// Repository a commit reference belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoInfo {
    /// URL the repository is cloned from
    pub clone_url: String,
    /// Short repository name, used as the clone directory name
    pub name: String,
    /// `owner/name`
    pub full_name: String,
}

/// A commit on a named branch of a repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitRef {
    /// Commit sha
    pub sha: String,
    /// Branch name
    pub git_ref: String,
    /// Owning repository
    pub repo: RepoInfo,
}

impl CommitRef {
    /// Check that every field is populated.
    ///
    /// Reports the first missing field in the order sha, ref, clone url, name, full name.
    pub fn validate(&self) -> Result<()> {
        let fields: [(&'static str, &str); 5] = [
            ("sha", self.sha.as_str()),
            ("ref", self.git_ref.as_str()),
            ("repo.clone_url", self.repo.clone_url.as_str()),
            ("repo.name", self.repo.name.as_str()),
            ("repo.full_name", self.repo.full_name.as_str()),
        ];

        for (field, value) in fields {
            if value.is_empty() {
                return Err(ScmError::PayloadFormat { field }.into());
            }
        }
        Ok(())
    }
}

/// Event the pipeline releases from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    /// Pushed commit, or the pull request head
    pub head: CommitRef,
    /// Pull request base; `None` for push events
    pub base: Option<CommitRef>,
    /// Pull request number; `None` for push events
    pub pull_request: Option<u64>,
    /// Pull request title
    pub title: Option<String>,
}

impl Payload {
    /// Whether the payload describes a pull request
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// File uploaded to the release once it exists
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// Path relative to the working copy
    pub local_path: String,
    /// Name shown on the release
    pub artifact_name: String,
    /// MIME type sent with the upload
    pub content_type: String,
}

/// State threaded through the pipeline steps
#[derive(Debug, Default)]
pub struct PipelineState {
    /// Whether the run was triggered by a pull request
    pub is_pull_request: bool,
    /// Pushed commit or pull request head
    pub head: Option<CommitRef>,
    /// Pull request base
    pub base: Option<CommitRef>,
    /// Pull request number
    pub pull_request: Option<u64>,
    /// Directory holding the working copy; removed at the end of the run
    pub parent_path: Option<PathBuf>,
    /// Absolute path of the working copy
    pub local_path: Option<PathBuf>,
    /// Branch checked out in the working copy
    pub local_branch: String,
    /// Clone URL with credentials embedded
    pub remote_url: String,
    /// Tag nearest to the checked out commit, when one exists
    pub nearest_tag: Option<crate::git::TagDetails>,
    /// Version being released
    pub release_version: String,
    /// Commit the release tag points at
    pub release_commit: String,
    /// Files uploaded to the release
    pub release_assets: Vec<ReleaseAsset>,
}

impl PipelineState {
    /// Working copy path, or an error when checkout has not happened yet
    pub fn require_local_path(&self) -> Result<&std::path::Path> {
        self.local_path.as_deref().ok_or_else(|| {
            ScmError::PayloadUnsupported {
                reason: "working copy has not been checked out".to_string(),
            }
            .into()
        })
    }

    /// Sha notifications are reported against
    pub fn head_sha(&self) -> &str {
        self.head.as_ref().map(|head| head.sha.as_str()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;

    fn complete() -> CommitRef {
        CommitRef {
            sha: "0d1a26e67d8f5eaf1f6ba5c57fc3c7d91ac0fd1c".to_string(),
            git_ref: "master".to_string(),
            repo: RepoInfo {
                clone_url: "https://github.com/acme/widget.git".to_string(),
                name: "widget".to_string(),
                full_name: "acme/widget".to_string(),
            },
        }
    }

    fn missing_field(commit: &CommitRef) -> &'static str {
        match commit.validate() {
            Err(ReleaseError::Scm(ScmError::PayloadFormat { field })) => field,
            other => panic!("expected payload format error, got {:?}", other),
        }
    }

    #[test]
    fn complete_commit_ref_validates() {
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn each_missing_field_is_reported() {
        let mut commit = complete();
        commit.sha.clear();
        assert_eq!(missing_field(&commit), "sha");

        let mut commit = complete();
        commit.git_ref.clear();
        assert_eq!(missing_field(&commit), "ref");

        let mut commit = complete();
        commit.repo.clone_url.clear();
        assert_eq!(missing_field(&commit), "repo.clone_url");

        let mut commit = complete();
        commit.repo.name.clear();
        assert_eq!(missing_field(&commit), "repo.name");

        let mut commit = complete();
        commit.repo.full_name.clear();
        assert_eq!(missing_field(&commit), "repo.full_name");
    }

    #[test]
    fn first_missing_field_wins() {
        let commit = CommitRef::default();
        assert_eq!(missing_field(&commit), "sha");
    }
}
