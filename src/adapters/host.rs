//! Release host boundary used by the git source.

use super::NotifyState;
use crate::error::{Result, ScmError};
use crate::pipeline::ReleaseAsset;
use std::path::Path;

/// Release to create on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    /// `owner/name` of the repository receiving the release
    pub repo_full_name: String,
    /// Tag the release is attached to
    pub tag_name: String,
    /// Commit the tag points at
    pub target_commitish: String,
    /// Release title
    pub name: String,
    /// Markdown release notes
    pub body: String,
}

/// Release created on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseHandle {
    /// Host identifier of the release
    pub id: String,
    /// Tag the release is attached to
    pub tag_name: String,
}

/// Operations the git source needs from the hosting service
pub trait ReleaseHost {
    /// Create a release for an already pushed tag
    fn create_release(&mut self, request: &ReleaseRequest) -> Result<ReleaseHandle>;

    /// Attach the file at `path` to `release`
    fn upload_asset(
        &mut self,
        release: &ReleaseHandle,
        asset: &ReleaseAsset,
        path: &Path,
    ) -> Result<()>;

    /// Set the commit status of `sha`
    fn set_status(
        &mut self,
        repo_full_name: &str,
        sha: &str,
        state: NotifyState,
        message: &str,
    ) -> Result<()>;

    /// Delete `branch` from the repository
    fn delete_branch(&mut self, repo_full_name: &str, branch: &str) -> Result<()>;
}

/// Host that only logs; nothing is created remotely
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineHost;

impl ReleaseHost for OfflineHost {
    fn create_release(&mut self, request: &ReleaseRequest) -> Result<ReleaseHandle> {
        log::info!(
            "Release {} for {} at {} ({} bytes of notes)",
            request.tag_name,
            request.repo_full_name,
            request.target_commitish,
            request.body.len()
        );
        Ok(ReleaseHandle {
            id: format!("offline-{}", request.tag_name),
            tag_name: request.tag_name.clone(),
        })
    }

    fn upload_asset(
        &mut self,
        release: &ReleaseHandle,
        asset: &ReleaseAsset,
        path: &Path,
    ) -> Result<()> {
        let size = std::fs::metadata(path)
            .map_err(|e| ScmError::Host {
                reason: format!("cannot read asset {}: {}", path.display(), e),
            })?
            .len();
        log::info!(
            "Asset {} ({}, {} bytes) for release {}",
            asset.artifact_name,
            asset.content_type,
            size,
            release.id
        );
        Ok(())
    }

    fn set_status(
        &mut self,
        repo_full_name: &str,
        sha: &str,
        state: NotifyState,
        message: &str,
    ) -> Result<()> {
        log::info!("[{}@{}] {}: {}", repo_full_name, sha, state, message);
        Ok(())
    }

    fn delete_branch(&mut self, repo_full_name: &str, branch: &str) -> Result<()> {
        log::info!("Branch {} of {} can be deleted", branch, repo_full_name);
        Ok(())
    }
}
