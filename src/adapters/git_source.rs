//! Source adapter for plain git remotes with a pluggable release host.
//!
//! The payload is assembled from `scm_*` settings, checkouts go through the git
//! workflow engine, and releases, statuses and branch deletion go through a
//! [`ReleaseHost`].

use super::{NotificationSink, NotifyState, ReleaseHandle, ReleaseHost, ReleaseRequest, SourceAdapter};
use crate::config::Settings;
use crate::error::{Result, ScmError};
use crate::git;
use crate::pipeline::{CommitRef, Payload, PipelineState, RepoInfo};
use crate::retry::retry_with_delay;
use std::path::Path;
use std::time::Duration;

/// Source adapter registered as `git`
pub struct GitSource {
    host: Box<dyn ReleaseHost>,
    status_repo: Option<String>,
}

impl GitSource {
    /// Source publishing through `host`
    pub fn new(host: Box<dyn ReleaseHost>) -> Self {
        Self {
            host,
            status_repo: None,
        }
    }

    fn changelog(&self, settings: &Settings, state: &PipelineState, local_path: &Path) -> String {
        let tag_range = match &state.nearest_tag {
            Some(tag) if !settings.scm_disable_nearest_tag_changelog => {
                Some((tag.commit_sha.clone(), state.local_branch.clone()))
            }
            _ => None,
        };
        let pr_range = match (state.is_pull_request, &state.base, &state.head) {
            (true, Some(base), Some(head)) => Some((base.sha.clone(), head.sha.clone())),
            _ => None,
        };

        for (base, head) in tag_range.into_iter().chain(pr_range) {
            match git::generate_changelog(local_path, &base, &head) {
                Ok(changelog) => return changelog,
                Err(e) => log::warn!("Failed to generate changelog for {}..{}: {}", base, head, e),
            }
        }

        log::info!("No changelog range available, release notes will be empty");
        String::new()
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(ScmError::PayloadFormat { field }.into()),
    }
}

fn head_ref(settings: &Settings) -> Result<CommitRef> {
    let commit = CommitRef {
        sha: required(&settings.scm_sha, "sha")?,
        git_ref: required(&settings.scm_branch, "ref")?,
        repo: RepoInfo {
            clone_url: required(&settings.scm_clone_url, "repo.clone_url")?,
            name: required(&settings.scm_repo_name, "repo.name")?,
            full_name: required(&settings.scm_repo_full_name, "repo.full_name")?,
        },
    };
    commit.validate()?;
    Ok(commit)
}

fn base_ref(settings: &Settings) -> Result<CommitRef> {
    let commit = CommitRef {
        sha: required(&settings.scm_base_sha, "sha")?,
        git_ref: required(&settings.scm_base_branch, "ref")?,
        repo: RepoInfo {
            clone_url: required(&settings.scm_base_clone_url, "repo.clone_url")?,
            name: required(&settings.scm_base_repo_name, "repo.name")?,
            full_name: required(&settings.scm_base_repo_full_name, "repo.full_name")?,
        },
    };
    commit.validate()?;
    Ok(commit)
}

fn lookup_nearest_tag(local_path: &Path) -> Option<git::TagDetails> {
    let lookup = git::find_nearest_tag_name(local_path)
        .and_then(|name| git::get_tag_details(local_path, &name));
    match lookup {
        Ok(details) => {
            log::info!("Nearest tag: {} ({})", details.short_name, details.commit_sha);
            Some(details)
        }
        Err(e) => {
            log::debug!("No nearest tag: {}", e);
            None
        }
    }
}

impl NotificationSink for GitSource {
    fn notify(&mut self, sha: &str, state: NotifyState, message: &str) -> Result<()> {
        match &self.status_repo {
            Some(repo) => self.host.set_status(repo, sha, state, message),
            None => {
                log::info!("{} {}: {}", sha, state, message);
                Ok(())
            }
        }
    }
}

impl SourceAdapter for GitSource {
    fn init(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()> {
        let parent_path = match &settings.scm_git_parent_path {
            Some(path) => {
                std::fs::create_dir_all(path)?;
                path.clone()
            }
            None => tempfile::Builder::new()
                .prefix("kodegen-release-")
                .tempdir()?
                .keep(),
        };

        log::info!("Working copies will be cloned under {}", parent_path.display());
        state.parent_path = Some(parent_path);
        Ok(())
    }

    fn retrieve_payload(
        &mut self,
        settings: &Settings,
        state: &mut PipelineState,
    ) -> Result<Payload> {
        let head = head_ref(settings)?;

        let payload = match settings.scm_pull_request {
            None => {
                self.status_repo = Some(head.repo.full_name.clone());
                Payload {
                    head,
                    base: None,
                    pull_request: None,
                    title: None,
                }
            }
            Some(number) => {
                if settings.scm_pull_request_state != "open" {
                    return Err(ScmError::PayloadUnsupported {
                        reason: format!(
                            "pull request #{} is {}, only open pull requests can be released",
                            number, settings.scm_pull_request_state
                        ),
                    }
                    .into());
                }

                let base = base_ref(settings)?;
                if let Some(default_branch) = &settings.scm_default_branch
                    && &base.git_ref != default_branch
                {
                    return Err(ScmError::PayloadUnsupported {
                        reason: format!(
                            "pull request #{} targets '{}', releases are only made from '{}'",
                            number, base.git_ref, default_branch
                        ),
                    }
                    .into());
                }

                self.status_repo = Some(base.repo.full_name.clone());
                Payload {
                    head,
                    base: Some(base),
                    pull_request: Some(number),
                    title: settings.scm_pull_request_title.clone(),
                }
            }
        };

        state.is_pull_request = payload.is_pull_request();
        state.head = Some(payload.head.clone());
        state.base = payload.base.clone();
        state.pull_request = payload.pull_request;
        Ok(payload)
    }

    fn checkout_push_payload(
        &mut self,
        settings: &Settings,
        state: &mut PipelineState,
        payload: &Payload,
    ) -> Result<()> {
        let head = &payload.head;
        let parent_path = state
            .parent_path
            .clone()
            .ok_or_else(|| ScmError::PayloadUnsupported {
                reason: "source was not initialized".to_string(),
            })?;

        state.remote_url =
            git::authenticated_url(&head.repo.clone_url, settings.scm_access_token.as_deref())?;
        let local_path = git::clone(&parent_path, &head.repo.name, &state.remote_url)?;
        git::checkout(&local_path, &head.git_ref)?;

        match git::head_sha(&local_path) {
            Ok(sha) if sha != head.sha => log::warn!(
                "Checked out {} at {}, but the payload names {}",
                head.git_ref,
                sha,
                head.sha
            ),
            Ok(_) => {}
            Err(e) => log::warn!("Could not read HEAD of {}: {}", local_path.display(), e),
        }

        state.nearest_tag = lookup_nearest_tag(&local_path);
        state.local_branch = head.git_ref.clone();
        state.local_path = Some(local_path);
        Ok(())
    }

    fn checkout_pull_request_payload(
        &mut self,
        settings: &Settings,
        state: &mut PipelineState,
        payload: &Payload,
    ) -> Result<()> {
        let base = payload
            .base
            .as_ref()
            .ok_or(ScmError::PayloadFormat { field: "base" })?;
        let number = payload
            .pull_request
            .ok_or(ScmError::PayloadFormat { field: "pull_request" })?;
        let parent_path = state
            .parent_path
            .clone()
            .ok_or_else(|| ScmError::PayloadUnsupported {
                reason: "source was not initialized".to_string(),
            })?;
        let token = settings.scm_access_token.as_deref();

        state.remote_url = git::authenticated_url(&base.repo.clone_url, token)?;
        let local_path = git::clone(&parent_path, &base.repo.name, &state.remote_url)?;
        let local_branch = format!("pr_{}", number);

        match &settings.scm_pull_request_merge_ref {
            Some(merge_ref) => {
                let remote_ref = merge_ref.replace("{number}", &number.to_string());
                git::fetch_ref(&local_path, &remote_ref, &local_branch)?;
            }
            None => {
                let head_url = git::authenticated_url(&payload.head.repo.clone_url, token)?;
                let analysis = git::merge_remote_branch(
                    &local_path,
                    &local_branch,
                    &base.git_ref,
                    &head_url,
                    &payload.head.git_ref,
                )?;
                log::info!("Merged pull request #{} ({:?})", number, analysis);
            }
        }

        state.nearest_tag = lookup_nearest_tag(&local_path);
        state.local_branch = local_branch;
        state.local_path = Some(local_path);
        Ok(())
    }

    fn publish(&mut self, settings: &Settings, state: &mut PipelineState) -> Result<()> {
        let local_path = state.require_local_path()?.to_path_buf();
        let target = match (state.is_pull_request, &state.base, &state.head) {
            (true, Some(base), _) => base.clone(),
            (_, _, Some(head)) => head.clone(),
            _ => return Err(ScmError::PayloadFormat { field: "head" }.into()),
        };
        let tag_name = format!("v{}", state.release_version);

        git::push(&local_path, &state.local_branch, &target.git_ref, &tag_name)?;

        let request = ReleaseRequest {
            repo_full_name: target.repo.full_name.clone(),
            tag_name: tag_name.clone(),
            target_commitish: state.release_commit.clone(),
            name: tag_name,
            body: self.changelog(settings, state, &local_path),
        };
        let release = self.host.create_release(&request)?;

        self.publish_assets(settings, state, &release)
    }

    fn publish_assets(
        &mut self,
        settings: &Settings,
        state: &PipelineState,
        release: &ReleaseHandle,
    ) -> Result<()> {
        let local_path = state.require_local_path()?;
        let delay = Duration::from_millis(settings.scm_asset_upload_delay_ms);

        for asset in &state.release_assets {
            let path = local_path.join(&asset.local_path);
            let host = &mut self.host;
            let uploaded = retry_with_delay(
                || host.upload_asset(release, asset, &path),
                settings.scm_asset_upload_attempts,
                delay,
                &format!("upload of {}", asset.artifact_name),
            );

            // a missing asset should not fail an otherwise complete release
            if let Err(e) = uploaded {
                log::warn!("Skipping asset {}: {}", asset.artifact_name, e);
            }
        }
        Ok(())
    }

    fn cleanup(&mut self, settings: &Settings, state: &PipelineState) -> Result<()> {
        let skipped = |reason: &str| -> Result<()> {
            Err(ScmError::CleanupSkipped {
                reason: reason.to_string(),
            }
            .into())
        };

        if !settings.scm_enable_branch_cleanup {
            return skipped("branch cleanup is disabled");
        }
        let (Some(head), Some(base)) = (&state.head, &state.base) else {
            return skipped("not a pull request");
        };
        if !state.is_pull_request {
            return skipped("not a pull request");
        }
        if head.repo.full_name != base.repo.full_name {
            return skipped("pull request comes from a different repository");
        }
        let default_branch = settings.scm_default_branch.as_deref().unwrap_or("master");
        if head.git_ref == default_branch || head.git_ref == "master" {
            return skipped("refusing to delete the default branch");
        }

        self.host.delete_branch(&head.repo.full_name, &head.git_ref)
    }
}
