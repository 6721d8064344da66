//! Merging a branch from an arbitrary remote into a local branch.

use super::{open_repository, remote::remote_callbacks, safe_checkout, service_signature};
use crate::error::{GitError, Result};
use git2::build::CheckoutBuilder;
use git2::{BranchType, Commit, FetchOptions, Repository};
use std::path::Path;

/// Remote registered for the duration of a merge
pub const MERGE_REMOTE_NAME: &str = "kodegen-merge-source";

/// Outcome of merge analysis between the local branch and the fetched branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAnalysis {
    /// No merge is possible
    None,
    /// Fetched branch is already contained in the local branch
    UpToDate,
    /// Local branch can be moved forward without a merge commit
    FastForward,
    /// Histories diverged and need a merge commit
    Normal,
    /// Local HEAD is unborn
    Unborn,
}

impl MergeAnalysis {
    fn from_git(analysis: git2::MergeAnalysis) -> Self {
        if analysis.is_up_to_date() {
            MergeAnalysis::UpToDate
        } else if analysis.is_fast_forward() {
            MergeAnalysis::FastForward
        } else if analysis.is_normal() {
            MergeAnalysis::Normal
        } else if analysis.is_unborn() {
            MergeAnalysis::Unborn
        } else {
            MergeAnalysis::None
        }
    }
}

/// Registered remote that is deleted again when dropped
struct TemporaryRemote<'r> {
    repo: &'r Repository,
    name: &'static str,
}

impl<'r> TemporaryRemote<'r> {
    fn register(repo: &'r Repository, name: &'static str, url: &str) -> Result<Self> {
        if repo.find_remote(name).is_ok() {
            log::debug!("Removing stale remote '{}'", name);
            repo.remote_delete(name)?;
        }
        repo.remote(name, url)?;
        Ok(Self { repo, name })
    }
}

impl Drop for TemporaryRemote<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.repo.remote_delete(self.name) {
            log::warn!("Failed to remove temporary remote '{}': {}", self.name, e);
        }
    }
}

/// Merge `remote_branch` from `remote_url` into `local_branch`.
///
/// `local_branch` is created from `base_branch` (local, falling back to
/// `origin/<base_branch>`) when it does not exist yet. Fast-forwards move the branch
/// without a commit; diverged histories get a two-parent merge commit authored by the
/// service identity. Conflicts leave the working tree as it was before the merge.
pub fn merge_remote_branch(
    local_path: &Path,
    local_branch: &str,
    base_branch: &str,
    remote_url: &str,
    remote_branch: &str,
) -> Result<MergeAnalysis> {
    let repo = open_repository(local_path)?;

    let base_commit = resolve_base(&repo, base_branch)?;
    let branch = match repo.find_branch(local_branch, BranchType::Local) {
        Ok(existing) => existing,
        Err(_) => repo.branch(local_branch, &base_commit, false)?,
    };
    let local_commit = branch.get().peel_to_commit()?;
    let branch_ref = format!("refs/heads/{}", local_branch);

    repo.checkout_tree(local_commit.as_object(), Some(&mut safe_checkout()))?;
    repo.set_head(&branch_ref)?;

    let _remote = TemporaryRemote::register(&repo, MERGE_REMOTE_NAME, remote_url)?;
    let tracking_ref = format!("refs/remotes/{}/{}", MERGE_REMOTE_NAME, remote_branch);
    {
        let mut remote = repo.find_remote(MERGE_REMOTE_NAME)?;
        let refspec = format!("+refs/heads/{}:{}", remote_branch, tracking_ref);
        let mut options = FetchOptions::new();
        options.remote_callbacks(remote_callbacks(remote_url));
        log::info!("Fetching '{}' for merge into '{}'", remote_branch, local_branch);
        remote.fetch(&[refspec.as_str()], Some(&mut options), None)?;
    }

    let fetched = repo.find_reference(&tracking_ref)?;
    let annotated = repo.reference_to_annotated_commit(&fetched)?;
    let (analysis, _) = repo.merge_analysis(&[&annotated])?;
    let their_commit = repo.find_commit(annotated.id())?;

    match MergeAnalysis::from_git(analysis) {
        MergeAnalysis::None | MergeAnalysis::UpToDate => Err(GitError::NothingToMerge {
            local_branch: local_branch.to_string(),
            remote_branch: remote_branch.to_string(),
        }
        .into()),
        MergeAnalysis::FastForward => {
            log::info!("Fast-forwarding '{}' to {}", local_branch, their_commit.id());
            repo.checkout_tree(their_commit.as_object(), Some(&mut safe_checkout()))?;
            let mut reference = repo.find_reference(&branch_ref)?;
            reference.set_target(
                their_commit.id(),
                &format!("merge {}: Fast-forward", remote_branch),
            )?;
            repo.set_head(&branch_ref)?;
            Ok(MergeAnalysis::FastForward)
        }
        MergeAnalysis::Normal => {
            merge_commit(&repo, &local_commit, &their_commit, local_branch, remote_branch)?;
            Ok(MergeAnalysis::Normal)
        }
        other => Err(GitError::MergeAnalysisUnknown {
            analysis: format!("{:?}", other),
        }
        .into()),
    }
}

fn resolve_base<'r>(repo: &'r Repository, base_branch: &str) -> Result<Commit<'r>> {
    if let Ok(branch) = repo.find_branch(base_branch, BranchType::Local) {
        return Ok(branch.get().peel_to_commit()?);
    }

    let upstream_name = format!("origin/{}", base_branch);
    let branch = repo
        .find_branch(&upstream_name, BranchType::Remote)
        .map_err(|e| GitError::Filesystem {
            reason: format!("Failed to find base branch '{}': {}", base_branch, e),
        })?;
    Ok(branch.get().peel_to_commit()?)
}

fn merge_commit(
    repo: &Repository,
    ours: &Commit<'_>,
    theirs: &Commit<'_>,
    local_branch: &str,
    remote_branch: &str,
) -> Result<()> {
    let ancestor = repo.find_commit(repo.merge_base(ours.id(), theirs.id())?)?;
    let mut index = repo.merge_trees(&ancestor.tree()?, &ours.tree()?, &theirs.tree()?, None)?;

    if index.has_conflicts() {
        let paths = index
            .conflicts()?
            .filter_map(|conflict| conflict.ok())
            .filter_map(|conflict| conflict.our.or(conflict.their).or(conflict.ancestor))
            .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
            .collect();
        repo.cleanup_state()?;
        return Err(GitError::MergeConflict {
            local_branch: local_branch.to_string(),
            remote_branch: remote_branch.to_string(),
            paths,
        }
        .into());
    }

    let tree = repo.find_tree(index.write_tree_to(repo)?)?;
    let signature = service_signature()?;
    let message = format!("Merge branch '{}' into {}", remote_branch, local_branch);
    let merge_id = repo.commit(Some("HEAD"), &signature, &signature, &message, &tree, &[ours, theirs])?;
    log::info!("Created merge commit {} on '{}'", merge_id, local_branch);

    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    repo.cleanup_state()?;
    Ok(())
}
