//! Commits and annotated tags on HEAD.

use super::{open_repository, service_signature};
use crate::error::Result;
use git2::IndexAddOption;
use std::path::Path;

/// Stage every change in the working tree (deletions included) and commit on HEAD.
///
/// Returns the new commit sha.
pub fn commit(local_path: &Path, message: &str) -> Result<String> {
    let repo = open_repository(local_path)?;

    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"].iter(), None)?;
    index.write()?;

    let tree = repo.find_tree(index.write_tree()?)?;
    let parent = repo.head()?.peel_to_commit()?;
    let signature = service_signature()?;

    let commit_id = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])?;
    log::info!("Committed {}: {}", commit_id, message);

    Ok(commit_id.to_string())
}

/// Create annotated tag `version` on HEAD.
///
/// Returns the sha of the commit the tag points at.
pub fn tag(local_path: &Path, version: &str, message: &str) -> Result<String> {
    let repo = open_repository(local_path)?;

    let head = repo.head()?.peel_to_commit()?;
    let signature = service_signature()?;

    let tag_id = repo.tag(version, head.as_object(), &signature, message, false)?;
    let tag = repo.find_tag(tag_id)?;
    log::info!("Tagged {} as {}", tag.target_id(), version);

    Ok(tag.target_id().to_string())
}

/// Sha of the commit HEAD points at
pub fn head_sha(local_path: &Path) -> Result<String> {
    let repo = open_repository(local_path)?;
    let head = repo.head()?.peel_to_commit()?;
    Ok(head.id().to_string())
}
