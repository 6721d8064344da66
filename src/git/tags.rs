//! Tag lookups: nearest tag by distance and tag details.

use super::{git_time_to_utc, open_repository};
use crate::error::{GitError, Result};
use chrono::{DateTime, Utc};
use git2::{DescribeFormatOptions, DescribeOptions, ObjectType};
use std::path::Path;

/// Tag resolved to the commit it marks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDetails {
    /// Short tag name, e.g. `v1.2.3`
    pub short_name: String,
    /// Sha of the tagged commit
    pub commit_sha: String,
    /// Tagger date for annotated tags, author date for lightweight tags
    pub commit_date: DateTime<Utc>,
    /// Whether the tag is an annotated tag object
    pub annotated: bool,
}

/// Name of the tag nearest to HEAD by commit distance (`describe --tags --abbrev=0`)
pub fn find_nearest_tag_name(local_path: &Path) -> Result<String> {
    let repo = open_repository(local_path)?;
    let head = repo.head()?.peel(ObjectType::Commit)?;

    let mut options = DescribeOptions::new();
    options.describe_tags();
    let description = head.describe(&options)?;

    let mut format = DescribeFormatOptions::new();
    format.abbreviated_size(0);
    Ok(description.format(Some(&format))?)
}

/// Resolve `tag_name` to the commit it marks and its date
pub fn get_tag_details(local_path: &Path, tag_name: &str) -> Result<TagDetails> {
    let repo = open_repository(local_path)?;

    let reference = repo
        .resolve_reference_from_short_name(tag_name)
        .map_err(|e| GitError::Filesystem {
            reason: format!("Failed to resolve tag '{}': {}", tag_name, e),
        })?;
    let target = reference.target().ok_or_else(|| GitError::Filesystem {
        reason: format!("Tag '{}' is a symbolic reference", tag_name),
    })?;

    let details = match repo.find_tag(target) {
        Ok(tag) => {
            let commit = tag.target()?.peel_to_commit()?;
            let when = tag
                .tagger()
                .map(|tagger| tagger.when())
                .unwrap_or_else(|| commit.author().when());
            log::debug!(
                "Annotated tag ({}) Tag ID: {}, Commit ID: {}",
                tag_name,
                tag.id(),
                commit.id()
            );
            TagDetails {
                short_name: tag_name.to_string(),
                commit_sha: commit.id().to_string(),
                commit_date: git_time_to_utc(when),
                annotated: true,
            }
        }
        Err(_) => {
            let commit = repo.find_commit(target)?;
            log::debug!("Lightweight tag ({}) Commit ID: {}", tag_name, commit.id());
            TagDetails {
                short_name: tag_name.to_string(),
                commit_sha: commit.id().to_string(),
                commit_date: git_time_to_utc(commit.author().when()),
                annotated: false,
            }
        }
    };

    Ok(details)
}
