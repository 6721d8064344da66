//! Markdown changelog table for a commit range.

use super::{git_time_to_utc, open_repository};
use crate::error::Result;
use git2::Sort;
use std::path::Path;

/// Header and separator rows of every changelog
pub const CHANGELOG_HEADER: &str = "Timestamp |  SHA | Message | Author\n------------- | ------------- | ------------- | -------------\n";

/// Render the commits in `base..head` as a markdown table, newest first.
///
/// `base` and `head` accept anything libgit2 can resolve (sha, branch, tag).
pub fn generate_changelog(local_path: &Path, base: &str, head: &str) -> Result<String> {
    let repo = open_repository(local_path)?;

    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TIME)?;
    walk.push_range(&format!("{}..{}", base, head))?;

    let mut markdown = String::from(CHANGELOG_HEADER);
    for oid in walk {
        let commit = repo.find_commit(oid?)?;
        let author = commit.author();
        let sha = commit.id().to_string();

        markdown.push_str(&format!(
            "{} | {} | {} | {}\n",
            git_time_to_utc(author.when()).format("%Y-%m-%dT%H:%MZ"),
            &sha[..8],
            clean_commit_message(&String::from_utf8_lossy(commit.message_bytes())),
            String::from_utf8_lossy(author.name_bytes()),
        ));
    }

    Ok(markdown)
}

/// Make a commit message safe for a single markdown table cell
pub fn clean_commit_message(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return "--".to_string();
    }
    trimmed.replace('|', "/").replace('\n', " ")
}
