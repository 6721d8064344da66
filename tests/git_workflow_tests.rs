mod common;

use common::{EPOCH, Fixture};
use git2::Repository;
use kodegen_release_pipeline::error::{GitError, ReleaseError};
use kodegen_release_pipeline::git::{self, CHANGELOG_HEADER, MERGE_REMOTE_NAME, MergeAnalysis};
use std::path::PathBuf;

fn cloned(fixture: &Fixture) -> PathBuf {
    let parent = fixture.path("work");
    git::clone(&parent, "widget", &fixture.url()).unwrap()
}

fn git_error(result: kodegen_release_pipeline::Result<impl std::fmt::Debug>) -> GitError {
    match result {
        Err(ReleaseError::Git(e)) => e,
        other => panic!("expected git error, got {:?}", other),
    }
}

#[test]
fn clone_into_fresh_path() {
    let fixture = Fixture::new("0.1.0");
    let local = cloned(&fixture);

    assert!(local.is_absolute());
    assert!(local.ends_with("work/widget"));
    assert_eq!(std::fs::read_to_string(local.join("VERSION")).unwrap(), "0.1.0");
    assert_eq!(git::head_sha(&local).unwrap(), fixture.tip("master").to_string());
}

#[test]
fn clone_into_existing_path_fails() {
    let fixture = Fixture::new("0.1.0");
    let parent = fixture.path("work");
    std::fs::create_dir_all(parent.join("widget")).unwrap();

    let err = git_error(git::clone(&parent, "widget", &fixture.url()));
    assert!(matches!(err, GitError::Filesystem { .. }));
}

#[test]
fn checkout_creates_tracking_branch() {
    let fixture = Fixture::new("0.1.0");
    fixture.branch("feature", "master");
    let feature = fixture.commit("feature", &[("feature.txt", "new\n")], "Add feature", EPOCH + 60);
    let local = cloned(&fixture);

    git::checkout(&local, "feature").unwrap();

    assert_eq!(git::head_sha(&local).unwrap(), feature.to_string());
    assert!(local.join("feature.txt").is_file());
    let repo = Repository::open(&local).unwrap();
    let branch = repo.find_branch("feature", git2::BranchType::Local).unwrap();
    assert_eq!(
        branch.upstream().unwrap().name().unwrap(),
        Some("origin/feature")
    );
}

#[test]
fn fetch_ref_checks_out_host_merge_ref() {
    let fixture = Fixture::new("0.1.0");
    fixture.branch("merged", "master");
    let merged = fixture.commit("merged", &[("merged.txt", "x\n")], "Merge PR", EPOCH + 60);
    fixture
        .origin
        .reference("refs/pull/7/merge", merged, false, "host merge ref")
        .unwrap();
    let local = cloned(&fixture);

    git::fetch_ref(&local, "refs/pull/7/merge", "pr_7").unwrap();

    assert_eq!(git::head_sha(&local).unwrap(), merged.to_string());
    assert!(local.join("merged.txt").is_file());
}

#[test]
fn fast_forward_merge_moves_branch() {
    let fixture = Fixture::new("0.1.0");
    fixture.branch("feature", "master");
    let feature = fixture.commit("feature", &[("feature.txt", "new\n")], "Add feature", EPOCH + 60);
    let local = cloned(&fixture);

    let analysis =
        git::merge_remote_branch(&local, "pr_1", "master", &fixture.url(), "feature").unwrap();

    assert_eq!(analysis, MergeAnalysis::FastForward);
    assert_eq!(git::head_sha(&local).unwrap(), feature.to_string());
    assert!(local.join("feature.txt").is_file());

    let repo = Repository::open(&local).unwrap();
    assert_eq!(repo.head().unwrap().shorthand(), Some("pr_1"));
    assert!(repo.find_remote(MERGE_REMOTE_NAME).is_err());
}

#[test]
fn diverged_histories_get_a_merge_commit() {
    let fixture = Fixture::new("0.1.0");
    fixture.branch("feature", "master");
    let master = fixture.commit("master", &[("docs.md", "docs\n")], "Add docs", EPOCH + 60);
    let feature = fixture.commit("feature", &[("feature.txt", "new\n")], "Add feature", EPOCH + 120);
    let local = cloned(&fixture);

    let analysis =
        git::merge_remote_branch(&local, "pr_1", "master", &fixture.url(), "feature").unwrap();
    assert_eq!(analysis, MergeAnalysis::Normal);

    let repo = Repository::open(&local).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    let parents: Vec<_> = head.parent_ids().collect();
    assert_eq!(parents, [master, feature]);
    assert_eq!(head.message(), Some("Merge branch 'feature' into pr_1"));
    assert_eq!(head.author().name(), Some(git::SERVICE_NAME));

    assert!(local.join("docs.md").is_file());
    assert!(local.join("feature.txt").is_file());
    assert_eq!(repo.state(), git2::RepositoryState::Clean);
    assert!(repo.find_remote(MERGE_REMOTE_NAME).is_err());
}

#[test]
fn conflicting_merge_reports_paths() {
    let fixture = Fixture::new("0.1.0");
    fixture.branch("feature", "master");
    let master = fixture.commit("master", &[("VERSION", "1.0.0")], "Bump to 1.0.0", EPOCH + 60);
    fixture.commit("feature", &[("VERSION", "2.0.0")], "Bump to 2.0.0", EPOCH + 120);
    let local = cloned(&fixture);

    let err = git_error(git::merge_remote_branch(
        &local,
        "pr_1",
        "master",
        &fixture.url(),
        "feature",
    ));

    match err {
        GitError::MergeConflict {
            local_branch,
            remote_branch,
            paths,
        } => {
            assert_eq!(local_branch, "pr_1");
            assert_eq!(remote_branch, "feature");
            assert_eq!(paths, ["VERSION"]);
        }
        other => panic!("expected merge conflict, got {:?}", other),
    }
    assert_eq!(std::fs::read_to_string(local.join("VERSION")).unwrap(), "1.0.0");
    assert_eq!(git::head_sha(&local).unwrap(), master.to_string());
    let repo = Repository::open(&local).unwrap();
    assert!(repo.find_remote(MERGE_REMOTE_NAME).is_err());
}

#[test]
fn merging_a_contained_branch_is_nothing_to_merge() {
    let fixture = Fixture::new("0.1.0");
    fixture.branch("feature", "master");
    let local = cloned(&fixture);

    let err = git_error(git::merge_remote_branch(
        &local,
        "pr_1",
        "master",
        &fixture.url(),
        "feature",
    ));
    assert!(matches!(err, GitError::NothingToMerge { .. }));
}

#[test]
fn merging_an_ancestor_branch_is_nothing_to_merge() {
    let fixture = Fixture::new("0.1.0");
    fixture.branch("stale", "master");
    let master = fixture.commit("master", &[("docs.md", "docs\n")], "Add docs", EPOCH + 60);
    let local = cloned(&fixture);

    let err = git_error(git::merge_remote_branch(
        &local,
        "pr_1",
        "master",
        &fixture.url(),
        "stale",
    ));
    assert!(matches!(err, GitError::NothingToMerge { .. }));
    assert_eq!(git::head_sha(&local).unwrap(), master.to_string());
}

#[test]
fn tag_returns_tagged_commit() {
    let fixture = Fixture::new("0.1.0");
    let local = cloned(&fixture);
    std::fs::write(local.join("VERSION"), "0.1.1").unwrap();

    let commit = git::commit(&local, "(v0.1.1) release").unwrap();
    let tagged = git::tag(&local, "v0.1.1", "(v0.1.1) release").unwrap();

    assert_eq!(tagged, commit);
    assert_eq!(git::head_sha(&local).unwrap(), commit);

    let details = git::get_tag_details(&local, "v0.1.1").unwrap();
    assert!(details.annotated);
    assert_eq!(details.commit_sha, commit);
}

#[test]
fn commit_stages_deletions() {
    let fixture = Fixture::new("0.1.0");
    let local = cloned(&fixture);
    std::fs::remove_file(local.join("README.md")).unwrap();
    std::fs::write(local.join("NEW"), "n").unwrap();

    git::commit(&local, "reshuffle").unwrap();

    let repo = Repository::open(&local).unwrap();
    let tree = repo.head().unwrap().peel_to_tree().unwrap();
    assert!(tree.get_name("README.md").is_none());
    assert!(tree.get_name("NEW").is_some());
    assert!(tree.get_name("VERSION").is_some());
}

#[test]
fn changelog_lists_range_newest_first() {
    let fixture = Fixture::new("0.1.0");
    let first = fixture.tip("master");
    let second = fixture.commit("master", &[("a", "a")], "fix | pipe\nbody\n", EPOCH + 100);
    let third = fixture.commit("master", &[("b", "b")], "  \n", EPOCH + 200);
    let local = cloned(&fixture);

    let changelog = git::generate_changelog(&local, &first.to_string(), "master").unwrap();

    let expected = format!(
        "{}2017-07-14T02:43Z | {} | -- | Test Author\n2017-07-14T02:41Z | {} | fix / pipe body | Test Author\n",
        CHANGELOG_HEADER,
        &third.to_string()[..8],
        &second.to_string()[..8],
    );
    assert_eq!(changelog, expected);
}

#[test]
fn empty_range_is_header_only() {
    let fixture = Fixture::new("0.1.0");
    let local = cloned(&fixture);

    let changelog = git::generate_changelog(&local, "master", "master").unwrap();
    assert_eq!(changelog, CHANGELOG_HEADER);
}

#[test]
fn nearest_tag_and_details() {
    let fixture = Fixture::new("0.1.10");
    let first = fixture.tip("master");
    fixture.lightweight_tag("v0.1.10", first);
    let second = fixture.commit("master", &[("VERSION", "0.1.11")], "Release 0.1.11", EPOCH + 100);
    fixture.annotated_tag("v0.1.11", second, EPOCH + 150);
    fixture.commit("master", &[("c", "c")], "Work after release", EPOCH + 200);
    let local = cloned(&fixture);

    assert_eq!(git::find_nearest_tag_name(&local).unwrap(), "v0.1.11");

    let annotated = git::get_tag_details(&local, "v0.1.11").unwrap();
    assert!(annotated.annotated);
    assert_eq!(annotated.commit_sha, second.to_string());
    assert_eq!(
        annotated.commit_date.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        "2017-07-14T02:42:30Z"
    );

    let lightweight = git::get_tag_details(&local, "v0.1.10").unwrap();
    assert!(!lightweight.annotated);
    assert_eq!(lightweight.commit_sha, first.to_string());
    assert_eq!(
        lightweight.commit_date.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        "2017-07-14T02:40:00Z"
    );
}

#[test]
fn untagged_history_has_no_nearest_tag() {
    let fixture = Fixture::new("0.1.0");
    let local = cloned(&fixture);
    assert!(git::find_nearest_tag_name(&local).is_err());
}

#[test]
fn push_sends_branch_and_tag_together() {
    let fixture = Fixture::new("0.1.0");
    let local = cloned(&fixture);
    std::fs::write(local.join("VERSION"), "0.1.1").unwrap();
    let commit = git::commit(&local, "(v0.1.1) release").unwrap();
    git::tag(&local, "v0.1.1", "(v0.1.1) release").unwrap();

    git::push(&local, "master", "master", "v0.1.1").unwrap();

    assert_eq!(fixture.tip("master").to_string(), commit);
    let tag = fixture
        .origin
        .find_reference("refs/tags/v0.1.1")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(tag.id().to_string(), commit);
    assert_eq!(fixture.read_file("master", "VERSION"), "0.1.1");
}

#[test]
fn push_behind_remote_fails() {
    let fixture = Fixture::new("0.1.0");
    let local = cloned(&fixture);
    let remote_tip = fixture.commit("master", &[("other", "o")], "Concurrent change", EPOCH + 60);

    std::fs::write(local.join("VERSION"), "0.1.1").unwrap();
    git::commit(&local, "(v0.1.1) release").unwrap();
    git::tag(&local, "v0.1.1", "(v0.1.1) release").unwrap();

    assert!(git::push(&local, "master", "master", "v0.1.1").is_err());
    assert_eq!(fixture.tip("master"), remote_tip);
}
