//! Fixture repositories built directly with libgit2.

#![allow(dead_code)]

use git2::{Commit, Oid, Repository, Signature, Time};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 2017-07-14T02:40:00Z
pub const EPOCH: i64 = 1_500_000_000;

pub fn signature(time: i64) -> Signature<'static> {
    Signature::new("Test Author", "author@example.com", &Time::new(time, 0)).unwrap()
}

/// Bare `origin` repository under a temporary root
pub struct Fixture {
    _dir: TempDir,
    pub root: PathBuf,
    pub origin_path: PathBuf,
    pub origin: Repository,
}

impl Fixture {
    /// Origin with `master` holding `VERSION` and `README.md`
    pub fn new(version: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let origin_path = root.join("origin.git");
        let origin = Repository::init_bare(&origin_path).unwrap();

        let fixture = Self {
            _dir: dir,
            root,
            origin_path,
            origin,
        };
        fixture.commit(
            "master",
            &[("VERSION", version), ("README.md", "# widget\n")],
            "Initial commit",
            EPOCH,
        );
        fixture.origin.set_head("refs/heads/master").unwrap();
        fixture
    }

    /// Clone URL of the origin
    pub fn url(&self) -> String {
        self.origin_path.display().to_string()
    }

    /// Directory under the fixture root, not created
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Commit `files` on top of `branch` in the origin
    pub fn commit(&self, branch: &str, files: &[(&str, &str)], message: &str, time: i64) -> Oid {
        let refname = format!("refs/heads/{}", branch);
        let parent = self
            .origin
            .find_reference(&refname)
            .ok()
            .map(|reference| reference.peel_to_commit().unwrap());
        let parent_tree = parent.as_ref().map(|commit| commit.tree().unwrap());

        let mut builder = self.origin.treebuilder(parent_tree.as_ref()).unwrap();
        for (path, content) in files {
            let blob = self.origin.blob(content.as_bytes()).unwrap();
            builder.insert(*path, blob, 0o100644).unwrap();
        }
        let tree = self.origin.find_tree(builder.write().unwrap()).unwrap();

        let sig = signature(time);
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        self.origin
            .commit(Some(&refname), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    /// Create `branch` at the tip of `from`
    pub fn branch(&self, branch: &str, from: &str) -> Oid {
        let commit = self.tip(from);
        let commit = self.origin.find_commit(commit).unwrap();
        self.origin.branch(branch, &commit, false).unwrap();
        commit.id()
    }

    /// Sha at the tip of `branch`
    pub fn tip(&self, branch: &str) -> Oid {
        self.origin
            .find_reference(&format!("refs/heads/{}", branch))
            .unwrap()
            .peel_to_commit()
            .unwrap()
            .id()
    }

    /// Annotated tag on `target`, tagged at `time`
    pub fn annotated_tag(&self, name: &str, target: Oid, time: i64) {
        let object = self.origin.find_object(target, None).unwrap();
        self.origin
            .tag(name, &object, &signature(time), &format!("Release {}", name), false)
            .unwrap();
    }

    /// Lightweight tag on `target`
    pub fn lightweight_tag(&self, name: &str, target: Oid) {
        let object = self.origin.find_object(target, None).unwrap();
        self.origin.tag_lightweight(name, &object, false).unwrap();
    }

    /// Content of `path` at the tip of `branch`
    pub fn read_file(&self, branch: &str, path: &str) -> String {
        let commit = self.origin.find_commit(self.tip(branch)).unwrap();
        let entry = commit.tree().unwrap().get_path(Path::new(path)).unwrap();
        let blob = entry.to_object(&self.origin).unwrap().peel_to_blob().unwrap();
        String::from_utf8(blob.content().to_vec()).unwrap()
    }
}
