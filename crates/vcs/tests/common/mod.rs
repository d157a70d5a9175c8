//! Shared fixtures for the integration tests
//!
//! Repositories are built with `git2` so that fixture setup does not depend
//! on the code under test. Fake tools are small shell scripts.

#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use git2::{Commit, Oid, Repository, Signature, Time};
use tempfile::TempDir;

/// Author and committer time of every fixture commit (2015-08-23 00:08:37 UTC)
pub const COMMIT_TIME: i64 = 1440288517;

pub fn git_available() -> bool {
    utils::shell::resolve_executable_path_blocking("git").is_some()
}

/// A working repository with one commit of `README.md`, tagged `v1.0.0`
pub struct SourceRepo {
    pub root: TempDir,
    pub path: PathBuf,
    pub repo: Repository,
}

impl SourceRepo {
    pub fn init() -> Self {
        let root = TempDir::new().expect("create temp dir");
        let path = root.path().join("source");
        let repo = Repository::init(&path).expect("init git repo");
        let source = Self { root, path, repo };

        let oid = source.commit_file("README.md", "# fixture\n", "Initial commit");
        let object = source.repo.find_object(oid, None).expect("find commit");
        source
            .repo
            .tag_lightweight("v1.0.0", &object, false)
            .expect("tag commit");
        drop(object);
        source
    }

    /// Write `name`, stage it and commit on HEAD
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> Oid {
        fs::write(self.path.join(name), content).expect("write file");
        let mut index = self.repo.index().expect("open index");
        index.add_path(Path::new(name)).expect("stage file");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("write tree");
        let tree = self.repo.find_tree(tree_id).expect("find tree");

        let sig = Signature::new("Ada Lovelace", "ada@example.com", &Time::new(COMMIT_TIME, 0))
            .expect("signature");
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("commit")
    }

    pub fn path_str(&self) -> String {
        self.path.to_str().expect("utf-8 temp path").to_string()
    }

    pub fn file_url(&self) -> String {
        format!("file://{}", self.path_str())
    }

    /// A fresh path next to the source, not yet created
    pub fn sibling(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }
}

/// An empty bare repository
pub fn init_bare(path: &Path) -> Repository {
    Repository::init_bare(path).expect("init bare repo")
}

/// Write an executable `#!/bin/sh` script and return its path
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path.to_str().expect("utf-8 temp path").to_string()
}
