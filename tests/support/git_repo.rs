//! Git repository builders shared by the unit tests and the integration
//! tests. The library includes this file with `#[path]`, so there is one copy.

use std::fs;
use std::path::Path;

use git2::{Repository, RepositoryInitOptions, Signature, Time};

pub fn init_repo(dir: &Path, branch: &str) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head(branch);
    Repository::init_opts(dir, &opts).unwrap()
}

/// Writes `files` into the work tree and commits them at `seconds`.
pub fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str, seconds: i64) {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();

    for (path, content) in files {
        let full = workdir.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, content).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();

    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::new("Jamie Pond", "jamie@example.com", &Time::new(seconds, 0)).unwrap();
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap();
}
