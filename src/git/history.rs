use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use git2::{DiffOptions, Repository, Sort};

use crate::error::Result;

/// Author attribution of the newest commit touching a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastCommit {
    pub oid: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub date: DateTime<Utc>,
}

fn commit_to_last(commit: &git2::Commit) -> LastCommit {
    let author = commit.author();
    let date = Utc
        .timestamp_opt(author.when().seconds(), 0)
        .single()
        .unwrap_or_else(Utc::now);

    LastCommit {
        oid: commit.id().to_string(),
        author_name: author.name().unwrap_or("Unknown").to_string(),
        author_email: author.email().map(|e| e.to_string()).filter(|e| !e.is_empty()),
        date,
    }
}

/// Walks history from HEAD (newest first) and returns the first commit that
/// changed `path`. `None` when no commit ever touched it.
pub fn last_commit_for_path(repo: &Repository, path: &str) -> Result<Option<LastCommit>> {
    let mut found = last_commits_for_paths(repo, &[path.to_string()])?;
    Ok(found.remove(path))
}

/// Newest commit touching each of `paths`, found in a single walk from HEAD
/// that stops once every path is accounted for. Paths no commit ever
/// touched are absent from the map.
pub fn last_commits_for_paths(repo: &Repository, paths: &[String]) -> Result<HashMap<String, LastCommit>> {
    let mut results = HashMap::new();
    if paths.is_empty() {
        return Ok(results);
    }

    let mut remaining: HashSet<&str> = paths.iter().map(String::as_str).collect();

    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TIME)?;
    revwalk.push_head()?;

    for oid in revwalk {
        if remaining.is_empty() {
            break;
        }

        let oid = oid?;
        let commit = repo.find_commit(oid)?;

        for path in touched_paths(repo, &commit, &remaining)? {
            if remaining.remove(path.as_str()) {
                results.insert(path, commit_to_last(&commit));
            }
        }
    }

    Ok(results)
}

/// Which of `paths` this commit changed relative to its first parent.
fn touched_paths(repo: &Repository, commit: &git2::Commit, paths: &HashSet<&str>) -> Result<Vec<String>> {
    let tree = commit.tree()?;

    let parent_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let mut opts = DiffOptions::new();
    for path in paths {
        opts.pathspec(*path);
    }
    opts.disable_pathspec_match(true);

    let diff = repo.diff_tree_to_tree(
        parent_tree.as_ref(),
        Some(&tree),
        Some(&mut opts),
    )?;

    let mut touched = Vec::new();
    for delta in diff.deltas() {
        for file in [delta.new_file(), delta.old_file()] {
            if let Some(path) = file.path().and_then(|p| p.to_str()) {
                if paths.contains(path) && !touched.iter().any(|t| t == path) {
                    touched.push(path.to_string());
                }
            }
        }
    }

    Ok(touched)
}
