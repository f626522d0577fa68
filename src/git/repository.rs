use git2::Repository;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ProviderError, Result};
use crate::git::history::{last_commit_for_path, last_commits_for_paths, LastCommit};

/// A git repository enclosing a content directory.
///
/// Content paths are relative to the content directory; git paths are
/// relative to the work tree. `prefix` is the content directory's location
/// inside the work tree and bridges the two.
pub struct ContentRepository {
    repo: Mutex<Repository>,
    prefix: PathBuf,
}

impl ContentRepository {
    pub fn discover<P: AsRef<Path>>(content_dir: P) -> Result<Self> {
        let content_dir = content_dir.as_ref();
        let display = content_dir.to_string_lossy().to_string();
        let repo = Repository::discover(content_dir).map_err(|_| ProviderError::NoRepository(display.clone()))?;

        let workdir = repo
            .workdir()
            .ok_or_else(|| ProviderError::NoRepository(format!("{} (bare repository)", display)))?;

        // Both sides canonicalized so symlinked temp dirs still line up.
        let workdir = workdir.canonicalize()?;
        let content_dir = content_dir.canonicalize()?;
        let prefix = content_dir
            .strip_prefix(&workdir)
            .map_err(|_| ProviderError::NoRepository(display.clone()))?
            .to_path_buf();

        Ok(Self {
            repo: Mutex::new(repo),
            prefix,
        })
    }

    pub fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let repo = self.repo.lock().map_err(|_| ProviderError::Internal("Lock poisoned".to_string()))?;
        f(&repo)
    }

    /// Work-tree path (always `/`-separated) for a content-relative path.
    pub fn repo_path(&self, relative: &str) -> String {
        let mut parts: Vec<String> = self
            .prefix
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        parts.push(relative.to_string());
        parts.join("/")
    }

    /// Short name of the checked-out branch; `None` when HEAD is detached.
    pub fn head_branch(&self) -> Result<Option<String>> {
        self.with_repo(|repo| {
            let head = repo.head()?;
            if head.is_branch() {
                Ok(head.shorthand().map(|s| s.to_string()))
            } else {
                Ok(None)
            }
        })
    }

    /// Blob id of a content file in the HEAD tree.
    pub fn blob_id_at_head(&self, relative: &str) -> Result<String> {
        let repo_path = self.repo_path(relative);
        self.with_repo(|repo| {
            let tree = repo.head()?.peel_to_commit()?.tree()?;
            let entry = tree
                .get_path(Path::new(&repo_path))
                .map_err(|_| ProviderError::NotFound(repo_path.clone()))?;
            Ok(entry.id().to_string())
        })
    }

    pub fn last_commit(&self, relative: &str) -> Result<Option<LastCommit>> {
        let repo_path = self.repo_path(relative);
        self.with_repo(|repo| last_commit_for_path(repo, &repo_path))
    }

    /// Last commits for many content-relative paths in one history walk,
    /// keyed by the content-relative path.
    pub fn last_commits(&self, relatives: &[String]) -> Result<HashMap<String, LastCommit>> {
        let by_repo_path: HashMap<String, &String> = relatives
            .iter()
            .map(|relative| (self.repo_path(relative), relative))
            .collect();
        let repo_paths: Vec<String> = by_repo_path.keys().cloned().collect();

        let found = self.with_repo(|repo| last_commits_for_paths(repo, &repo_paths))?;
        Ok(found
            .into_iter()
            .filter_map(|(repo_path, commit)| {
                by_repo_path
                    .get(&repo_path)
                    .map(|relative| ((*relative).clone(), commit))
            })
            .collect())
    }
}
