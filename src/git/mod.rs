pub mod history;
pub mod repository;

pub use history::{last_commit_for_path, last_commits_for_paths, LastCommit};
pub use repository::ContentRepository;
