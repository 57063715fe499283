//! Single source of truth for where the bridge reads and writes.
//!
//! Two independent layouts are resolved here: the per-project *memory
//! directory* the external agent runtime reads (`resolve_memory_dir`), and
//! the project-local `.memory-bridge/` directory this crate's own config
//! and Store database live under (`project::*`). Both are pure functions of
//! a working directory — no I/O happens here.

use std::path::{Path, PathBuf};

/// Ascend from `dir` until a directory containing a `.git` entry is found.
///
/// Returns `None` if the filesystem root is reached without finding one.
pub fn find_git_root(dir: &Path) -> Option<PathBuf> {
    let mut current = dir;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// The project root a working directory belongs to: the nearest ancestor
/// containing `.git`, or `working_dir` itself if none is found.
pub fn project_root(working_dir: &Path) -> PathBuf {
    find_git_root(working_dir).unwrap_or_else(|| working_dir.to_path_buf())
}

/// Derive a stable, filesystem-safe key for a project root: every path
/// separator becomes `-`, and a leading `-` (from an absolute path) is
/// stripped.
fn project_key(root: &Path) -> String {
    let raw = root.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "-");
    raw.strip_prefix('-').unwrap_or(&raw).to_string()
}

/// Compute the memory directory for a working directory:
/// `<home>/.claude/projects/<project-key>/memory`.
pub fn resolve_memory_dir(working_dir: &Path) -> PathBuf {
    resolve_memory_dir_under(working_dir, &user_home())
}

/// Same as [`resolve_memory_dir`] but with an explicit home directory, so
/// tests don't depend on the invoking user's real `$HOME`.
pub fn resolve_memory_dir_under(working_dir: &Path, home: &Path) -> PathBuf {
    let root = project_root(working_dir);
    let key = project_key(&root);
    home.join(".claude/projects").join(key).join("memory")
}

fn user_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Project-local paths the bridge itself owns, under `{root}/.memory-bridge/`.
pub mod project {
    use super::*;

    /// `{root}/.memory-bridge/`
    pub fn bridge_dir(root: &Path) -> PathBuf {
        root.join(".memory-bridge")
    }

    /// Bridge configuration file: `{root}/.memory-bridge/config.toml`
    pub fn config_path(root: &Path) -> PathBuf {
        bridge_dir(root).join("config.toml")
    }

    /// SQLite Store database: `{root}/.memory-bridge/store.db`
    pub fn store_db_path(root: &Path) -> PathBuf {
        bridge_dir(root).join("store.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn find_git_root_ascends_to_repo_root() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        let nested = repo.join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(repo.join(".git")).unwrap();

        assert_eq!(find_git_root(&nested), Some(repo));
    }

    #[test]
    fn find_git_root_returns_none_without_a_repo() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_git_root(&nested), None);
    }

    #[test]
    fn project_root_falls_back_to_working_dir() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(project_root(tmp.path()), tmp.path());
    }

    #[test]
    fn resolve_memory_dir_joins_under_home() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("my-project");
        std::fs::create_dir_all(repo.join(".git")).unwrap();
        let home = tmp.path().join("home");

        let memory_dir = resolve_memory_dir_under(&repo, &home);
        assert!(memory_dir.starts_with(home.join(".claude/projects")));
        assert!(memory_dir.ends_with("memory"));
    }

    #[test]
    fn resolve_memory_dir_is_pure() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("my-project");
        std::fs::create_dir_all(repo.join(".git")).unwrap();
        let home = tmp.path().join("home");

        let a = resolve_memory_dir_under(&repo, &home);
        let b = resolve_memory_dir_under(&repo, &home);
        assert_eq!(a, b);
        assert!(!home.exists(), "resolution must not touch the filesystem");
    }
}
