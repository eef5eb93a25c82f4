//! Repository discovery using gitoxide
//!
//! Resolves which repository a command operates on without spawning git.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::error::WorkspaceError;

/// Resolve the root of the main working tree for the repository containing `path`.
///
/// Searches parent directories. When `path` is inside a linked worktree (such as a
/// session worktree), the main checkout is returned, not the linked one.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn discover_repo_root(path: impl AsRef<Path>) -> Result<PathBuf, WorkspaceError> {
    let path = path.as_ref();

    let repo =
        gix::discover(path).map_err(|_| WorkspaceError::NotARepository(path.to_path_buf()))?;

    // `common_dir` is the shared `.git` directory for every worktree of the repository
    let root = repo
        .common_dir()
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| WorkspaceError::NotARepository(path.to_path_buf()))?;

    let root = std::fs::canonicalize(&root).unwrap_or(root);
    debug!("Discovered repository at {:?}", root);

    Ok(root)
}

/// Repository name (directory name of its root)
pub fn repo_name(repo_root: &Path) -> String {
    repo_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}
