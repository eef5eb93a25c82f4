//! Workspace capability interface
//!
//! The coordinator talks to version control only through [`WorkspaceAdapter`], so tests
//! can substitute a deterministic fake for the process-backed [`super::GitWorkspace`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::WorkspaceError;
use crate::session::Naming;

/// Snapshot of the main checkout's status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitStatus {
    /// Negation of `has_uncommitted_changes`
    pub is_clean: bool,
    /// Currently checked-out branch (empty when detached)
    pub branch: String,
    pub has_uncommitted_changes: bool,
    pub has_untracked_files: bool,
}

/// One entry of `git worktree list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worktree {
    pub path: PathBuf,
    /// Branch without the `refs/heads/` prefix; `None` when detached or bare
    pub branch: Option<String>,
    /// HEAD commit id
    pub commit: Option<String>,
}

/// Version-control operations used by the session coordinator.
///
/// Every fallible operation returns a `WorkspaceError`; implementations never panic on
/// tool failure.
#[async_trait]
pub trait WorkspaceAdapter: Send + Sync {
    /// Root of the main working tree
    fn repo_root(&self) -> &Path;

    /// Naming convention for worktree paths and branches
    fn naming(&self) -> &Naming;

    /// Branch that merge checks compare against
    fn trunk_branch(&self) -> &str;

    /// Whether the derived worktree path for `name` exists on disk
    fn worktree_exists(&self, name: &str) -> bool {
        self.naming().worktree_path(self.repo_root(), name).exists()
    }

    async fn status(&self) -> Result<GitStatus, WorkspaceError>;

    /// Create `<prefix>/<name>` from `base_branch` at the derived path; returns the path
    async fn create_worktree(&self, name: &str, base_branch: &str)
    -> Result<PathBuf, WorkspaceError>;

    async fn remove_worktree(&self, name: &str, force: bool) -> Result<(), WorkspaceError>;

    async fn list_worktrees(&self) -> Result<Vec<Worktree>, WorkspaceError>;

    async fn delete_branch(&self, branch: &str, force: bool) -> Result<(), WorkspaceError>;

    /// Whether `branch` is merged into the trunk branch
    async fn is_branch_merged(&self, branch: &str) -> Result<bool, WorkspaceError>;

    async fn branch_exists(&self, branch: &str) -> Result<bool, WorkspaceError>;

    async fn get_current_branch(&self) -> Result<String, WorkspaceError>;

    async fn checkout_branch(&self, branch: &str) -> Result<(), WorkspaceError>;
}
