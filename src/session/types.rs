//! Core session types
//!
//! A `Session` is the pairing of a git worktree and a tmux window that share a name.
//! Nothing here is persisted: values are rebuilt from git and tmux on every command.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Naming;
use crate::tmux::Window;

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session is live (worktree and/or window present)
    Active,
    /// Branch has been merged into trunk
    Merged,
    /// Session was torn down without a merge
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Merged => write!(f, "merged"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A coding session: one worktree plus one tmux window, addressed by name
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// User-chosen identifier, unique per repository
    pub name: String,
    /// Absolute path of the owning repository
    pub repository: PathBuf,
    /// When the session was started
    pub created_at: DateTime<Utc>,
    /// Current status
    pub status: SessionStatus,
    /// Associated pull request, owned by external tooling
    pub pr_url: Option<String>,
    #[serde(skip)]
    naming: Naming,
}

impl Session {
    /// Create a freshly started session
    pub fn new(name: impl Into<String>, repository: impl Into<PathBuf>, naming: Naming) -> Self {
        Self {
            name: name.into(),
            repository: repository.into(),
            created_at: Utc::now(),
            status: SessionStatus::Active,
            pr_url: None,
            naming,
        }
    }

    /// Worktree directory, derived from the name
    pub fn worktree_path(&self) -> PathBuf {
        self.naming.worktree_path(&self.repository, &self.name)
    }

    /// Branch name, derived from the name
    pub fn branch_name(&self) -> String {
        self.naming.branch_name(&self.name)
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }
}

/// Which halves of a session were found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Worktree and window both exist
    Full,
    /// Worktree exists but its window is gone
    WorktreeOnly,
    /// Window exists but its worktree is gone
    WindowOnly,
}

impl Presence {
    pub fn is_partial(&self) -> bool {
        !matches!(self, Self::Full)
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::WorktreeOnly => write!(f, "worktree only"),
            Self::WindowOnly => write!(f, "window only"),
        }
    }
}

/// One row of `list`: a session reconstructed from git and tmux state
#[derive(Debug, Clone, Serialize)]
pub struct SessionEntry {
    pub name: String,
    pub worktree_path: Option<PathBuf>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub window: Option<Window>,
    pub presence: Presence,
    /// `Merged` when the branch is already merged into trunk, `Active` otherwise.
    /// A branch with no commits of its own counts as merged.
    pub status: SessionStatus,
}

/// Outcome of a successful `done`
#[derive(Debug, Clone, Serialize)]
pub struct TeardownReport {
    pub name: String,
    pub branch: String,
    /// False when the window had already been closed
    pub window_killed: bool,
    /// False when the worktree was already gone
    pub worktree_removed: bool,
    /// False when the branch was already gone
    pub branch_deleted: bool,
    /// `Merged` after a verified merge, `Closed` after a forced cleanup
    pub status: SessionStatus,
}
