//! Session naming conventions
//!
//! A session is addressed only by its name. Its worktree path, branch name and
//! window name are derived from that name on every call, never stored.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Default directory (relative to the repository root) holding session worktrees
pub const DEFAULT_WORKTREE_PREFIX: &str = ".worktrees";

/// Default prefix for session branches
pub const DEFAULT_BRANCH_PREFIX: &str = "claude";

static VALID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]*$").expect("valid regex"));

/// Prefixes used to derive worktree paths and branch names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Naming {
    /// Directory under the repository root holding worktrees
    pub worktree_prefix: String,
    /// Branch prefix (empty string means no prefix)
    pub branch_prefix: String,
}

impl Default for Naming {
    fn default() -> Self {
        Self::new(DEFAULT_WORKTREE_PREFIX, DEFAULT_BRANCH_PREFIX)
    }
}

impl Naming {
    pub fn new(worktree_prefix: impl Into<String>, branch_prefix: impl Into<String>) -> Self {
        Self {
            worktree_prefix: worktree_prefix.into(),
            branch_prefix: branch_prefix.into(),
        }
    }

    /// Directory that contains every session worktree of `repo_root`
    pub fn worktree_root(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.worktree_prefix)
    }

    /// `<repo_root>/<worktree_prefix>/<name>`
    pub fn worktree_path(&self, repo_root: &Path, name: &str) -> PathBuf {
        self.worktree_root(repo_root).join(name)
    }

    /// `<branch_prefix>/<name>`
    pub fn branch_name(&self, name: &str) -> String {
        let prefix = self.branch_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        }
    }

    /// Window name for a session (same as the session name)
    pub fn window_name<'a>(&self, name: &'a str) -> &'a str {
        name
    }

    /// Recover the session name from a worktree path.
    ///
    /// Returns `None` for worktrees that are not direct children of the worktree root,
    /// such as the main checkout.
    pub fn session_name_for_worktree(&self, repo_root: &Path, worktree: &Path) -> Option<String> {
        let root = self.worktree_root(repo_root);
        direct_child_name(&root, worktree).or_else(|| {
            let root = std::fs::canonicalize(&root).ok()?;
            let worktree = std::fs::canonicalize(worktree).ok()?;
            direct_child_name(&root, &worktree)
        })
    }
}

fn direct_child_name(root: &Path, path: &Path) -> Option<String> {
    let rest = path.strip_prefix(root).ok()?;
    let mut components = rest.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => name.to_str().map(String::from),
        _ => None,
    }
}

/// Check that a session name is usable as a directory, branch component and tmux target
pub fn validate_name(name: &str) -> Result<(), SessionError> {
    let invalid = |reason: &str| SessionError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name.contains("..") {
        return Err(invalid("name cannot contain '..'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid("name cannot end with '.lock'"));
    }
    if !VALID_NAME.is_match(name) {
        return Err(invalid(
            "use letters, digits, '.', '_' or '-', not starting with '.' or '-'",
        ));
    }
    Ok(())
}
