//! Process-backed workspace adapter
//!
//! Drives the `git` binary for all mutations and queries:
//! - Create / remove session worktrees
//! - List worktrees (porcelain format)
//! - Branch deletion and merge checks

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use super::{GitStatus, WorkspaceAdapter, Worktree};
use crate::error::WorkspaceError;
use crate::session::Naming;

/// Default trunk branch for merge checks
pub const DEFAULT_TRUNK_BRANCH: &str = "master";

/// Default base for new session branches
pub const DEFAULT_BASE_BRANCH: &str = "origin/master";

/// Workspace adapter backed by the `git` CLI, rooted at one repository
#[derive(Debug, Clone)]
pub struct GitWorkspace {
    repo_root: PathBuf,
    naming: Naming,
    trunk: String,
}

impl GitWorkspace {
    pub fn new(repo_root: impl Into<PathBuf>, naming: Naming) -> Self {
        Self {
            repo_root: repo_root.into(),
            naming,
            trunk: DEFAULT_TRUNK_BRANCH.to_string(),
        }
    }

    /// Use a different trunk branch for merge checks
    pub fn with_trunk(mut self, trunk: impl Into<String>) -> Self {
        self.trunk = trunk.into();
        self
    }

    /// Run git in the repository root and return stdout
    #[instrument(skip(self), fields(args = ?args))]
    async fn run(&self, operation: &'static str, args: &[&str]) -> Result<String, WorkspaceError> {
        let output = Command::new("git")
            .current_dir(&self.repo_root)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => WorkspaceError::NotInstalled,
                _ => WorkspaceError::CommandFailed {
                    operation,
                    message: e.to_string(),
                },
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!("git {} failed: {}", args.join(" "), stderr);
            Err(WorkspaceError::CommandFailed {
                operation,
                message: stderr,
            })
        }
    }
}

#[async_trait]
impl WorkspaceAdapter for GitWorkspace {
    fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn naming(&self) -> &Naming {
        &self.naming
    }

    fn trunk_branch(&self) -> &str {
        &self.trunk
    }

    async fn status(&self) -> Result<GitStatus, WorkspaceError> {
        let branch = self
            .run("get status", &["branch", "--show-current"])
            .await?;
        let porcelain = self
            .run("get status", &["status", "--porcelain"])
            .await?;

        Ok(parse_status(branch.trim(), &porcelain))
    }

    #[instrument(skip(self))]
    async fn create_worktree(
        &self,
        name: &str,
        base_branch: &str,
    ) -> Result<PathBuf, WorkspaceError> {
        let worktree_path = self.naming.worktree_path(&self.repo_root, name);
        let branch_name = self.naming.branch_name(name);

        if worktree_path.exists() {
            return Err(WorkspaceError::AlreadyExists(name.to_string()));
        }

        let path_arg = worktree_path.to_string_lossy();
        self.run(
            "create worktree",
            &[
                "worktree",
                "add",
                "-b",
                branch_name.as_str(),
                &*path_arg,
                base_branch,
            ],
        )
        .await?;

        info!(
            "Created worktree at {:?} with branch {} from {}",
            worktree_path, branch_name, base_branch
        );
        Ok(worktree_path)
    }

    #[instrument(skip(self))]
    async fn remove_worktree(&self, name: &str, force: bool) -> Result<(), WorkspaceError> {
        let worktree_path = self.naming.worktree_path(&self.repo_root, name);

        if !worktree_path.exists() {
            return Err(WorkspaceError::NotFound(name.to_string()));
        }

        let path_arg = worktree_path.to_string_lossy();
        let mut args = vec!["worktree", "remove", &*path_arg];
        if force {
            args.push("--force");
        }

        self.run("remove worktree", &args).await?;

        info!("Removed worktree at {:?}", worktree_path);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_worktrees(&self) -> Result<Vec<Worktree>, WorkspaceError> {
        let stdout = self
            .run("list worktrees", &["worktree", "list", "--porcelain"])
            .await?;

        Ok(parse_worktree_list(&stdout))
    }

    #[instrument(skip(self))]
    async fn delete_branch(&self, branch: &str, force: bool) -> Result<(), WorkspaceError> {
        let flag = if force { "-D" } else { "-d" };
        self.run("delete branch", &["branch", flag, branch]).await?;

        info!("Deleted branch {}", branch);
        Ok(())
    }

    async fn is_branch_merged(&self, branch: &str) -> Result<bool, WorkspaceError> {
        let stdout = self
            .run("check merge status", &["branch", "--merged", self.trunk.as_str()])
            .await?;

        Ok(merged_branches(&stdout).any(|b| b == branch))
    }

    async fn branch_exists(&self, branch: &str) -> Result<bool, WorkspaceError> {
        let reference = format!("refs/heads/{}", branch);
        match self
            .run(
                "check branch",
                &["rev-parse", "--verify", "--quiet", reference.as_str()],
            )
            .await
        {
            Ok(_) => Ok(true),
            // `--quiet` exits 1 with no output when the ref is missing
            Err(WorkspaceError::CommandFailed { message, .. }) if message.is_empty() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_current_branch(&self) -> Result<String, WorkspaceError> {
        let stdout = self
            .run("get current branch", &["branch", "--show-current"])
            .await?;
        Ok(stdout.trim().to_string())
    }

    #[instrument(skip(self))]
    async fn checkout_branch(&self, branch: &str) -> Result<(), WorkspaceError> {
        self.run("checkout branch", &["checkout", branch]).await?;
        Ok(())
    }
}

/// Interpret `git status --porcelain` output
fn parse_status(branch: &str, porcelain: &str) -> GitStatus {
    let has_uncommitted_changes = !porcelain.trim().is_empty();
    let has_untracked_files = porcelain.lines().any(|line| line.starts_with("??"));

    GitStatus {
        is_clean: !has_uncommitted_changes,
        branch: branch.to_string(),
        has_uncommitted_changes,
        has_untracked_files,
    }
}

/// Parse `git worktree list --porcelain` output.
///
/// Records are separated by blank lines; a record is kept only if it has a path.
/// A final record without a trailing blank line is still emitted.
fn parse_worktree_list(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut path: Option<PathBuf> = None;
    let mut commit: Option<String> = None;
    let mut branch: Option<String> = None;

    for line in output.lines() {
        if let Some(value) = line.strip_prefix("worktree ") {
            path = Some(PathBuf::from(value));
        } else if let Some(value) = line.strip_prefix("HEAD ") {
            commit = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("branch ") {
            let value = value.strip_prefix("refs/heads/").unwrap_or(value);
            branch = Some(value.to_string());
        } else if line.is_empty() {
            if let Some(path) = path.take() {
                worktrees.push(Worktree {
                    path,
                    branch: branch.take(),
                    commit: commit.take(),
                });
            }
            branch = None;
            commit = None;
        }
    }

    if let Some(path) = path {
        worktrees.push(Worktree {
            path,
            branch,
            commit,
        });
    }

    worktrees
}

/// Branch names from `git branch --merged`, stripped of the `*` (current) and
/// `+` (checked out in another worktree) markers
fn merged_branches(output: &str) -> impl Iterator<Item = &str> {
    output.lines().map(|line| {
        let line = line.trim();
        line.strip_prefix("* ")
            .or_else(|| line.strip_prefix("+ "))
            .unwrap_or(line)
            .trim()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_worktree_list() {
        let output = r#"worktree /path/to/main
HEAD abc123def456
branch refs/heads/master

worktree /path/to/main/.worktrees/feature-x
HEAD def456abc123
branch refs/heads/claude/feature-x
"#;

        let worktrees = parse_worktree_list(output);
        assert_eq!(
            worktrees,
            vec![
                Worktree {
                    path: PathBuf::from("/path/to/main"),
                    branch: Some("master".to_string()),
                    commit: Some("abc123def456".to_string()),
                },
                Worktree {
                    path: PathBuf::from("/path/to/main/.worktrees/feature-x"),
                    branch: Some("claude/feature-x".to_string()),
                    commit: Some("def456abc123".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_parse_worktree_list_trailing_record_without_blank_line() {
        let output = "worktree /a\nHEAD 111\n\nworktree /b\nHEAD 222\nbranch refs/heads/b";

        let worktrees = parse_worktree_list(output);
        assert_eq!(worktrees.len(), 2);
        assert_eq!(worktrees[1].path, PathBuf::from("/b"));
        assert_eq!(worktrees[1].branch.as_deref(), Some("b"));
    }

    #[test]
    fn test_parse_worktree_list_partial_fields() {
        let output = "worktree /bare\nbare\n\nworktree /detached\nHEAD 333\ndetached\n\nHEAD 444\nbranch refs/heads/orphan\n\n";

        let worktrees = parse_worktree_list(output);
        assert_eq!(
            worktrees,
            vec![
                Worktree {
                    path: PathBuf::from("/bare"),
                    branch: None,
                    commit: None,
                },
                Worktree {
                    path: PathBuf::from("/detached"),
                    branch: None,
                    commit: Some("333".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_parse_worktree_list_empty() {
        assert!(parse_worktree_list("").is_empty());
        assert!(parse_worktree_list("\n\n").is_empty());
    }

    #[test]
    fn test_parse_status() {
        let status = parse_status("master", "");
        assert!(status.is_clean);
        assert!(!status.has_uncommitted_changes);
        assert!(!status.has_untracked_files);

        let status = parse_status("master", " M src/lib.rs\n");
        assert!(!status.is_clean);
        assert!(status.has_uncommitted_changes);
        assert!(!status.has_untracked_files);

        let status = parse_status("dev", "?? notes.txt\n");
        assert!(!status.is_clean);
        assert!(status.has_untracked_files);
        assert_eq!(status.branch, "dev");
    }

    #[test]
    fn test_merged_branches_strips_markers() {
        let output = "  claude/a\n* master\n+ claude/b\n  claude/bb\n";
        let branches: Vec<&str> = merged_branches(output).collect();
        assert_eq!(branches, vec!["claude/a", "master", "claude/b", "claude/bb"]);
        assert!(!merged_branches(output).any(|b| b == "claude/c"));
    }

    #[tokio::test]
    async fn test_create_worktree_refuses_existing_path() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".worktrees/taken")).unwrap();

        // Not a repository: reaching git would fail with a different error
        let workspace = GitWorkspace::new(temp.path(), Naming::default());
        let err = workspace
            .create_worktree("taken", DEFAULT_BASE_BRANCH)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::AlreadyExists(name) if name == "taken"));
    }

    #[tokio::test]
    async fn test_remove_missing_worktree() {
        let temp = tempfile::TempDir::new().unwrap();
        let workspace = GitWorkspace::new(temp.path(), Naming::default());

        let err = workspace.remove_worktree("ghost", false).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound(name) if name == "ghost"));
    }
}
