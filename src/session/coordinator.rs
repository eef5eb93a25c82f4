//! Session lifecycle coordinator
//!
//! Composes the workspace (git) and terminal (tmux) adapters into named sessions.
//! The coordinator keeps no state between calls: every operation re-reads git and
//! tmux, checks existence, and then acts.
//!
//! Existence checks are check-then-act. Two `vibe` processes racing on the same name
//! can both pass the guard; there is no cross-process locking.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::{Presence, Session, SessionEntry, SessionStatus, TeardownReport, validate_name};
use crate::error::{SessionError, SessionResource, TeardownStep, TerminalError};
use crate::git::{DEFAULT_BASE_BRANCH, WorkspaceAdapter};
use crate::tmux::{TerminalAdapter, Window};

/// Default command typed into a new session window
pub const DEFAULT_BOOTSTRAP_COMMAND: &str = "claude";

/// Coordinator settings that are not part of either adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Base for new session branches when `start` is given none
    pub base_branch: String,
    /// Command typed into new windows (`None` leaves a plain shell)
    pub bootstrap_command: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            bootstrap_command: Some(DEFAULT_BOOTSTRAP_COMMAND.to_string()),
        }
    }
}

/// Outcome of [`SessionCoordinator::attach`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The terminal was attached to the home session and has since detached
    Attached,
    /// Already inside tmux; only the window was selected
    AlreadyInside,
}

/// Coordinates session lifecycle across git and tmux
pub struct SessionCoordinator<W, T> {
    workspace: W,
    terminal: T,
    settings: SessionSettings,
}

impl<W: WorkspaceAdapter, T: TerminalAdapter> SessionCoordinator<W, T> {
    pub fn new(workspace: W, terminal: T, settings: SessionSettings) -> Self {
        Self {
            workspace,
            terminal,
            settings,
        }
    }

    pub fn workspace(&self) -> &W {
        &self.workspace
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn repo_root(&self) -> &Path {
        self.workspace.repo_root()
    }

    /// Worktree path for a session name
    pub fn worktree_path(&self, name: &str) -> PathBuf {
        self.workspace
            .naming()
            .worktree_path(self.workspace.repo_root(), name)
    }

    /// Branch name for a session name
    pub fn branch_name(&self, name: &str) -> String {
        self.workspace.naming().branch_name(name)
    }

    /// Start a session: worktree + branch, then a window in the home session.
    ///
    /// Fails with `AlreadyExists` before any mutation if the worktree, branch or window
    /// is already there. If the worktree was created but the window could not be, the
    /// error is `PartialSession` and the stray worktree must be cleaned up.
    #[instrument(skip(self))]
    pub async fn start(&self, name: &str, base_branch: Option<&str>) -> Result<Session, SessionError> {
        validate_name(name)?;

        let branch = self.branch_name(name);
        if self.workspace.worktree_exists(name) {
            return Err(already_exists(name, SessionResource::Worktree));
        }
        if self.workspace.branch_exists(&branch).await? {
            return Err(already_exists(name, SessionResource::Branch));
        }
        if self.find_window(name).await?.is_some() {
            return Err(already_exists(name, SessionResource::Window));
        }

        match self.workspace.status().await {
            Ok(status) if status.has_uncommitted_changes => warn!(
                "{} has uncommitted changes; they will not be part of session '{}'",
                self.workspace.repo_root().display(),
                name
            ),
            Ok(_) => {}
            Err(e) => warn!("Could not read repository status: {}", e),
        }

        let base = base_branch.unwrap_or(&self.settings.base_branch);
        let worktree = self.workspace.create_worktree(name, base).await?;

        let window_id = match self.open_window(name, &worktree).await {
            Ok(id) => id,
            Err(source) => {
                warn!("Window for session '{}' could not be created: {}", name, source);
                return Err(SessionError::PartialSession {
                    name: name.to_string(),
                    worktree,
                    source,
                });
            }
        };

        // Target by id: a numeric name would resolve to a window index
        let home = self.terminal.home_session();
        if let Some(command) = self.settings.bootstrap_command.as_deref() {
            self.terminal.send_keys(&window_id, command, home).await?;
        }
        self.terminal.select_window(&window_id, home).await?;

        info!("Started session '{}' on branch {}", name, branch);
        Ok(Session::new(
            name,
            self.workspace.repo_root(),
            self.workspace.naming().clone(),
        ))
    }

    /// Finish a session: kill its window, remove its worktree, delete its branch.
    ///
    /// Without `force` the branch must already be merged into trunk. Steps that
    /// completed before a failure are not rolled back.
    #[instrument(skip(self))]
    pub async fn done(&self, name: &str, force: bool) -> Result<TeardownReport, SessionError> {
        validate_name(name)?;

        let home = self.terminal.home_session();
        let branch = self.branch_name(name);
        let has_worktree = self.workspace.worktree_exists(name);
        let has_branch = self.workspace.branch_exists(&branch).await?;
        let window = self.find_window(name).await?;

        if !has_worktree && !has_branch && window.is_none() {
            return Err(SessionError::NotFound(name.to_string()));
        }

        // Without a branch there is nothing left to merge
        let status = if force || !has_branch {
            SessionStatus::Closed
        } else {
            let merged = self
                .workspace
                .is_branch_merged(&branch)
                .await
                .map_err(|e| SessionError::teardown(name, TeardownStep::MergeCheck, e))?;
            if !merged {
                return Err(SessionError::Unmerged {
                    name: name.to_string(),
                    branch,
                });
            }
            SessionStatus::Merged
        };

        // Killing the window we run in would kill this process mid-teardown
        let own_window = window.is_some() && self.current_session_name().await.as_deref() == Some(name);

        let mut window_killed = false;
        if !own_window {
            window_killed = self.kill_window(name, window.as_ref(), home).await?;
        }

        if has_worktree {
            self.workspace
                .remove_worktree(name, force)
                .await
                .map_err(|e| SessionError::teardown(name, TeardownStep::RemoveWorktree, e))?;
        } else {
            debug!("Worktree for session '{}' already removed", name);
        }

        if has_branch {
            let current = self
                .workspace
                .get_current_branch()
                .await
                .map_err(|e| SessionError::teardown(name, TeardownStep::CheckoutTrunk, e))?;
            if current == branch {
                let trunk = self.workspace.trunk_branch().to_string();
                self.workspace
                    .checkout_branch(&trunk)
                    .await
                    .map_err(|e| SessionError::teardown(name, TeardownStep::CheckoutTrunk, e))?;
            }

            self.workspace
                .delete_branch(&branch, force)
                .await
                .map_err(|e| SessionError::teardown(name, TeardownStep::DeleteBranch, e))?;
        }

        if own_window {
            window_killed = self.kill_window(name, window.as_ref(), home).await?;
        }

        info!("Finished session '{}' ({})", name, status);
        Ok(TeardownReport {
            name: name.to_string(),
            branch,
            window_killed,
            worktree_removed: has_worktree,
            branch_deleted: has_branch,
            status,
        })
    }

    /// List sessions of this repository.
    ///
    /// Every worktree under the worktree root is reported with its matching window, if
    /// any, and is `Merged` when its branch is already merged into trunk. Windows
    /// without a worktree are reported only with `include_orphan_windows`, since the
    /// home session always has its initial shell window.
    #[instrument(skip(self))]
    pub async fn list(&self, include_orphan_windows: bool) -> Result<Vec<SessionEntry>, SessionError> {
        let repo_root = self.workspace.repo_root();
        let naming = self.workspace.naming();

        let worktrees = self.workspace.list_worktrees().await?;
        let windows = self.home_windows().await?;

        let mut entries = Vec::new();
        for worktree in worktrees {
            let Some(name) = naming.session_name_for_worktree(repo_root, &worktree.path) else {
                continue;
            };
            let window = windows
                .iter()
                .find(|w| w.name == naming.window_name(&name))
                .cloned();
            let presence = if window.is_some() {
                Presence::Full
            } else {
                Presence::WorktreeOnly
            };
            let merged = match worktree.branch.as_deref() {
                Some(branch) => self.workspace.is_branch_merged(branch).await?,
                None => false,
            };
            let status = if merged {
                SessionStatus::Merged
            } else {
                SessionStatus::Active
            };
            entries.push(SessionEntry {
                name,
                worktree_path: Some(worktree.path),
                branch: worktree.branch,
                commit: worktree.commit,
                window,
                presence,
                status,
            });
        }

        if include_orphan_windows {
            let orphans: Vec<SessionEntry> = windows
                .into_iter()
                .filter(|w| !entries.iter().any(|e| e.name == w.name))
                .map(|w| SessionEntry {
                    name: w.name.clone(),
                    worktree_path: None,
                    branch: None,
                    commit: None,
                    window: Some(w),
                    presence: Presence::WindowOnly,
                    status: SessionStatus::Active,
                })
                .collect();
            entries.extend(orphans);
        }

        for entry in entries.iter().filter(|e| e.presence.is_partial()) {
            debug!("Session '{}' is partial: {}", entry.name, entry.presence);
        }

        Ok(entries)
    }

    /// Bring a session window to the front and attach to the home session if needed
    #[instrument(skip(self))]
    pub async fn attach(&self, name: Option<&str>) -> Result<AttachOutcome, SessionError> {
        let home = self.terminal.home_session();
        if !self.terminal.is_running().await {
            return Err(TerminalError::ServerNotRunning.into());
        }
        if !self.terminal.session_exists(home).await {
            return Err(TerminalError::SessionNotFound(home.to_string()).into());
        }

        if let Some(name) = name {
            validate_name(name)?;
            let window = self
                .find_window(name)
                .await?
                .ok_or_else(|| SessionError::NotFound(name.to_string()))?;
            self.terminal.select_window(&window.id, home).await?;
        }

        if self.terminal.is_inside_tmux() {
            return Ok(AttachOutcome::AlreadyInside);
        }

        self.terminal.attach_session(home).await?;
        Ok(AttachOutcome::Attached)
    }

    /// Session name of the window this process runs in, if it is a home-session window
    pub async fn current_session_name(&self) -> Option<String> {
        if !self.terminal.is_inside_tmux() {
            return None;
        }
        let session = self.terminal.current_session().await?;
        if session != self.terminal.home_session() {
            return None;
        }
        self.terminal
            .current_window()
            .await
            .filter(|window| validate_name(window).is_ok())
    }

    /// Windows of the home session; empty when the session or server is absent
    async fn home_windows(&self) -> Result<Vec<Window>, TerminalError> {
        let home = self.terminal.home_session();
        let sessions = self.terminal.list_sessions().await?;
        if !sessions.iter().any(|s| s.name == home) {
            return Ok(Vec::new());
        }

        match self.terminal.list_windows(home).await {
            Ok(windows) => Ok(windows),
            Err(e) if e.is_missing_target() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Window with exactly the session's name in the home session
    async fn find_window(&self, name: &str) -> Result<Option<Window>, TerminalError> {
        let home = self.terminal.home_session();
        if !self.terminal.session_exists(home).await {
            return Ok(None);
        }

        let window_name = self.workspace.naming().window_name(name);
        match self.terminal.list_windows(home).await {
            Ok(windows) => Ok(windows.into_iter().find(|w| w.name == window_name)),
            Err(e) if e.is_missing_target() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Kill the session window by id. A window that is already gone is not an error.
    async fn kill_window(
        &self,
        name: &str,
        window: Option<&Window>,
        home: &str,
    ) -> Result<bool, SessionError> {
        let Some(window) = window else {
            debug!("No window for session '{}'", name);
            return Ok(false);
        };

        // Target by id: tmux resolves names by prefix, which could hit another session
        match self.terminal.kill_window(&window.id, home).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_missing_target() => {
                info!("Window for session '{}' was already closed", name);
                Ok(false)
            }
            Err(e) => Err(SessionError::teardown(name, TeardownStep::KillWindow, e)),
        }
    }

    /// Ensure the home session exists and create the session window in the worktree.
    /// Returns the new window's id.
    async fn open_window(&self, name: &str, worktree: &Path) -> Result<String, TerminalError> {
        let home = self.terminal.home_session();
        if !self.terminal.session_exists(home).await {
            self.terminal.create_session(home).await?;
        }

        let window = self.workspace.naming().window_name(name);
        self.terminal
            .create_window(window, None, Some(worktree), home)
            .await
    }
}

fn already_exists(name: &str, resource: SessionResource) -> SessionError {
    SessionError::AlreadyExists {
        name: name.to_string(),
        resource,
    }
}
