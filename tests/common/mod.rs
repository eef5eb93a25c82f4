//! In-memory adapters for coordinator tests
//!
//! `FakeWorkspace` and `FakeTerminal` keep their state behind a shared `Arc<Mutex<_>>`
//! so a test can hand one clone to the coordinator and inspect the other. Every
//! mutating call is appended to a call log.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vibe::error::{TerminalError, WorkspaceError};
use vibe::git::{GitStatus, WorkspaceAdapter, Worktree};
use vibe::session::{Naming, SessionCoordinator, SessionSettings};
use vibe::tmux::{TerminalAdapter, TmuxSession, Window};

pub const REPO_ROOT: &str = "/repo";
pub const HOME: &str = "vibe";

#[derive(Debug, Default)]
pub struct WorkspaceState {
    /// Session name -> branch checked out in its worktree
    pub worktrees: BTreeMap<String, String>,
    pub branches: BTreeSet<String>,
    pub merged: BTreeSet<String>,
    pub current_branch: String,
    pub dirty: bool,
    pub calls: Vec<String>,
    pub fail_remove: bool,
    pub fail_merge_check: bool,
}

#[derive(Clone)]
pub struct FakeWorkspace {
    root: PathBuf,
    naming: Naming,
    pub state: Arc<Mutex<WorkspaceState>>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        let state = WorkspaceState {
            branches: BTreeSet::from(["master".to_string()]),
            current_branch: "master".to_string(),
            ..WorkspaceState::default()
        };
        Self {
            root: PathBuf::from(REPO_ROOT),
            naming: Naming::default(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Add a worktree and its branch as if `start` had created them earlier
    pub fn add_session(&self, name: &str) {
        let branch = self.naming.branch_name(name);
        let mut state = self.state.lock().unwrap();
        state.worktrees.insert(name.to_string(), branch.clone());
        state.branches.insert(branch);
    }

    pub fn mark_merged(&self, name: &str) {
        let branch = self.naming.branch_name(name);
        self.state.lock().unwrap().merged.insert(branch);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn has_worktree(&self, name: &str) -> bool {
        self.state.lock().unwrap().worktrees.contains_key(name)
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.state.lock().unwrap().branches.contains(branch)
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl WorkspaceAdapter for FakeWorkspace {
    fn repo_root(&self) -> &Path {
        &self.root
    }

    fn naming(&self) -> &Naming {
        &self.naming
    }

    fn trunk_branch(&self) -> &str {
        "master"
    }

    fn worktree_exists(&self, name: &str) -> bool {
        self.has_worktree(name)
    }

    async fn status(&self) -> Result<GitStatus, WorkspaceError> {
        let state = self.state.lock().unwrap();
        Ok(GitStatus {
            is_clean: !state.dirty,
            branch: state.current_branch.clone(),
            has_uncommitted_changes: state.dirty,
            has_untracked_files: false,
        })
    }

    async fn create_worktree(
        &self,
        name: &str,
        base_branch: &str,
    ) -> Result<PathBuf, WorkspaceError> {
        self.record(format!("create_worktree {} {}", name, base_branch));
        let branch = self.naming.branch_name(name);
        let mut state = self.state.lock().unwrap();
        if state.worktrees.contains_key(name) {
            return Err(WorkspaceError::AlreadyExists(name.to_string()));
        }
        state.worktrees.insert(name.to_string(), branch.clone());
        state.branches.insert(branch);
        Ok(self.naming.worktree_path(&self.root, name))
    }

    async fn remove_worktree(&self, name: &str, force: bool) -> Result<(), WorkspaceError> {
        self.record(format!("remove_worktree {} {}", name, force));
        let mut state = self.state.lock().unwrap();
        if state.fail_remove {
            return Err(WorkspaceError::CommandFailed {
                operation: "remove worktree",
                message: "contains modified or untracked files".to_string(),
            });
        }
        state
            .worktrees
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| WorkspaceError::NotFound(name.to_string()))
    }

    async fn list_worktrees(&self) -> Result<Vec<Worktree>, WorkspaceError> {
        let state = self.state.lock().unwrap();
        let mut worktrees = vec![Worktree {
            path: self.root.clone(),
            branch: Some(state.current_branch.clone()),
            commit: Some("0000000".to_string()),
        }];
        worktrees.extend(state.worktrees.iter().map(|(name, branch)| Worktree {
            path: self.naming.worktree_path(&self.root, name),
            branch: Some(branch.clone()),
            commit: Some("1111111".to_string()),
        }));
        Ok(worktrees)
    }

    async fn delete_branch(&self, branch: &str, force: bool) -> Result<(), WorkspaceError> {
        self.record(format!("delete_branch {} {}", branch, force));
        let mut state = self.state.lock().unwrap();
        if state.current_branch == branch {
            return Err(WorkspaceError::CommandFailed {
                operation: "delete branch",
                message: format!("cannot delete branch '{}' checked out", branch),
            });
        }
        state.branches.remove(branch);
        Ok(())
    }

    async fn is_branch_merged(&self, branch: &str) -> Result<bool, WorkspaceError> {
        let state = self.state.lock().unwrap();
        if state.fail_merge_check {
            return Err(WorkspaceError::CommandFailed {
                operation: "check merge status",
                message: "malformed object name master".to_string(),
            });
        }
        Ok(state.merged.contains(branch))
    }

    async fn branch_exists(&self, branch: &str) -> Result<bool, WorkspaceError> {
        Ok(self.has_branch(branch))
    }

    async fn get_current_branch(&self) -> Result<String, WorkspaceError> {
        Ok(self.state.lock().unwrap().current_branch.clone())
    }

    async fn checkout_branch(&self, branch: &str) -> Result<(), WorkspaceError> {
        self.record(format!("checkout_branch {}", branch));
        self.state.lock().unwrap().current_branch = branch.to_string();
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TerminalState {
    pub running: bool,
    /// Session name -> windows
    pub sessions: BTreeMap<String, Vec<Window>>,
    /// Window id -> window index within its session
    pub indices: BTreeMap<String, u32>,
    pub next_id: u32,
    pub calls: Vec<String>,
    pub fail_create_window: bool,
    pub inside_tmux: bool,
    /// (session, window) the calling process runs in
    pub current: Option<(String, String)>,
}

impl TerminalState {
    /// Append a window with the next free id and index, creating the session if needed
    fn push_window(&mut self, session: &str, name: &str, active: bool) -> String {
        let id = format!("@{}", self.next_id);
        self.next_id += 1;
        let windows = self.sessions.entry(session.to_string()).or_default();
        let index = windows
            .iter()
            .filter_map(|w| self.indices.get(&w.id))
            .max()
            .map_or(0, |i| i + 1);
        windows.push(Window {
            id: id.clone(),
            name: name.to_string(),
            active,
            panes: 1,
        });
        self.indices.insert(id.clone(), index);
        id
    }

    /// Resolve a window target the way tmux does: `@id`, then index, then exact
    /// name, then unique name prefix
    fn resolve(&self, session: &str, target: &str) -> Result<usize, TerminalError> {
        let windows = self
            .sessions
            .get(session)
            .ok_or_else(|| TerminalError::SessionNotFound(session.to_string()))?;
        let not_found = || TerminalError::WindowNotFound(format!("{}:{}", session, target));

        if target.starts_with('@') {
            return windows.iter().position(|w| w.id == target).ok_or_else(not_found);
        }
        if let Ok(index) = target.parse::<u32>() {
            if let Some(pos) = windows
                .iter()
                .position(|w| self.indices.get(&w.id) == Some(&index))
            {
                return Ok(pos);
            }
        }
        if let Some(pos) = windows.iter().position(|w| w.name == target) {
            return Ok(pos);
        }
        let prefixed: Vec<usize> = windows
            .iter()
            .enumerate()
            .filter(|(_, w)| w.name.starts_with(target))
            .map(|(pos, _)| pos)
            .collect();
        match prefixed.as_slice() {
            [pos] => Ok(*pos),
            _ => Err(not_found()),
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeTerminal {
    pub state: Arc<Mutex<TerminalState>>,
}

impl FakeTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a window to the home session, starting the server and session if needed
    pub fn add_window(&self, name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.running = true;
        state.push_window(HOME, name, false)
    }

    /// Drop a window without going through the adapter, as if the user closed it
    pub fn close_window(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        for windows in state.sessions.values_mut() {
            windows.retain(|w| w.name != name);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Name of the active window of the home session
    pub fn active_window(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .sessions
            .get(HOME)?
            .iter()
            .find(|w| w.active)
            .map(|w| w.name.clone())
    }

    pub fn window_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .sessions
            .get(HOME)
            .map(|windows| windows.iter().map(|w| w.name.clone()).collect())
            .unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl TerminalAdapter for FakeTerminal {
    fn home_session(&self) -> &str {
        HOME
    }

    async fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    async fn session_exists(&self, session: &str) -> bool {
        self.state.lock().unwrap().sessions.contains_key(session)
    }

    async fn create_session(&self, session: &str) -> Result<(), TerminalError> {
        self.record(format!("create_session {}", session));
        let mut state = self.state.lock().unwrap();
        state.running = true;
        state.push_window(session, "bash", true);
        Ok(())
    }

    async fn create_window(
        &self,
        window: &str,
        command: Option<&str>,
        start_dir: Option<&Path>,
        session: &str,
    ) -> Result<String, TerminalError> {
        self.record(format!(
            "create_window {} {:?} {:?} {}",
            window, command, start_dir, session
        ));
        let mut state = self.state.lock().unwrap();
        if state.fail_create_window {
            return Err(TerminalError::CommandFailed {
                operation: "create window",
                message: "create window failed: index in use".to_string(),
            });
        }
        if !state.sessions.contains_key(session) {
            return Err(TerminalError::SessionNotFound(session.to_string()));
        }
        Ok(state.push_window(session, window, false))
    }

    async fn select_window(&self, window: &str, session: &str) -> Result<(), TerminalError> {
        self.record(format!("select_window {} {}", window, session));
        let mut state = self.state.lock().unwrap();
        let selected = state.resolve(session, window)?;
        if let Some(windows) = state.sessions.get_mut(session) {
            for (pos, w) in windows.iter_mut().enumerate() {
                w.active = pos == selected;
            }
        }
        Ok(())
    }

    async fn kill_window(&self, window: &str, session: &str) -> Result<(), TerminalError> {
        self.record(format!("kill_window {} {}", window, session));
        let mut state = self.state.lock().unwrap();
        let pos = state.resolve(session, window)?;
        let removed = state.sessions.get_mut(session).map(|windows| windows.remove(pos));
        if let Some(removed) = removed {
            state.indices.remove(&removed.id);
        }
        Ok(())
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<Window>, TerminalError> {
        let state = self.state.lock().unwrap();
        if !state.running {
            return Err(TerminalError::ServerNotRunning);
        }
        state
            .sessions
            .get(session)
            .cloned()
            .ok_or_else(|| TerminalError::SessionNotFound(session.to_string()))
    }

    async fn list_sessions(&self) -> Result<Vec<TmuxSession>, TerminalError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sessions
            .iter()
            .map(|(name, windows)| TmuxSession {
                name: name.clone(),
                created: "0".to_string(),
                windows: windows.len() as u32,
                attached: false,
            })
            .collect())
    }

    async fn attach_session(&self, session: &str) -> Result<(), TerminalError> {
        self.record(format!("attach_session {}", session));
        Ok(())
    }

    async fn send_keys(&self, window: &str, keys: &str, session: &str) -> Result<(), TerminalError> {
        self.record(format!("send_keys {} {} {}", window, keys, session));
        let state = self.state.lock().unwrap();
        state.resolve(session, window)?;
        Ok(())
    }

    async fn rename_window(
        &self,
        old_name: &str,
        new_name: &str,
        session: &str,
    ) -> Result<(), TerminalError> {
        self.record(format!("rename_window {} {} {}", old_name, new_name, session));
        let mut state = self.state.lock().unwrap();
        let pos = state.resolve(session, old_name)?;
        if let Some(window) = state.sessions.get_mut(session).and_then(|w| w.get_mut(pos)) {
            window.name = new_name.to_string();
        }
        Ok(())
    }

    fn is_inside_tmux(&self) -> bool {
        self.state.lock().unwrap().inside_tmux
    }

    async fn current_window(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.current.as_ref().map(|(_, window)| window.clone())
    }

    async fn current_session(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.current.as_ref().map(|(session, _)| session.clone())
    }
}

pub type FakeCoordinator = SessionCoordinator<FakeWorkspace, FakeTerminal>;

/// Coordinator over fresh fakes, plus handles on both fakes
pub fn coordinator() -> (FakeCoordinator, FakeWorkspace, FakeTerminal) {
    let workspace = FakeWorkspace::new();
    let terminal = FakeTerminal::new();
    let coordinator = SessionCoordinator::new(
        workspace.clone(),
        terminal.clone(),
        SessionSettings::default(),
    );
    (coordinator, workspace, terminal)
}
