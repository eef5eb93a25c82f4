//! Terminal capability interface
//!
//! The coordinator reaches tmux only through [`TerminalAdapter`], so tests can swap in
//! a fake that never spawns a process.

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::TerminalError;

/// Default home session under which every session window lives
pub const DEFAULT_HOME_SESSION: &str = "vibe";

/// A tmux window, as reported by `list-windows`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window {
    /// tmux window id (e.g. `@3`)
    pub id: String,
    pub name: String,
    pub active: bool,
    pub panes: u32,
}

/// A tmux session, as reported by `list-sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TmuxSession {
    pub name: String,
    /// Creation time as reported by tmux (unix seconds)
    pub created: String,
    pub windows: u32,
    pub attached: bool,
}

/// Multiplexer operations used by the session coordinator.
///
/// Mutating operations are single tmux calls with no existence pre-check; sequencing
/// checks is the caller's job. Probes (`is_running`, `session_exists`) never fail.
#[async_trait]
pub trait TerminalAdapter: Send + Sync {
    /// Name of the home session
    fn home_session(&self) -> &str;

    async fn is_running(&self) -> bool;

    async fn session_exists(&self, session: &str) -> bool;

    async fn create_session(&self, session: &str) -> Result<(), TerminalError>;

    /// Create a window, optionally running `command` and starting in `start_dir`.
    /// Returns the id of the new window.
    async fn create_window(
        &self,
        window: &str,
        command: Option<&str>,
        start_dir: Option<&Path>,
        session: &str,
    ) -> Result<String, TerminalError>;

    async fn select_window(&self, window: &str, session: &str) -> Result<(), TerminalError>;

    async fn kill_window(&self, window: &str, session: &str) -> Result<(), TerminalError>;

    async fn list_windows(&self, session: &str) -> Result<Vec<Window>, TerminalError>;

    /// All sessions; empty (not an error) when no server is running
    async fn list_sessions(&self) -> Result<Vec<TmuxSession>, TerminalError>;

    /// Attach the calling terminal to `session`; returns when the client detaches
    async fn attach_session(&self, session: &str) -> Result<(), TerminalError>;

    /// Type `keys` into the window followed by Enter
    async fn send_keys(&self, window: &str, keys: &str, session: &str)
    -> Result<(), TerminalError>;

    async fn rename_window(
        &self,
        old_name: &str,
        new_name: &str,
        session: &str,
    ) -> Result<(), TerminalError>;

    /// Whether the calling process runs inside a tmux client
    fn is_inside_tmux(&self) -> bool;

    /// Name of the window this process runs in, `None` outside tmux
    async fn current_window(&self) -> Option<String>;

    /// Name of the session this process runs in, `None` outside tmux
    async fn current_session(&self) -> Option<String>;
}
