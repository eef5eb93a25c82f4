//! Process-backed terminal adapter
//!
//! Implements [`TerminalAdapter`] on top of [`TmuxExecutor`]. The `-F` format strings
//! below fix the column order the parsers rely on.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{DEFAULT_HOME_SESSION, TerminalAdapter, TmuxExecutor, TmuxSession, Window};
use crate::error::TerminalError;

/// Environment variable tmux sets inside its clients
pub const TMUX_ENV_MARKER: &str = "TMUX";

const WINDOW_FORMAT: &str = "#{window_id}:#{window_name}:#{window_active}:#{window_panes}";
const WINDOW_ID_FORMAT: &str = "#{window_id}";
const SESSION_FORMAT: &str =
    "#{session_name}:#{session_created}:#{session_windows}:#{session_attached}";

/// Terminal adapter driving the `tmux` binary
#[derive(Debug, Clone)]
pub struct TmuxTerminal {
    executor: TmuxExecutor,
    home_session: String,
}

impl TmuxTerminal {
    pub fn new(home_session: impl Into<String>) -> Self {
        Self::with_executor(TmuxExecutor::new(), home_session)
    }

    pub fn with_executor(executor: TmuxExecutor, home_session: impl Into<String>) -> Self {
        Self {
            executor,
            home_session: home_session.into(),
        }
    }

    pub fn executor(&self) -> &TmuxExecutor {
        &self.executor
    }

    async fn display(&self, format: &str) -> Option<String> {
        if !self.is_inside_tmux() {
            return None;
        }

        // Target our own pane; without -t tmux reports the client's focused window
        let pane = std::env::var("TMUX_PANE").ok();
        let mut args = vec!["display-message", "-p"];
        if let Some(pane) = pane.as_deref() {
            args.extend(["-t", pane]);
        }
        args.push(format);

        self.executor
            .execute("display message", &args)
            .await
            .ok()
            .map(|s| s.trim().to_string())
    }
}

impl Default for TmuxTerminal {
    fn default() -> Self {
        Self::new(DEFAULT_HOME_SESSION)
    }
}

#[async_trait]
impl TerminalAdapter for TmuxTerminal {
    fn home_session(&self) -> &str {
        &self.home_session
    }

    async fn is_running(&self) -> bool {
        self.executor.execute("get info", &["info"]).await.is_ok()
    }

    async fn session_exists(&self, session: &str) -> bool {
        self.executor
            .execute("check session", &["has-session", "-t", session])
            .await
            .is_ok()
    }

    #[instrument(skip(self))]
    async fn create_session(&self, session: &str) -> Result<(), TerminalError> {
        self.executor
            .execute("create session", &["new-session", "-d", "-s", session])
            .await?;
        info!("Created tmux session {}", session);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_window(
        &self,
        window: &str,
        command: Option<&str>,
        start_dir: Option<&Path>,
        session: &str,
    ) -> Result<String, TerminalError> {
        let target = format!("{}:", session);
        let start_dir = start_dir.map(|d| d.to_string_lossy().into_owned());

        let mut args = vec![
            "new-window",
            "-P",
            "-F",
            WINDOW_ID_FORMAT,
            "-t",
            target.as_str(),
            "-n",
            window,
        ];
        if let Some(dir) = start_dir.as_deref() {
            args.extend(["-c", dir]);
        }
        if let Some(command) = command {
            args.push(command);
        }

        let id = self.executor.execute("create window", &args).await?;
        let id = id.trim().to_string();
        info!("Created window {} ({}) in session {}", window, id, session);
        Ok(id)
    }

    async fn select_window(&self, window: &str, session: &str) -> Result<(), TerminalError> {
        let target = format!("{}:{}", session, window);
        self.executor
            .execute("select window", &["select-window", "-t", target.as_str()])
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn kill_window(&self, window: &str, session: &str) -> Result<(), TerminalError> {
        let target = format!("{}:{}", session, window);
        self.executor
            .execute("kill window", &["kill-window", "-t", target.as_str()])
            .await?;
        info!("Killed window {}", target);
        Ok(())
    }

    async fn list_windows(&self, session: &str) -> Result<Vec<Window>, TerminalError> {
        let output = self
            .executor
            .execute(
                "list windows",
                &["list-windows", "-t", session, "-F", WINDOW_FORMAT],
            )
            .await?;

        Ok(parse_windows(&output))
    }

    async fn list_sessions(&self) -> Result<Vec<TmuxSession>, TerminalError> {
        match self
            .executor
            .execute("list sessions", &["list-sessions", "-F", SESSION_FORMAT])
            .await
        {
            Ok(output) => Ok(parse_sessions(&output)),
            Err(TerminalError::ServerNotRunning) => {
                debug!("tmux server not running, no sessions");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn attach_session(&self, session: &str) -> Result<(), TerminalError> {
        // Interactive: the client needs the caller's terminal, so stdio is inherited
        let status = self
            .executor
            .command()
            .args(["attach-session", "-t", session])
            .status()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TerminalError::NotInstalled,
                _ => TerminalError::CommandFailed {
                    operation: "attach session",
                    message: e.to_string(),
                },
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(TerminalError::CommandFailed {
                operation: "attach session",
                message: format!("tmux exited with {}", status),
            })
        }
    }

    async fn send_keys(
        &self,
        window: &str,
        keys: &str,
        session: &str,
    ) -> Result<(), TerminalError> {
        let target = format!("{}:{}", session, window);
        self.executor
            .execute("send keys", &["send-keys", "-t", target.as_str(), keys, "Enter"])
            .await?;
        Ok(())
    }

    async fn rename_window(
        &self,
        old_name: &str,
        new_name: &str,
        session: &str,
    ) -> Result<(), TerminalError> {
        let target = format!("{}:{}", session, old_name);
        self.executor
            .execute("rename window", &["rename-window", "-t", target.as_str(), new_name])
            .await?;
        Ok(())
    }

    fn is_inside_tmux(&self) -> bool {
        std::env::var_os(TMUX_ENV_MARKER).is_some()
    }

    async fn current_window(&self) -> Option<String> {
        self.display("#{window_name}").await
    }

    async fn current_session(&self) -> Option<String> {
        self.display("#{session_name}").await
    }
}

/// Parse `list-windows` output in `WINDOW_FORMAT`
fn parse_windows(output: &str) -> Vec<Window> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut fields = line.split(':');
            Window {
                id: fields.next().unwrap_or_default().to_string(),
                name: fields.next().unwrap_or_default().to_string(),
                active: fields.next() == Some("1"),
                panes: fields.next().and_then(|p| p.trim().parse().ok()).unwrap_or(0),
            }
        })
        .collect()
}

/// Parse `list-sessions` output in `SESSION_FORMAT`
fn parse_sessions(output: &str) -> Vec<TmuxSession> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut fields = line.split(':');
            TmuxSession {
                name: fields.next().unwrap_or_default().to_string(),
                created: fields.next().unwrap_or_default().to_string(),
                windows: fields.next().and_then(|w| w.trim().parse().ok()).unwrap_or(0),
                attached: fields.next() == Some("1"),
            }
        })
        .collect()
}
