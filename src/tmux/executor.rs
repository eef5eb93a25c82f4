//! Async tmux command executor
//!
//! Runs one tmux invocation at a time on behalf of the terminal adapter and turns
//! failures into typed errors by reading tmux's stderr.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::TerminalError;

/// Async tmux command executor
///
/// Commands are awaited to completion; there is deliberately no timeout, so a hung
/// tmux process hangs the caller.
#[derive(Debug, Clone)]
pub struct TmuxExecutor {
    program: String,
    /// Server socket (`tmux -S`); `None` uses the default server
    socket: Option<PathBuf>,
}

impl TmuxExecutor {
    pub fn new() -> Self {
        Self::with_program("tmux")
    }

    /// Use a different tmux binary
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            socket: None,
        }
    }

    /// Talk to the server listening on `socket` instead of the default one
    pub fn with_socket(mut self, socket: impl Into<PathBuf>) -> Self {
        self.socket = Some(socket.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn socket(&self) -> Option<&Path> {
        self.socket.as_deref()
    }

    /// Base command with the socket selection applied
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(socket) = &self.socket {
            cmd.arg("-S").arg(socket);
        }
        cmd
    }

    /// Check if tmux is installed and accessible
    pub async fn check_installed(&self) -> Result<(), TerminalError> {
        let output = Command::new(&self.program)
            .arg("-V")
            .output()
            .await
            .map_err(|_| TerminalError::NotInstalled)?;

        if output.status.success() {
            let version = String::from_utf8_lossy(&output.stdout);
            debug!("tmux version: {}", version.trim());
            Ok(())
        } else {
            Err(TerminalError::NotInstalled)
        }
    }

    /// Execute a tmux command and return its stdout
    #[instrument(skip(self), fields(args = ?args))]
    pub async fn execute(&self, operation: &'static str, args: &[&str]) -> Result<String, TerminalError> {
        let output = self
            .command()
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => TerminalError::NotInstalled,
                _ => TerminalError::CommandFailed {
                    operation,
                    message: e.to_string(),
                },
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!("tmux {} failed: {}", args.join(" "), stderr);
            Err(classify_failure(operation, target_of(args), stderr))
        }
    }
}

impl Default for TmuxExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Value of the `-t` argument, if any
fn target_of<'a>(args: &[&'a str]) -> Option<&'a str> {
    args.iter()
        .position(|a| *a == "-t")
        .and_then(|i| args.get(i + 1))
        .copied()
}

/// Map tmux's stderr onto an error kind
fn classify_failure(
    operation: &'static str,
    target: Option<&str>,
    stderr: String,
) -> TerminalError {
    let target = target.unwrap_or_default().to_string();

    if stderr.contains("no server running") || is_absent_socket(&stderr) {
        TerminalError::ServerNotRunning
    } else if stderr.contains("can't find window") {
        TerminalError::WindowNotFound(target)
    } else if stderr.contains("can't find session") || stderr.contains("session not found") {
        TerminalError::SessionNotFound(target)
    } else {
        TerminalError::CommandFailed {
            operation,
            message: stderr,
        }
    }
}

/// A socket that is missing or has no listener means no server. Other connection
/// failures, such as a permission error, are real errors.
fn is_absent_socket(stderr: &str) -> bool {
    stderr.contains("error connecting to")
        && (stderr.contains("No such file or directory") || stderr.contains("Connection refused"))
}
