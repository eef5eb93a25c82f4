//! Error types for vibe
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `Display` and `Error` impls.
//! Every adapter error carries a stable machine code (see the `code()` methods) so callers
//! can branch on the kind of failure instead of matching on messages.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for vibe
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Terminal(#[from] TerminalError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Session(e) => e.code(),
            Self::Terminal(e) => e.code(),
            Self::Workspace(e) => e.code(),
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the failure may have left a session half-built or half-removed
    pub fn needs_manual_cleanup(&self) -> bool {
        matches!(
            self,
            Self::Session(SessionError::PartialSession { .. } | SessionError::TeardownFailed { .. })
        )
    }
}

/// Version-control (git) operation failures
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("git is not installed or not in PATH")]
    NotInstalled,

    #[error("Worktree {0} already exists")]
    AlreadyExists(String),

    #[error("Worktree {0} does not exist")]
    NotFound(String),

    #[error("Failed to {operation}: {message}")]
    CommandFailed {
        operation: &'static str,
        message: String,
    },
}

impl WorkspaceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotARepository(_) => "NOT_A_REPOSITORY",
            Self::NotInstalled => "GIT_NOT_INSTALLED",
            Self::AlreadyExists(_) => "WORKTREE_ALREADY_EXISTS",
            Self::NotFound(_) => "WORKTREE_NOT_FOUND",
            Self::CommandFailed { .. } => "GIT_COMMAND_FAILED",
        }
    }
}

/// Terminal multiplexer (tmux) operation failures
#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("tmux is not installed or not in PATH")]
    NotInstalled,

    #[error("tmux server not running")]
    ServerNotRunning,

    #[error("tmux session '{0}' not found")]
    SessionNotFound(String),

    #[error("tmux window '{0}' not found")]
    WindowNotFound(String),

    #[error("Failed to {operation}: {message}")]
    CommandFailed {
        operation: &'static str,
        message: String,
    },
}

impl TerminalError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInstalled => "TMUX_NOT_INSTALLED",
            Self::ServerNotRunning => "TMUX_SERVER_NOT_RUNNING",
            Self::SessionNotFound(_) => "TMUX_SESSION_NOT_FOUND",
            Self::WindowNotFound(_) => "TMUX_WINDOW_NOT_FOUND",
            Self::CommandFailed { .. } => "TMUX_COMMAND_FAILED",
        }
    }

    /// Whether the error only says the target is already gone
    pub fn is_missing_target(&self) -> bool {
        matches!(
            self,
            Self::ServerNotRunning | Self::SessionNotFound(_) | Self::WindowNotFound(_)
        )
    }
}

/// Which part of a session already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionResource {
    Worktree,
    Branch,
    Window,
}

impl std::fmt::Display for SessionResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Worktree => write!(f, "worktree"),
            Self::Branch => write!(f, "branch"),
            Self::Window => write!(f, "window"),
        }
    }
}

/// Teardown step that failed during `done`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    MergeCheck,
    KillWindow,
    RemoveWorktree,
    CheckoutTrunk,
    DeleteBranch,
}

impl std::fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MergeCheck => write!(f, "merge check"),
            Self::KillWindow => write!(f, "kill window"),
            Self::RemoveWorktree => write!(f, "remove worktree"),
            Self::CheckoutTrunk => write!(f, "checkout trunk"),
            Self::DeleteBranch => write!(f, "delete branch"),
        }
    }
}

/// Session lifecycle errors raised by the coordinator
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid session name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Session '{name}' already exists ({resource} is present)")]
    AlreadyExists {
        name: String,
        resource: SessionResource,
    },

    #[error("Session '{0}' not found")]
    NotFound(String),

    #[error("Branch '{branch}' of session '{name}' is not merged (use --force to discard it)")]
    Unmerged { name: String, branch: String },

    #[error("Session '{name}' is partial: worktree {} was created but the window was not: {source}", .worktree.display())]
    PartialSession {
        name: String,
        worktree: PathBuf,
        #[source]
        source: TerminalError,
    },

    #[error("Teardown of session '{name}' failed at step '{step}': {source}")]
    TeardownFailed {
        name: String,
        step: TeardownStep,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName { .. } => "INVALID_SESSION_NAME",
            Self::AlreadyExists { .. } => "SESSION_ALREADY_EXISTS",
            Self::NotFound(_) => "SESSION_NOT_FOUND",
            Self::Unmerged { .. } => "SESSION_UNMERGED",
            Self::PartialSession { .. } => "SESSION_PARTIAL",
            Self::TeardownFailed { .. } => "SESSION_TEARDOWN_FAILED",
            Self::Workspace(e) => e.code(),
            Self::Terminal(e) => e.code(),
        }
    }

    pub(crate) fn teardown(name: &str, step: TeardownStep, source: impl Into<Error>) -> Self {
        Self::TeardownFailed {
            name: name.to_string(),
            step,
            source: Box::new(source.into()),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Failed to create config directory: {0}")]
    DirectoryCreationFailed(PathBuf),
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;
