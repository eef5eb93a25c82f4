//! vibe - coding-agent sessions as paired git worktrees and tmux windows
//!
//! A session is a name. From it vibe derives a worktree (`<repo>/.worktrees/<name>`),
//! a branch (`claude/<name>`) and a tmux window (`<name>` in the `vibe` session), and
//! starts, finishes and lists them together.
//!
//! # Modules
//!
//! - [`session`] - Naming rules and the session lifecycle coordinator
//! - [`git`] - Workspace adapter over the `git` CLI, repository discovery via gitoxide
//! - [`tmux`] - Terminal adapter over the `tmux` CLI
//! - [`config`] - Layered configuration
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod git;
pub mod session;
pub mod tmux;

pub use config::Config;
pub use error::{Error, Result};
pub use session::{
    Naming, Presence, Session, SessionCoordinator, SessionEntry, SessionSettings, SessionStatus,
    TeardownReport,
};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
