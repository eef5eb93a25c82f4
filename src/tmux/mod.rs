//! Async tmux integration module
//!
//! - `TerminalAdapter` - capability trait used by the session coordinator
//! - `TmuxTerminal` - implementation driving the `tmux` binary
//! - `TmuxExecutor` - single-command execution with stderr classification

mod adapter;
mod executor;
mod terminal;

pub use adapter::*;
pub use executor::*;
pub use terminal::*;
