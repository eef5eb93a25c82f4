//! Session management module
//!
//! - `Naming` - derivation of worktree paths, branches and window names
//! - `Session`, `SessionEntry`, `TeardownReport` - session views rebuilt from git and tmux
//! - `SessionCoordinator` - start / done / list lifecycle

mod coordinator;
mod naming;
mod types;

pub use coordinator::*;
pub use naming::*;
pub use types::*;
