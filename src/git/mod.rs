//! Git integration
//!
//! - `WorkspaceAdapter` - capability trait used by the session coordinator
//! - `GitWorkspace` - implementation driving the `git` CLI
//! - `discover_repo_root` - repository discovery via gitoxide

mod adapter;
mod backend;
mod worktree;

pub use adapter::*;
pub use backend::*;
pub use worktree::*;
