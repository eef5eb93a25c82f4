//! User configuration settings
//!
//! Layered configuration: defaults → config file → environment variables (`VIBE_*`)

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, Result};
use crate::git::{DEFAULT_BASE_BRANCH, DEFAULT_TRUNK_BRANCH};
use crate::session::{
    DEFAULT_BOOTSTRAP_COMMAND, DEFAULT_BRANCH_PREFIX, DEFAULT_WORKTREE_PREFIX, Naming,
    SessionSettings,
};
use crate::tmux::DEFAULT_HOME_SESSION;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "VIBE_";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Repository used when `-R` is not given (default: current directory)
    pub default_repository: Option<PathBuf>,

    /// Home tmux session holding every session window
    pub session_name: String,

    /// Directory under the repository root holding worktrees
    pub worktree_prefix: String,

    /// Branch name prefix for new sessions (empty string means no prefix)
    pub branch_prefix: String,

    /// Command typed into each new window (empty string means none)
    pub bootstrap_command: String,

    /// Base for new session branches
    pub base_branch: String,

    /// Branch that `done` checks merges against
    pub trunk_branch: String,

    /// Root of a ghq-style checkout tree used to resolve `-R <name>`
    pub ghq_root: Option<PathBuf>,

    /// Enable debug logging
    pub debug: bool,

    /// Log file path (if set, logs to file instead of stderr)
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_repository: None,
            session_name: DEFAULT_HOME_SESSION.to_string(),
            worktree_prefix: DEFAULT_WORKTREE_PREFIX.to_string(),
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
            bootstrap_command: DEFAULT_BOOTSTRAP_COMMAND.to_string(),
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            trunk_branch: DEFAULT_TRUNK_BRANCH.to_string(),
            ghq_root: None,
            debug: false,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from the default config file and the environment
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file and the environment
    pub fn load_from(config_path: &Path) -> Result<Self> {
        Self::figment(config_path)
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()).into())
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            // Layer config file if it exists
            .merge(Toml::file(config_path))
            // Layer environment variables (VIBE_SESSION_NAME, etc.); keys contain
            // underscores, so no nesting split
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Get the configuration file path
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Save current configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|_e| {
                Error::Config(ConfigError::DirectoryCreationFailed(parent.to_path_buf()))
            })?;
        }

        let toml =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        Ok(())
    }

    /// Naming convention for worktrees and branches
    pub fn naming(&self) -> Naming {
        Naming::new(&self.worktree_prefix, &self.branch_prefix)
    }

    /// Coordinator settings
    pub fn session_settings(&self) -> SessionSettings {
        let command = self.bootstrap_command.trim();
        SessionSettings {
            base_branch: self.base_branch.clone(),
            bootstrap_command: (!command.is_empty()).then(|| command.to_string()),
        }
    }

    /// Resolve the directory to operate on.
    ///
    /// `-R <repo>` may be a path or, when `ghq_root` is set, a path relative to it.
    /// Without `-R`, the configured default repository or the current directory is used.
    pub fn resolve_repository(&self, requested: Option<&str>) -> Result<PathBuf> {
        match requested {
            Some(repo) => {
                let direct = PathBuf::from(repo);
                if direct.is_dir() {
                    return Ok(direct);
                }
                if let Some(root) = &self.ghq_root {
                    let candidate = root.join(repo);
                    if candidate.is_dir() {
                        return Ok(candidate);
                    }
                }
                Err(ConfigError::RepositoryNotFound(repo.to_string()).into())
            }
            None => match &self.default_repository {
                Some(path) if path.is_dir() => Ok(path.clone()),
                Some(path) => {
                    Err(ConfigError::RepositoryNotFound(path.display().to_string()).into())
                }
                None => Ok(std::env::current_dir()?),
            },
        }
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "vibe", "vibe").ok_or_else(|| {
            Error::Config(ConfigError::LoadFailed(
                "Could not determine home directory".to_string(),
            ))
        })
    }
}
