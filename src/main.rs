//! vibe - coding-agent sessions as paired git worktrees and tmux windows
//!
//! Run with `vibe --help` for usage.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use vibe::{
    APP_NAME, Config, Presence, SessionCoordinator, SessionEntry, VERSION,
    error::{ConfigError, Error, SessionError},
    git::{GitWorkspace, discover_repo_root, repo_name},
    session::AttachOutcome,
    tmux::{TerminalAdapter, TmuxTerminal},
};

type Coordinator = SessionCoordinator<GitWorkspace, TmuxTerminal>;

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version = VERSION)]
#[command(about = "Manage coding-agent sessions as paired git worktrees and tmux windows")]
#[command(long_about = None)]
struct Cli {
    /// Repository to work on (a path, or a name under `ghq_root`)
    #[arg(short = 'R', long = "repo", global = true)]
    repo: Option<String>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session: worktree, branch and tmux window
    Start {
        /// Session name
        name: String,

        /// Branch to start from (default: `base_branch` from config)
        #[arg(short, long)]
        base: Option<String>,
    },

    /// Finish a session: close its window, remove its worktree and branch
    Done {
        /// Session name (default: the current tmux window)
        name: Option<String>,

        /// Skip the merge check and discard unmerged work
        #[arg(short, long)]
        force: bool,
    },

    /// List sessions of the repository
    List {
        /// Also show home-session windows without a worktree
        #[arg(short, long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Attach to the home tmux session, optionally focusing a session window
    Attach {
        /// Session name
        name: Option<String>,
    },

    /// Show configuration
    Config {
        /// Initialize config file with defaults
        #[arg(long)]
        init: bool,
    },
}

fn setup_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn"))
            .add_directive("gix=warn".parse()?)
            .add_directive("tokio=warn".parse()?)
    };

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(file).with_target(false))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .with(filter)
            .init();
    }

    Ok(())
}

/// Build a coordinator for the repository selected by `-R` / config / cwd
fn coordinator(config: &Config, repo: Option<&str>) -> vibe::Result<Coordinator> {
    let dir = config.resolve_repository(repo)?;
    let root = discover_repo_root(&dir)?;
    debug!("Using repository {:?}", root);

    let workspace = GitWorkspace::new(root, config.naming()).with_trunk(&config.trunk_branch);
    let terminal = TmuxTerminal::new(&config.session_name);
    Ok(SessionCoordinator::new(
        workspace,
        terminal,
        config.session_settings(),
    ))
}

fn print_entries(entries: &[SessionEntry]) {
    if entries.is_empty() {
        println!("No sessions. Start one with '{} start <name>'.", APP_NAME);
        return;
    }

    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0).max(4);
    for entry in entries {
        let icon = match entry.presence {
            Presence::Full => "●",
            Presence::WorktreeOnly => "◐",
            Presence::WindowOnly => "○",
        };
        let branch = entry.branch.as_deref().unwrap_or("-");
        let window = match &entry.window {
            Some(w) if w.active => format!("{} (active)", w.id),
            Some(w) => w.id.clone(),
            None => "-".to_string(),
        };
        let note = if entry.presence.is_partial() {
            format!("  [{}]", entry.presence)
        } else {
            String::new()
        };
        println!(
            "{} {:<width$}  {:<30}  {:<12}  {:<6}{}",
            icon,
            entry.name,
            branch,
            window,
            entry.status.to_string(),
            note,
            width = width
        );
    }

    if entries.iter().any(|e| e.presence.is_partial()) {
        println!();
        println!(
            "Partial sessions need cleanup: '{} done --force <name>' removes what is left.",
            APP_NAME
        );
    }
}

async fn run(cli: Cli, config: Config) -> vibe::Result<()> {
    let repo = cli.repo.as_deref();

    match cli.command {
        Commands::Start { name, base } => {
            let coordinator = coordinator(&config, repo)?;
            coordinator.terminal().executor().check_installed().await?;

            let session = coordinator.start(&name, base.as_deref()).await?;
            let home = coordinator.terminal().home_session();

            println!(
                "Started session '{}' in {}",
                session.name,
                repo_name(session.repository())
            );
            println!("  worktree: {}", session.worktree_path().display());
            println!("  branch:   {}", session.branch_name());
            println!("  window:   {}:{}", home, session.name);

            if !coordinator.terminal().is_inside_tmux() {
                println!();
                println!("Attach with: {} attach {}", APP_NAME, session.name);
            }
        }

        Commands::Done { name, force } => {
            let coordinator = coordinator(&config, repo)?;

            let name = match name {
                Some(name) => name,
                None => coordinator.current_session_name().await.ok_or_else(|| {
                    SessionError::InvalidName {
                        name: String::new(),
                        reason: "no name given and the current tmux window is not a session"
                            .to_string(),
                    }
                })?,
            };

            let report = coordinator.done(&name, force).await?;
            println!("Finished session '{}' ({})", report.name, report.status);
            if !report.window_killed {
                println!("  window was already closed");
            }
            if report.branch_deleted {
                println!("  deleted branch {}", report.branch);
            }
        }

        Commands::List { all, json } => {
            let coordinator = coordinator(&config, repo)?;
            let entries = coordinator.list(all).await?;

            if json {
                let out = serde_json::to_string_pretty(&entries)
                    .map_err(|e| std::io::Error::other(e.to_string()))?;
                println!("{}", out);
            } else {
                print_entries(&entries);
            }
        }

        Commands::Attach { name } => {
            let coordinator = coordinator(&config, repo)?;
            match coordinator.attach(name.as_deref()).await? {
                AttachOutcome::Attached => debug!("Detached from session"),
                AttachOutcome::AlreadyInside => {
                    if let Some(name) = name {
                        println!(
                            "Selected window '{}' in session '{}'",
                            name,
                            coordinator.terminal().home_session()
                        );
                    }
                }
            }
        }

        Commands::Config { init } => {
            let path = match cli.config {
                Some(path) => path,
                None => Config::config_file_path()?,
            };

            if init {
                Config::default().save_to(&path)?;
                println!("Configuration initialized at {:?}", path);
            } else {
                let toml = toml::to_string_pretty(&config)
                    .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
                println!("Configuration:");
                println!("{}", toml);
                println!("Config file: {:?}", path);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre error hooks
    color_eyre::install()?;

    let cli = Cli::parse();

    // Load configuration
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config, using defaults: {}", e);
        Config::default()
    });

    setup_logging(cli.verbose || config.debug, config.log_file.as_deref())?;

    if let Err(e) = run(cli, config).await {
        report_failure(&e);
        std::process::exit(if e.needs_manual_cleanup() { 2 } else { 1 });
    }

    Ok(())
}

fn report_failure(e: &Error) {
    eprintln!("error: {}", e);
    debug!("error code: {}", e.code());

    if e.needs_manual_cleanup() {
        eprintln!(
            "The session is only partly present. Inspect it with '{} list' and clean up with '{} done --force <name>'.",
            APP_NAME, APP_NAME
        );
    }
}
