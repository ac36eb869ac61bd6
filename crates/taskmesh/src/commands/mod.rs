//! Command implementations.
//!
//! Each command runs against a [`Session`] and returns an [`Output`] holding
//! both a plain-text rendering and a JSON payload. The caller picks one based
//! on `--json`.

mod comment;
mod dep;
mod graph;
mod project;
mod task;
mod user;

use crate::cli::{Cli, CliError, Commands, OkEnvelope};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskmesh_core::config::Config;
use taskmesh_core::project::ProjectService;
use taskmesh_core::store::{LockMode, MemoryStore, SnapshotLock};
use taskmesh_core::tasks::TaskService;
use tracing::{Instrument, debug};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "taskmesh.toml";

/// Result of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// Human-readable rendering.
    pub text: String,
    /// Machine-readable payload for `--json`.
    pub data: serde_json::Value,
    /// Whether the store changed and must be written back.
    pub mutated: bool,
}

impl Output {
    /// Output of a command that only read the store.
    pub fn read(text: impl Into<String>, data: impl Serialize) -> Result<Self, CliError> {
        Ok(Self {
            text: text.into(),
            data: to_json(data)?,
            mutated: false,
        })
    }

    /// Output of a command that changed the store.
    pub fn write(text: impl Into<String>, data: impl Serialize) -> Result<Self, CliError> {
        Ok(Self {
            mutated: true,
            ..Self::read(text, data)?
        })
    }

    /// Render for printing.
    pub fn render(&self, json: bool) -> Result<String, CliError> {
        if json {
            serde_json::to_string_pretty(&OkEnvelope::new(&self.data))
                .map_err(|e| CliError::other(format!("Failed to encode output: {e}")))
        } else {
            Ok(self.text.clone())
        }
    }
}

fn to_json(data: impl Serialize) -> Result<serde_json::Value, CliError> {
    serde_json::to_value(data).map_err(|e| CliError::other(format!("Failed to encode output: {e}")))
}

/// An opened snapshot store plus the services over it.
///
/// The session holds the snapshot lock until it is dropped. No other process
/// writes the snapshot between a mutating command's load and its save.
#[derive(Debug)]
pub struct Session {
    /// The store holding every record.
    pub store: Arc<MemoryStore>,
    /// Task service with the configured engine options.
    pub service: TaskService,
    /// Project service sharing the same store.
    pub projects: ProjectService,
    snapshot: PathBuf,
    lock: SnapshotLock,
}

impl Session {
    /// Lock the snapshot at `snapshot` in `mode`, then load it with engine
    /// options from `config`.
    pub async fn open(config: &Config, snapshot: PathBuf, mode: LockMode) -> Result<Self, CliError> {
        let lock = SnapshotLock::acquire(&snapshot, mode).await?;
        let store = Arc::new(MemoryStore::open(&snapshot).await?);
        let options = config.engine_options();
        let service = TaskService::from_store(store.clone(), options);
        let projects = ProjectService::from_store(store.clone(), options);
        Ok(Self {
            store,
            service,
            projects,
            snapshot,
            lock,
        })
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot
    }

    /// Write the store back to its snapshot file.
    ///
    /// Fails without writing unless the session holds the lock exclusively.
    pub async fn save(&self) -> Result<(), CliError> {
        if self.lock.mode() != LockMode::Exclusive {
            return Err(CliError::other(format!(
                "Snapshot {} was opened read-only",
                self.snapshot.display()
            )));
        }
        self.store.save(&self.snapshot).await?;
        Ok(())
    }
}

/// Resolve the configuration for a CLI invocation.
///
/// An explicit `--config` must exist; otherwise `taskmesh.toml` in the working
/// directory is used when present.
pub fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let config = match &cli.config {
        Some(path) => Config::load(path).map_err(|e| match e {
            taskmesh_core::Error::Io { .. } => CliError::config_with_help(
                format!("Cannot read config file {}: {e}", path.display()),
                "Pass an existing file to --config or unset TASKMESH_CONFIG",
            ),
            other => other.into(),
        })?,
        None => Config::load_or_default(DEFAULT_CONFIG_FILE)?,
    };
    Ok(config)
}

/// Run one CLI invocation and return the text to print on stdout.
pub async fn run(cli: Cli) -> Result<String, CliError> {
    let config = load_config(&cli)?;
    let snapshot = cli.store.clone().unwrap_or_else(|| config.snapshot_path());
    let mode = if cli.command.mutates() {
        LockMode::Exclusive
    } else {
        LockMode::Shared
    };
    let session = Session::open(&config, snapshot, mode).await?;

    let span = crate::command_span!(cli.command.name());
    let output = execute(cli.command, &session).instrument(span).await?;

    if output.mutated {
        session.save().await?;
        debug!(path = %session.snapshot_path().display(), "Snapshot written");
    }
    output.render(cli.json)
}

/// Dispatch a parsed command.
pub async fn execute(command: Commands, session: &Session) -> Result<Output, CliError> {
    match command {
        Commands::User { subcommand } => user::execute(subcommand, session).await,
        Commands::Project { subcommand } => project::execute(subcommand, session).await,
        Commands::Task { subcommand } => task::execute(subcommand, session).await,
        Commands::Dep { subcommand } => dep::execute(subcommand, session).await,
        Commands::Comment { subcommand } => comment::execute(subcommand, session).await,
        Commands::Order { waves } => graph::order(session, waves).await,
        Commands::Check => graph::check(session).await,
    }
}

/// Join displayable items one per line.
fn lines<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
