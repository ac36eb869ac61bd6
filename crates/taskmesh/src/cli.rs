use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand};
use miette::{Diagnostic, Report};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use taskmesh_core::tasks::TaskStatus;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Rejected operation exit code (missing task, cycle, permission, ...)
pub const EXIT_DOMAIN: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(taskmesh::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The engine or service rejected the operation (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(taskmesh::cli::rejected))]
    Domain {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(taskmesh::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new rejected-operation error
    #[must_use]
    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error with help text
    #[must_use]
    pub fn other_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Convert `taskmesh_core::Error` to appropriate `CliError` variant.
///
/// - Configuration errors -> Config (exit code 2)
/// - I/O, store and serialization failures -> Other (exit code 3)
/// - Everything else is a rejected operation -> Domain (exit code 3)
impl From<taskmesh_core::Error> for CliError {
    fn from(err: taskmesh_core::Error) -> Self {
        use taskmesh_core::Error;

        match err {
            Error::Configuration { message } => Self::config_with_help(
                message,
                "Check the [graph] and [store] sections of your config file",
            ),
            Error::Io {
                source,
                path,
                operation,
            } => {
                let path_str = path
                    .as_ref()
                    .map_or(String::new(), |p| format!(" on {}", p.display()));
                Self::other_with_help(
                    format!("I/O {operation} failed{path_str}: {source}"),
                    "Check file permissions and ensure the path exists",
                )
            }
            Error::Store { .. } | Error::Serialization { .. } => Self::other(err.to_string()),
            _ => Self::Domain {
                message: err.to_string(),
                help: err.help().map(|h| h.to_string()),
            },
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Domain { .. } | CliError::Other { .. } => EXIT_DOMAIN,
    }
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Domain { .. } => "rejected",
                CliError::Other { .. } => "other",
            },
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Main CLI entry point for taskmesh.
#[derive(Parser, Debug)]
#[command(name = "taskmesh")]
#[command(about = "Task dependency tracking with cycle-safe edits and execution ordering")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "TASKMESH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the JSON snapshot store. Overrides `[store] snapshot`.
    #[arg(long, global = true, env = "TASKMESH_STORE")]
    pub store: Option<PathBuf>,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(long, global = true, default_value = "pretty", value_enum)]
    pub log_format: TracingFormat,

    /// Print command results as JSON.
    #[arg(long, global = true)]
    pub json: bool,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        /// User operation
        #[command(subcommand)]
        subcommand: UserCommands,
    },
    /// Manage projects and their members
    Project {
        /// Project operation
        #[command(subcommand)]
        subcommand: ProjectCommands,
    },
    /// Create, inspect and change tasks
    Task {
        /// Task operation
        #[command(subcommand)]
        subcommand: TaskCommands,
    },
    /// Add, remove and inspect dependencies between tasks
    Dep {
        /// Dependency operation
        #[command(subcommand)]
        subcommand: DepCommands,
    },
    /// Comment on tasks
    Comment {
        /// Comment operation
        #[command(subcommand)]
        subcommand: CommentCommands,
    },
    /// Print every task that takes part in a dependency, parents first
    Order {
        /// Group tasks into waves that can run side by side
        #[arg(long)]
        waves: bool,
    },
    /// Check the stored dependency graph for cycles and dangling edges
    Check,
}

impl Commands {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::User { .. } => "user",
            Self::Project { .. } => "project",
            Self::Task { .. } => "task",
            Self::Dep { .. } => "dep",
            Self::Comment { .. } => "comment",
            Self::Order { .. } => "order",
            Self::Check => "check",
        }
    }

    /// Whether the command can change the store.
    ///
    /// Mutating commands hold the snapshot lock exclusively from load to save;
    /// the rest share it.
    #[must_use]
    pub const fn mutates(&self) -> bool {
        match self {
            Self::User { subcommand } => !matches!(subcommand, UserCommands::List),
            Self::Project { subcommand } => !matches!(
                subcommand,
                ProjectCommands::List | ProjectCommands::Show { .. }
            ),
            Self::Task { subcommand } => !matches!(
                subcommand,
                TaskCommands::Show { .. } | TaskCommands::List { .. }
            ),
            Self::Dep { subcommand } => !matches!(
                subcommand,
                DepCommands::List { .. } | DepCommands::Dependents { .. }
            ),
            Self::Comment { subcommand } => !matches!(subcommand, CommentCommands::List { .. }),
            Self::Order { .. } | Self::Check => false,
        }
    }
}

/// User operations.
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a user
    Add {
        /// User identifier
        id: String,
        /// Display name; defaults to the identifier
        #[arg(long)]
        name: Option<String>,
    },
    /// List users
    List,
}

/// Project operations.
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project; prints its identifier
    Create {
        /// Project name
        name: String,
        /// Owning user, who becomes the first member
        #[arg(long)]
        owner: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },
    /// Show a project and its members
    Show {
        /// Project identifier
        project: String,
    },
    /// Rename a project or change its description
    Update {
        /// Project identifier
        project: String,
        #[command(flatten)]
        requester: Requester,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
    },
    /// Add a user to a project
    AddMember {
        /// Project identifier
        project: String,
        /// User identifier
        user: String,
        #[command(flatten)]
        requester: Requester,
    },
    /// Remove a user from a project
    RemoveMember {
        /// Project identifier
        project: String,
        /// User identifier
        user: String,
        #[command(flatten)]
        requester: Requester,
    },
    /// Delete a project with its tasks, dependencies and comments
    Delete {
        /// Project identifier
        project: String,
        #[command(flatten)]
        requester: Requester,
    },
    /// List projects
    List,
}

/// Identity of the user performing a change.
#[derive(Args, Debug, Clone)]
pub struct Requester {
    /// User performing the operation
    #[arg(id = "as", long = "as", value_name = "USER")]
    pub user: String,
}

/// Task operations.
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task; prints its identifier
    Create {
        /// Project identifier
        project: String,
        /// Task title
        title: String,
        #[command(flatten)]
        requester: Requester,
        /// Longer description
        #[arg(long)]
        description: Option<String>,
        /// Priority; larger is more urgent
        #[arg(long)]
        priority: Option<i32>,
        /// User to assign the task to
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Show a task
    Show {
        /// Task identifier
        task: String,
    },
    /// Change fields of a task
    Update {
        /// Task identifier
        task: String,
        #[command(flatten)]
        requester: Requester,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
        /// New priority
        #[arg(long, conflicts_with = "clear_priority", allow_negative_numbers = true)]
        priority: Option<i32>,
        /// Remove the priority
        #[arg(long)]
        clear_priority: bool,
        /// New assignee
        #[arg(long, conflicts_with = "unassign")]
        assignee: Option<String>,
        /// Remove the assignee
        #[arg(long)]
        unassign: bool,
        /// New status (open, in-progress, done)
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Delete a task and every dependency touching it
    Delete {
        /// Task identifier
        task: String,
        #[command(flatten)]
        requester: Requester,
    },
    /// List the tasks of a project
    List {
        /// Project identifier
        project: String,
    },
}

/// Dependency operations.
#[derive(Subcommand, Debug)]
pub enum DepCommands {
    /// Make TASK wait for DEPENDENCY
    Add {
        /// The waiting task
        task: String,
        /// The task that must finish first
        dependency: String,
        #[command(flatten)]
        requester: Requester,
    },
    /// Stop TASK waiting for DEPENDENCY
    Remove {
        /// The waiting task
        task: String,
        /// The task it waited for
        dependency: String,
        #[command(flatten)]
        requester: Requester,
    },
    /// List what a task waits for
    List {
        /// Task identifier
        task: String,
        /// Include indirect dependencies, in resolved order
        #[arg(long)]
        transitive: bool,
    },
    /// List the tasks that wait for a task
    Dependents {
        /// Task identifier
        task: String,
    },
}

/// Comment operations.
#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// Comment on a task; prints the comment identifier
    Add {
        /// Task identifier
        task: String,
        /// Comment text
        body: String,
        #[command(flatten)]
        requester: Requester,
    },
    /// List the comments on a task, oldest first
    List {
        /// Task identifier
        task: String,
    },
    /// Delete a comment you wrote
    Delete {
        /// Comment identifier
        comment: String,
        #[command(flatten)]
        requester: Requester,
    },
}

/// Parse command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmesh_core::{Error, TaskId};

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["taskmesh", "check"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert_eq!(cli.log_format, TracingFormat::Pretty);
        assert!(!cli.json);
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "taskmesh", "order", "--waves", "--json", "-L", "debug", "--store", "s.json",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.level, LogLevel::Debug);
        assert_eq!(cli.store, Some(PathBuf::from("s.json")));
        assert!(matches!(cli.command, Commands::Order { waves: true }));
    }

    #[test]
    fn test_dep_add_requires_requester() {
        assert!(Cli::try_parse_from(["taskmesh", "dep", "add", "a", "b"]).is_err());

        let cli = Cli::try_parse_from(["taskmesh", "dep", "add", "a", "b", "--as", "alice"]).unwrap();
        let Commands::Dep {
            subcommand:
                DepCommands::Add {
                    task,
                    dependency,
                    requester,
                },
        } = cli.command
        else {
            panic!("Expected dep add");
        };
        assert_eq!((task.as_str(), dependency.as_str()), ("a", "b"));
        assert_eq!(requester.user, "alice");
    }

    #[test]
    fn test_task_update_parses_status() {
        let cli = Cli::try_parse_from([
            "taskmesh", "task", "update", "t1", "--as", "bob", "--status", "in-progress",
        ])
        .unwrap();
        let Commands::Task {
            subcommand: TaskCommands::Update { status, .. },
        } = cli.command
        else {
            panic!("Expected task update");
        };
        assert_eq!(status, Some(TaskStatus::InProgress));

        assert!(
            Cli::try_parse_from([
                "taskmesh", "task", "update", "t1", "--as", "bob", "--status", "blocked",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_clear_flags_conflict_with_values() {
        let cli = Cli::try_parse_from([
            "taskmesh", "task", "update", "t1", "--as", "bob", "--unassign", "--clear-priority",
        ])
        .unwrap();
        let Commands::Task {
            subcommand:
                TaskCommands::Update {
                    unassign,
                    clear_priority,
                    clear_description,
                    ..
                },
        } = cli.command
        else {
            panic!("Expected task update");
        };
        assert!(unassign && clear_priority && !clear_description);

        assert!(
            Cli::try_parse_from([
                "taskmesh", "task", "update", "t1", "--as", "bob", "--assignee", "carol",
                "--unassign",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_read_only_commands_do_not_mutate() {
        let parse = |args: &[&str]| {
            Cli::try_parse_from(std::iter::once("taskmesh").chain(args.iter().copied()))
                .unwrap()
                .command
        };

        for args in [
            &["order"][..],
            &["check"],
            &["user", "list"],
            &["project", "show", "p"],
            &["task", "list", "p"],
            &["dep", "list", "t", "--transitive"],
            &["comment", "list", "t"],
        ] {
            assert!(!parse(args).mutates(), "{args:?}");
        }
        for args in [
            &["user", "add", "alice"][..],
            &["dep", "add", "a", "b", "--as", "alice"],
            &["project", "remove-member", "p", "bob", "--as", "alice"],
            &["comment", "delete", "c", "--as", "alice"],
        ] {
            assert!(parse(args).mutates(), "{args:?}");
        }
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(Cli::try_parse_from(["taskmesh"]).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(EXIT_OK, 0);
        assert_eq!(exit_code_for(&CliError::config("bad")), EXIT_CLI);
        assert_eq!(exit_code_for(&CliError::domain("no")), EXIT_DOMAIN);
        assert_eq!(exit_code_for(&CliError::other("boom")), EXIT_DOMAIN);
    }

    #[test]
    fn test_core_error_conversion() {
        let cli_err: CliError = Error::configuration("tie-break must be a string").into();
        assert!(matches!(cli_err, CliError::Config { .. }));
        assert_eq!(exit_code_for(&cli_err), EXIT_CLI);

        let cli_err: CliError = Error::CircularDependency {
            cycle: vec![TaskId::new("a"), TaskId::new("b"), TaskId::new("a")],
        }
        .into();
        assert_eq!(cli_err.to_string(), "Circular dependency: a -> b -> a");
        assert!(matches!(cli_err, CliError::Domain { help: Some(_), .. }));
        assert_eq!(exit_code_for(&cli_err), EXIT_DOMAIN);

        let cli_err: CliError = Error::store("disk full").into();
        assert!(matches!(cli_err, CliError::Other { .. }));
    }
}
