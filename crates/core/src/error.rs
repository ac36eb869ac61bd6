//! Error types for taskmesh-core

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use crate::{CommentId, ProjectId, TaskId, UserId};
use miette::Diagnostic;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Error type for task, dependency and store operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The task being operated on does not exist
    #[error("Task '{id}' does not exist")]
    #[diagnostic(code(taskmesh::core::task_not_found))]
    TaskNotFound {
        /// The missing task
        id: TaskId,
    },

    /// The task named as a dependency does not exist
    #[error("Dependency task '{id}' does not exist")]
    #[diagnostic(code(taskmesh::core::dependency_not_found))]
    DependencyNotFound {
        /// The missing dependency task
        id: TaskId,
    },

    /// The referenced project does not exist
    #[error("Project '{id}' does not exist")]
    #[diagnostic(code(taskmesh::core::project_not_found))]
    ProjectNotFound {
        /// The missing project
        id: ProjectId,
    },

    /// The referenced user does not exist
    #[error("User '{id}' does not exist")]
    #[diagnostic(code(taskmesh::core::user_not_found))]
    UserNotFound {
        /// The missing user
        id: UserId,
    },

    /// The referenced comment does not exist
    #[error("Comment '{id}' does not exist")]
    #[diagnostic(code(taskmesh::core::comment_not_found))]
    CommentNotFound {
        /// The missing comment
        id: CommentId,
    },

    /// The requester does not own the record they tried to remove
    #[error("User '{user}' is not the owner of {resource}")]
    #[diagnostic(
        code(taskmesh::core::not_owner),
        help("Only the owner can perform this operation")
    )]
    NotOwner {
        /// The requesting user
        user: UserId,
        /// The record, e.g. `project 'p-1'`
        resource: String,
    },

    /// The requester is not a member of the project that owns the task
    #[error("User '{user}' is not a member of project '{project}'")]
    #[diagnostic(
        code(taskmesh::core::unauthorized),
        help("Ask a project member to add this user to the project")
    )]
    Unauthorized {
        /// The requesting user
        user: UserId,
        /// The project the operation touches
        project: ProjectId,
    },

    /// The dependency would create, or the edge set already contains, a cycle
    #[error("Circular dependency: {}", format_cycle(cycle))]
    #[diagnostic(
        code(taskmesh::core::circular_dependency),
        help("A task cannot wait, directly or transitively, on itself")
    )]
    CircularDependency {
        /// Tasks along the cycle, closing on the first task
        cycle: Vec<TaskId>,
    },

    /// The dependency graph lock could not be acquired in time
    #[error("Timed out after {}ms waiting for the dependency graph lock", timeout.as_millis())]
    #[diagnostic(
        code(taskmesh::core::lock_timeout),
        help("Another dependency change is in progress; retry the operation")
    )]
    LockTimeout {
        /// How long the caller waited
        timeout: Duration,
    },

    /// Persistence failure in a store implementation
    #[error("Store error: {message}")]
    #[diagnostic(
        code(taskmesh::core::store),
        help("The operation did not take effect and can be retried")
    )]
    Store {
        /// Description of the failure
        message: String,
    },

    /// Invalid input
    #[error("Validation failed: {message}")]
    #[diagnostic(code(taskmesh::core::validation))]
    Validation {
        /// Description of the problem
        message: String,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(taskmesh::core::config))]
    Configuration {
        /// Description of the problem
        message: String,
    },

    /// I/O error while reading or writing a snapshot or configuration file
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(taskmesh::core::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write")
        operation: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(taskmesh::core::serialization))]
    Serialization {
        /// Description of the problem
        message: String,
    },
}

fn format_cycle(cycle: &[TaskId]) -> String {
    cycle
        .iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl Error {
    /// Create a store error
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
        }
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Whether the failed operation is known to have had no effect and may be
    /// retried as-is.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::LockTimeout { .. })
    }
}

impl From<taskmesh_task_graph::Error> for Error {
    fn from(err: taskmesh_task_graph::Error) -> Self {
        match err {
            taskmesh_task_graph::Error::CycleDetected { cycle } => Self::CircularDependency {
                cycle: cycle.into_iter().map(TaskId::from).collect(),
            },
            taskmesh_task_graph::Error::UnknownNode { key } => Self::TaskNotFound {
                id: TaskId::from(key),
            },
        }
    }
}

/// Result type for taskmesh-core operations
pub type Result<T> = std::result::Result<T, Error>;
