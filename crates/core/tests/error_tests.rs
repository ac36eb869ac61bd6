//! Tests for error types

// Integration tests can use unwrap/expect for cleaner assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use miette::Diagnostic;
use std::path::Path;
use std::time::Duration;
use taskmesh_core::{CommentId, Error, ProjectId, TaskId, UserId};

#[test]
fn test_configuration_error() {
    let error = Error::configuration("config is invalid");
    assert_eq!(error.to_string(), "Configuration error: config is invalid");
}

#[test]
fn test_validation_error() {
    let error = Error::validation("task title must not be empty");
    assert_eq!(
        error.to_string(),
        "Validation failed: task title must not be empty"
    );
}

#[test]
fn test_not_found_errors_name_the_id() {
    let error = Error::TaskNotFound {
        id: TaskId::new("t-1"),
    };
    assert_eq!(error.to_string(), "Task 't-1' does not exist");

    let error = Error::DependencyNotFound {
        id: TaskId::new("t-2"),
    };
    assert_eq!(error.to_string(), "Dependency task 't-2' does not exist");

    let error = Error::ProjectNotFound {
        id: ProjectId::new("p"),
    };
    assert_eq!(error.to_string(), "Project 'p' does not exist");

    let error = Error::UserNotFound {
        id: UserId::new("u"),
    };
    assert_eq!(error.to_string(), "User 'u' does not exist");
}

#[test]
fn test_circular_dependency_lists_the_path() {
    let error = Error::CircularDependency {
        cycle: vec![TaskId::new("a"), TaskId::new("b"), TaskId::new("a")],
    };
    assert_eq!(error.to_string(), "Circular dependency: a -> b -> a");
    assert_eq!(
        error.code().map(|c| c.to_string()).as_deref(),
        Some("taskmesh::core::circular_dependency")
    );
    assert!(error.help().is_some());
}

#[test]
fn test_unauthorized_error() {
    let error = Error::Unauthorized {
        user: UserId::new("mallory"),
        project: ProjectId::new("apollo"),
    };
    assert_eq!(
        error.to_string(),
        "User 'mallory' is not a member of project 'apollo'"
    );
}

#[test]
fn test_ownership_errors() {
    let error = Error::NotOwner {
        user: UserId::new("bob"),
        resource: "project 'apollo'".into(),
    };
    assert_eq!(
        error.to_string(),
        "User 'bob' is not the owner of project 'apollo'"
    );
    assert!(error.help().is_some());

    let error = Error::CommentNotFound {
        id: CommentId::new("c-1"),
    };
    assert_eq!(error.to_string(), "Comment 'c-1' does not exist");
}

#[test]
fn test_io_error_includes_path() {
    let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error = Error::io(source, Path::new("/tmp/store.json"), "write");
    assert_eq!(error.to_string(), "I/O write failed: /tmp/store.json");
    assert!(std::error::Error::source(&error).is_some());
}

#[test]
fn test_lock_timeout_message() {
    let error = Error::LockTimeout {
        timeout: Duration::from_millis(1500),
    };
    assert_eq!(
        error.to_string(),
        "Timed out after 1500ms waiting for the dependency graph lock"
    );
}

#[test]
fn test_retryable_errors() {
    assert!(Error::store("connection reset").is_retryable());
    assert!(
        Error::LockTimeout {
            timeout: Duration::from_secs(1)
        }
        .is_retryable()
    );
    assert!(!Error::validation("bad").is_retryable());
    assert!(
        !Error::CircularDependency {
            cycle: vec![TaskId::new("a"), TaskId::new("a")]
        }
        .is_retryable()
    );
}

#[test]
fn test_graph_errors_convert() {
    let graph_error = taskmesh_task_graph::Error::cycle(&["x", "y", "x"]);
    let error: Error = graph_error.into();
    match error {
        Error::CircularDependency { cycle } => {
            assert_eq!(
                cycle,
                vec![TaskId::new("x"), TaskId::new("y"), TaskId::new("x")]
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let error: Error = taskmesh_task_graph::Error::unknown_node("ghost").into();
    assert!(matches!(error, Error::TaskNotFound { id } if id.as_str() == "ghost"));
}
