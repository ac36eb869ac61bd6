//! Core types and services for taskmesh
//!
//! This crate holds the task model, the store abstractions the rest of the
//! system persists through, and the dependency engine that keeps the task
//! graph acyclic.
//!
//! # Overview
//!
//! - [`tasks::DependencyEngine`] adds and removes dependency edges with cycle
//!   prevention and resolves a global execution order.
//! - [`tasks::TaskService`] wraps the engine with task CRUD, comments and
//!   project membership checks.
//! - [`project::ProjectService`] manages projects and their members; deleting
//!   a project removes its tasks through the engine.
//! - [`store`] defines [`store::TaskStore`], [`store::EdgeStore`],
//!   [`store::Directory`] and [`store::CommentStore`], plus
//!   [`store::MemoryStore`], an in-process implementation with JSON snapshot
//!   persistence guarded by [`store::SnapshotLock`].
//! - [`config::Config`] is the TOML configuration shared by every entry point.

// TODO(core-docs): Add # Errors documentation to all fallible public functions
#![expect(
    clippy::missing_errors_doc,
    reason = "Error documentation to be added incrementally"
)]

pub mod config;
mod error;
mod ids;
pub mod project;
pub mod store;
pub mod tasks;

pub use error::{Error, Result};
pub use ids::{CommentId, ProjectId, TaskId, UserId};
