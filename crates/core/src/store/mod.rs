//! Store abstractions the dependency engine and task service persist through.
//!
//! The engine never talks to a database directly. It consumes three async
//! traits:
//!
//! - [`TaskStore`] for task records
//! - [`EdgeStore`] for dependency edges and the [`GraphLock`] that serializes
//!   edge mutations
//! - [`Directory`] for users, projects and membership
//! - [`CommentStore`] for comments on tasks
//!
//! [`MemoryStore`] implements all four in process. [`SnapshotLock`] guards its
//! snapshot file against other processes.

mod lock;
mod memory;

pub use lock::{LockMode, SnapshotLock};
pub use memory::{MemoryStore, Snapshot};

use crate::project::{Project, User};
use crate::tasks::{Comment, DependencyEdge, Task};
use crate::{CommentId, Error, ProjectId, Result, TaskId, UserId};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Persistence for task records.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new task. Fails if the id is already taken.
    async fn create(&self, task: Task) -> Result<()>;

    /// Fetch a task by id.
    async fn get(&self, id: &TaskId) -> Result<Option<Task>>;

    /// Check whether a task exists.
    async fn exists(&self, id: &TaskId) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// Replace a stored task. Fails with [`Error::TaskNotFound`] if it is gone.
    async fn update(&self, task: Task) -> Result<()>;

    /// Delete a task, returning whether it existed.
    async fn delete(&self, id: &TaskId) -> Result<bool>;

    /// All tasks of a project, in creation order.
    async fn list_by_project(&self, project: &ProjectId) -> Result<Vec<Task>>;
}

/// Persistence for dependency edges.
///
/// Callers that check and then mutate the edge set hold the store's
/// [`GraphLock`] in write mode for the whole sequence.
#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// The lock guarding this store's edge set.
    fn graph_lock(&self) -> &GraphLock;

    /// Every edge, in the store's enumeration order.
    async fn list_all(&self) -> Result<Vec<DependencyEdge>>;

    /// Insert an edge. Returns `false` when an identical edge already exists,
    /// in which case nothing is written.
    async fn insert(&self, edge: &DependencyEdge) -> Result<bool>;

    /// Delete every edge equal to `edge`, returning how many were removed.
    async fn delete_matching(&self, edge: &DependencyEdge) -> Result<usize>;

    /// Direct parents of a task.
    async fn parents_of(&self, task: &TaskId) -> Result<Vec<TaskId>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|edge| &edge.task_id == task)
            .map(|edge| edge.parent_task_id)
            .collect())
    }

    /// Direct children of a task.
    async fn children_of(&self, task: &TaskId) -> Result<Vec<TaskId>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|edge| &edge.parent_task_id == task)
            .map(|edge| edge.task_id)
            .collect())
    }

    /// Delete every edge with `task` at either end, returning how many were
    /// removed.
    async fn delete_touching(&self, task: &TaskId) -> Result<usize>;
}

/// Users, projects and membership.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Check whether a user exists.
    async fn user_exists(&self, user: &UserId) -> Result<bool>;

    /// Check whether a project exists.
    async fn project_exists(&self, project: &ProjectId) -> Result<bool>;

    /// Check whether `user` is a member of `project`.
    ///
    /// Returns `false` for unknown projects.
    async fn is_member(&self, project: &ProjectId, user: &UserId) -> Result<bool>;

    /// Fetch a user.
    async fn user(&self, user: &UserId) -> Result<Option<User>>;

    /// Fetch a project.
    async fn project(&self, project: &ProjectId) -> Result<Option<Project>>;

    /// Store a new project. Fails if the id is already taken.
    async fn insert_project(&self, project: Project) -> Result<()>;

    /// Replace a stored project. Fails with [`Error::ProjectNotFound`] if it is gone.
    async fn update_project(&self, project: Project) -> Result<()>;

    /// Delete a project record, returning whether it existed. Tasks are not
    /// touched here.
    async fn delete_project(&self, project: &ProjectId) -> Result<bool>;

    /// Add a user to a project. Returns `false` if they were already a member.
    async fn add_member(&self, project: &ProjectId, user: UserId) -> Result<bool>;

    /// Remove a user from a project. Returns `false` if they were not a member.
    async fn remove_member(&self, project: &ProjectId, user: &UserId) -> Result<bool>;
}

/// Persistence for task comments.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Insert a new comment.
    async fn create_comment(&self, comment: Comment) -> Result<()>;

    /// Fetch a comment by id.
    async fn comment(&self, id: &CommentId) -> Result<Option<Comment>>;

    /// Comments on a task, oldest first.
    async fn comments_on(&self, task: &TaskId) -> Result<Vec<Comment>>;

    /// Delete a comment, returning whether it existed.
    async fn delete_comment(&self, id: &CommentId) -> Result<bool>;

    /// Delete every comment on a task, returning how many were removed.
    async fn delete_comments_on(&self, task: &TaskId) -> Result<usize>;
}

/// Graph-wide reader/writer lock.
///
/// Edge mutations take the write side so that a cycle check and the insert it
/// guards are not interleaved with another mutation. Order resolution and
/// queries take the read side so they always see a complete edge set.
#[derive(Debug, Default)]
pub struct GraphLock {
    inner: RwLock<()>,
}

impl GraphLock {
    /// Create an unlocked lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire shared access, giving up after `timeout` if one is set.
    pub async fn read(&self, timeout: Option<Duration>) -> Result<RwLockReadGuard<'_, ()>> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.read())
                .await
                .map_err(|_| Error::LockTimeout { timeout: limit }),
            None => Ok(self.inner.read().await),
        }
    }

    /// Acquire exclusive access, giving up after `timeout` if one is set.
    pub async fn write(&self, timeout: Option<Duration>) -> Result<RwLockWriteGuard<'_, ()>> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.write())
                .await
                .map_err(|_| Error::LockTimeout { timeout: limit }),
            None => Ok(self.inner.write().await),
        }
    }
}
