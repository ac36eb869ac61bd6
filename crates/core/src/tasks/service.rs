//! Task CRUD with project membership checks.
//!
//! [`TaskService`] is the entry point the API layer talks to. It validates
//! input, checks that the requester belongs to the task's project, and hands
//! dependency work to the [`DependencyEngine`]. Comments on a task go
//! through it as well.

use super::{AddOutcome, Comment, DependencyEngine, EngineOptions, NewTask, Task, TaskUpdate};
use crate::store::{CommentStore, Directory, EdgeStore, TaskStore};
use crate::{CommentId, Error, ProjectId, Result, TaskId, UserId};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Task operations on behalf of an authenticated user.
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    directory: Arc<dyn Directory>,
    comments: Arc<dyn CommentStore>,
    engine: DependencyEngine,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl TaskService {
    /// Create a service from its collaborators.
    #[must_use]
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        directory: Arc<dyn Directory>,
        comments: Arc<dyn CommentStore>,
        engine: DependencyEngine,
    ) -> Self {
        Self {
            tasks,
            directory,
            comments,
            engine,
        }
    }

    /// Create a service, and its engine, over a single store.
    #[must_use]
    pub fn from_store<S>(store: Arc<S>, options: EngineOptions) -> Self
    where
        S: TaskStore + EdgeStore + Directory + CommentStore + 'static,
    {
        let engine = DependencyEngine::from_store(store.clone()).with_options(options);
        Self::new(store.clone(), store.clone(), store, engine)
    }

    /// The dependency engine behind this service.
    #[must_use]
    pub fn engine(&self) -> &DependencyEngine {
        &self.engine
    }

    /// Create a task in an existing project.
    #[instrument(skip(self, new), fields(requester = %requester, project = %new.project_id))]
    pub async fn create(&self, requester: &UserId, new: NewTask) -> Result<Task> {
        if new.title.trim().is_empty() {
            return Err(Error::validation("task title must not be empty"));
        }
        if !self.directory.project_exists(&new.project_id).await? {
            return Err(Error::ProjectNotFound { id: new.project_id });
        }
        self.authorize(requester, &new.project_id).await?;
        if let Some(assignee) = &new.assignee {
            self.ensure_user(assignee).await?;
        }

        let task = new.into_task();
        self.tasks.create(task.clone()).await?;
        info!(task = %task.id, "Task created");
        Ok(task)
    }

    /// Fetch a task.
    pub async fn get(&self, task_id: &TaskId) -> Result<Task> {
        self.tasks
            .get(task_id)
            .await?
            .ok_or_else(|| Error::TaskNotFound {
                id: task_id.clone(),
            })
    }

    /// All tasks of a project, in creation order.
    pub async fn list_by_project(&self, project_id: &ProjectId) -> Result<Vec<Task>> {
        if !self.directory.project_exists(project_id).await? {
            return Err(Error::ProjectNotFound {
                id: project_id.clone(),
            });
        }
        self.tasks.list_by_project(project_id).await
    }

    /// Apply a partial update to a task.
    ///
    /// An empty update returns the task unchanged.
    #[instrument(skip(self, update), fields(task = %task_id, requester = %requester))]
    pub async fn update(
        &self,
        task_id: &TaskId,
        requester: &UserId,
        update: TaskUpdate,
    ) -> Result<Task> {
        let mut task = self.get(task_id).await?;
        self.authorize(requester, &task.project_id).await?;
        if update.is_empty() {
            return Ok(task);
        }
        if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(Error::validation("task title must not be empty"));
        }
        if let Some(Some(assignee)) = &update.assignee {
            self.ensure_user(assignee).await?;
        }

        update.apply(&mut task);
        self.tasks.update(task.clone()).await?;
        info!("Task updated");
        Ok(task)
    }

    /// Delete a task, every dependency edge touching it and its comments.
    ///
    /// Returns the number of edges removed.
    #[instrument(skip(self), fields(task = %task_id, requester = %requester))]
    pub async fn delete(&self, task_id: &TaskId, requester: &UserId) -> Result<usize> {
        let task = self.get(task_id).await?;
        self.authorize(requester, &task.project_id).await?;
        let edges = self.engine.delete_task(task_id).await?;
        let comments = self.comments.delete_comments_on(task_id).await?;
        debug!(comments, "Task comments deleted");
        Ok(edges)
    }

    /// Record that `dependency_id` must finish before `task_id`.
    ///
    /// The requester must belong to the project of `task_id`. The dependency
    /// may live in another project.
    #[instrument(skip(self), fields(task = %task_id, dependency = %dependency_id, requester = %requester))]
    pub async fn add_dependency(
        &self,
        task_id: &TaskId,
        dependency_id: &TaskId,
        requester: &UserId,
    ) -> Result<AddOutcome> {
        if task_id != dependency_id {
            let task = self.get(task_id).await?;
            self.authorize(requester, &task.project_id).await?;
        }
        self.engine.add_dependency(task_id, dependency_id).await
    }

    /// Remove the edge saying `dependency_id` must finish before `task_id`.
    #[instrument(skip(self), fields(task = %task_id, dependency = %dependency_id, requester = %requester))]
    pub async fn remove_dependency(
        &self,
        task_id: &TaskId,
        dependency_id: &TaskId,
        requester: &UserId,
    ) -> Result<usize> {
        let task = self.get(task_id).await?;
        self.authorize(requester, &task.project_id).await?;
        self.engine.remove_dependency(task_id, dependency_id).await
    }

    /// Post a comment on a task. The author must belong to the task's project.
    #[instrument(skip(self, body), fields(task = %task_id, requester = %requester))]
    pub async fn add_comment(
        &self,
        task_id: &TaskId,
        requester: &UserId,
        body: &str,
    ) -> Result<Comment> {
        if body.trim().is_empty() {
            return Err(Error::validation("comment must not be empty"));
        }
        let task = self.get(task_id).await?;
        self.authorize(requester, &task.project_id).await?;

        let comment = Comment::new(task.id, requester.clone(), body);
        self.comments.create_comment(comment.clone()).await?;
        info!(comment = %comment.id, "Comment added");
        Ok(comment)
    }

    /// Comments on a task, oldest first.
    pub async fn comments(&self, task_id: &TaskId) -> Result<Vec<Comment>> {
        self.get(task_id).await?;
        self.comments.comments_on(task_id).await
    }

    /// Delete a comment. Only its author may do so.
    #[instrument(skip(self), fields(comment = %comment_id, requester = %requester))]
    pub async fn delete_comment(&self, comment_id: &CommentId, requester: &UserId) -> Result<()> {
        let comment = self
            .comments
            .comment(comment_id)
            .await?
            .ok_or_else(|| Error::CommentNotFound {
                id: comment_id.clone(),
            })?;
        if !comment.is_author(requester) {
            return Err(Error::NotOwner {
                user: requester.clone(),
                resource: format!("comment '{comment_id}'"),
            });
        }

        self.comments.delete_comment(comment_id).await?;
        info!("Comment deleted");
        Ok(())
    }

    async fn ensure_user(&self, user: &UserId) -> Result<()> {
        if self.directory.user_exists(user).await? {
            Ok(())
        } else {
            Err(Error::UserNotFound { id: user.clone() })
        }
    }

    async fn authorize(&self, requester: &UserId, project: &ProjectId) -> Result<()> {
        self.ensure_user(requester).await?;
        if self.directory.is_member(project, requester).await? {
            Ok(())
        } else {
            Err(Error::Unauthorized {
                user: requester.clone(),
                project: project.clone(),
            })
        }
    }
}
