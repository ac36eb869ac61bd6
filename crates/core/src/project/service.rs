//! Project lifecycle and membership.

use super::Project;
use crate::store::{CommentStore, Directory, EdgeStore, TaskStore};
use crate::tasks::{DependencyEngine, EngineOptions};
use crate::{Error, ProjectId, Result, TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Partial update of a project. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description, or `Some(None)` to clear it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::tasks::present_or_null"
    )]
    pub description: Option<Option<String>>,
}

impl ProjectUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// What [`ProjectService::delete`] removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedProject {
    /// The deleted project.
    pub project: ProjectId,
    /// Its tasks, in creation order.
    pub tasks: Vec<TaskId>,
    /// Dependency edges that touched those tasks.
    pub edges: usize,
    /// Comments on those tasks.
    pub comments: usize,
}

/// Project operations on behalf of an authenticated user.
#[derive(Clone)]
pub struct ProjectService {
    directory: Arc<dyn Directory>,
    comments: Arc<dyn CommentStore>,
    engine: DependencyEngine,
}

impl std::fmt::Debug for ProjectService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectService")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl ProjectService {
    /// Create a service from its collaborators.
    #[must_use]
    pub fn new(
        directory: Arc<dyn Directory>,
        comments: Arc<dyn CommentStore>,
        engine: DependencyEngine,
    ) -> Self {
        Self {
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
        Self::new(store.clone(), store, engine)
    }

    /// Create a project owned by `owner`.
    #[instrument(skip(self, description), fields(owner = %owner))]
    pub async fn create(
        &self,
        owner: &UserId,
        name: &str,
        description: Option<String>,
    ) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("project name must not be empty"));
        }
        self.ensure_user(owner).await?;

        let project = Project::new(name, description, owner.clone());
        self.directory.insert_project(project.clone()).await?;
        info!(project = %project.id, "Project created");
        Ok(project)
    }

    /// Fetch a project.
    pub async fn get(&self, project_id: &ProjectId) -> Result<Project> {
        self.directory
            .project(project_id)
            .await?
            .ok_or_else(|| Error::ProjectNotFound {
                id: project_id.clone(),
            })
    }

    /// Rename a project or change its description. Any member may do this.
    #[instrument(skip(self, update), fields(project = %project_id, requester = %requester))]
    pub async fn update(
        &self,
        project_id: &ProjectId,
        requester: &UserId,
        update: ProjectUpdate,
    ) -> Result<Project> {
        let mut project = self.authorized(project_id, requester).await?;
        if update.is_empty() {
            return Ok(project);
        }
        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::validation("project name must not be empty"));
            }
            project.name = name.to_string();
        }
        if let Some(description) = update.description {
            project.description = description;
        }

        self.directory.update_project(project.clone()).await?;
        info!("Project updated");
        Ok(project)
    }

    /// Add `user` to a project. Returns `false` if they already belonged.
    #[instrument(skip(self), fields(project = %project_id, requester = %requester, user = %user))]
    pub async fn add_member(
        &self,
        project_id: &ProjectId,
        requester: &UserId,
        user: &UserId,
    ) -> Result<bool> {
        self.authorized(project_id, requester).await?;
        let added = self.directory.add_member(project_id, user.clone()).await?;
        info!(added, "Member added");
        Ok(added)
    }

    /// Remove `user` from a project. The owner cannot be removed. Returns
    /// `false` if they were not a member.
    #[instrument(skip(self), fields(project = %project_id, requester = %requester, user = %user))]
    pub async fn remove_member(
        &self,
        project_id: &ProjectId,
        requester: &UserId,
        user: &UserId,
    ) -> Result<bool> {
        let project = self.authorized(project_id, requester).await?;
        if project.is_owner(user) {
            return Err(Error::validation(format!(
                "user '{user}' owns project '{project_id}' and cannot be removed"
            )));
        }
        let removed = self.directory.remove_member(project_id, user).await?;
        info!(removed, "Member removed");
        Ok(removed)
    }

    /// Delete a project together with its tasks, their edges and comments.
    /// Only the owner may do this.
    #[instrument(skip(self), fields(project = %project_id, requester = %requester))]
    pub async fn delete(&self, project_id: &ProjectId, requester: &UserId) -> Result<DeletedProject> {
        let project = self.get(project_id).await?;
        self.ensure_user(requester).await?;
        if !project.is_owner(requester) {
            return Err(Error::NotOwner {
                user: requester.clone(),
                resource: format!("project '{project_id}'"),
            });
        }

        let deleted = self.engine.delete_project_tasks(project_id).await?;
        let mut comments = 0;
        for task in &deleted.tasks {
            comments += self.comments.delete_comments_on(task).await?;
        }
        debug!(comments, "Project comments deleted");
        self.directory.delete_project(project_id).await?;
        info!(
            tasks = deleted.tasks.len(),
            edges = deleted.edges,
            "Project deleted"
        );
        Ok(DeletedProject {
            project: project.id,
            tasks: deleted.tasks,
            edges: deleted.edges,
            comments,
        })
    }

    async fn ensure_user(&self, user: &UserId) -> Result<()> {
        if self.directory.user_exists(user).await? {
            Ok(())
        } else {
            Err(Error::UserNotFound { id: user.clone() })
        }
    }

    async fn authorized(&self, project_id: &ProjectId, requester: &UserId) -> Result<Project> {
        let project = self.get(project_id).await?;
        self.ensure_user(requester).await?;
        if project.is_member(requester) {
            Ok(project)
        } else {
            Err(Error::Unauthorized {
                user: requester.clone(),
                project: project_id.clone(),
            })
        }
    }
}
