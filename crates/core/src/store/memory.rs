//! In-process store with JSON snapshot persistence.
//!
//! All records live in `indexmap` collections behind a single
//! `tokio::sync::RwLock`, so enumeration order is insertion order and stays
//! stable across a save/open cycle.

use super::{CommentStore, Directory, EdgeStore, GraphLock, TaskStore};
use crate::project::{Project, User};
use crate::tasks::{Comment, DependencyEdge, Task};
use crate::{CommentId, Error, ProjectId, Result, TaskId, UserId};
use async_trait::async_trait;
use chrono::Utc;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::RwLock;

/// Serializable contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Registered users.
    #[serde(default)]
    pub users: IndexMap<UserId, User>,
    /// Projects and their members.
    #[serde(default)]
    pub projects: IndexMap<ProjectId, Project>,
    /// Tasks in creation order.
    #[serde(default)]
    pub tasks: IndexMap<TaskId, Task>,
    /// Dependency edges in insertion order. A set, so never duplicated.
    #[serde(default)]
    pub edges: IndexSet<DependencyEdge>,
    /// Comments in posting order.
    #[serde(default)]
    pub comments: IndexMap<CommentId, Comment>,
}

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<Snapshot>,
    graph_lock: GraphLock,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given records.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            graph_lock: GraphLock::new(),
        }
    }

    /// Copy the current contents.
    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.clone()
    }

    /// Load a store from a JSON snapshot. A missing file yields an empty store.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No snapshot found, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(Error::io(e, path, "read")),
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| {
            Error::serialization(format!("invalid snapshot {}: {e}", path.display()))
        })?;
        tracing::debug!(
            tasks = snapshot.tasks.len(),
            edges = snapshot.edges.len(),
            "Loaded snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current contents to `path` as JSON.
    ///
    /// The snapshot is written to a sibling temporary file first and then
    /// renamed over `path`, so readers never see a partial file.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = {
            let state = self.state.read().await;
            serde_json::to_vec_pretty(&*state)
                .map_err(|e| Error::serialization(format!("failed to encode snapshot: {e}")))?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(e, parent, "create directory"))?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| Error::io(e, &tmp, "write"))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| Error::io(e, path, "rename"))?;

        tracing::debug!(bytes = json.len(), "Saved snapshot");
        Ok(())
    }

    /// Register a user.
    pub async fn add_user(&self, id: UserId, name: impl Into<String>) -> Result<User> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::validation("user name must not be empty"));
        }

        let mut state = self.state.write().await;
        if state.users.contains_key(&id) {
            return Err(Error::validation(format!("user '{id}' already exists")));
        }
        let user = User {
            id: id.clone(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    /// All users in registration order.
    pub async fn list_users(&self) -> Vec<User> {
        self.state.read().await.users.values().cloned().collect()
    }

    /// All projects in creation order.
    pub async fn list_projects(&self) -> Vec<Project> {
        self.state.read().await.projects.values().cloned().collect()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create(&self, task: Task) -> Result<()> {
        let mut state = self.state.write().await;
        if state.tasks.contains_key(&task.id) {
            return Err(Error::store(format!("task '{}' already exists", task.id)));
        }
        state.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        Ok(self.state.read().await.tasks.get(id).cloned())
    }

    async fn exists(&self, id: &TaskId) -> Result<bool> {
        Ok(self.state.read().await.tasks.contains_key(id))
    }

    async fn update(&self, task: Task) -> Result<()> {
        let mut state = self.state.write().await;
        let slot = state
            .tasks
            .get_mut(&task.id)
            .ok_or_else(|| Error::TaskNotFound {
                id: task.id.clone(),
            })?;
        *slot = task;
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<bool> {
        Ok(self.state.write().await.tasks.shift_remove(id).is_some())
    }

    async fn list_by_project(&self, project: &ProjectId) -> Result<Vec<Task>> {
        Ok(self
            .state
            .read()
            .await
            .tasks
            .values()
            .filter(|task| &task.project_id == project)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EdgeStore for MemoryStore {
    fn graph_lock(&self) -> &GraphLock {
        &self.graph_lock
    }

    async fn list_all(&self) -> Result<Vec<DependencyEdge>> {
        Ok(self.state.read().await.edges.iter().cloned().collect())
    }

    async fn insert(&self, edge: &DependencyEdge) -> Result<bool> {
        Ok(self.state.write().await.edges.insert(edge.clone()))
    }

    async fn delete_matching(&self, edge: &DependencyEdge) -> Result<usize> {
        Ok(usize::from(
            self.state.write().await.edges.shift_remove(edge),
        ))
    }

    async fn delete_touching(&self, task: &TaskId) -> Result<usize> {
        let mut state = self.state.write().await;
        let before = state.edges.len();
        state.edges.retain(|edge| !edge.touches(task));
        Ok(before - state.edges.len())
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn user_exists(&self, user: &UserId) -> Result<bool> {
        Ok(self.state.read().await.users.contains_key(user))
    }

    async fn project_exists(&self, project: &ProjectId) -> Result<bool> {
        Ok(self.state.read().await.projects.contains_key(project))
    }

    async fn is_member(&self, project: &ProjectId, user: &UserId) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .projects
            .get(project)
            .is_some_and(|p| p.is_member(user)))
    }

    async fn user(&self, user: &UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(user).cloned())
    }

    async fn project(&self, project: &ProjectId) -> Result<Option<Project>> {
        Ok(self.state.read().await.projects.get(project).cloned())
    }

    async fn insert_project(&self, project: Project) -> Result<()> {
        let mut state = self.state.write().await;
        if state.projects.contains_key(&project.id) {
            return Err(Error::store(format!(
                "project '{}' already exists",
                project.id
            )));
        }
        state.projects.insert(project.id.clone(), project);
        Ok(())
    }

    async fn update_project(&self, project: Project) -> Result<()> {
        let mut state = self.state.write().await;
        let slot = state
            .projects
            .get_mut(&project.id)
            .ok_or_else(|| Error::ProjectNotFound {
                id: project.id.clone(),
            })?;
        *slot = project;
        Ok(())
    }

    async fn delete_project(&self, project: &ProjectId) -> Result<bool> {
        Ok(self
            .state
            .write()
            .await
            .projects
            .shift_remove(project)
            .is_some())
    }

    async fn add_member(&self, project: &ProjectId, user: UserId) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user) {
            return Err(Error::UserNotFound { id: user });
        }
        let record = state
            .projects
            .get_mut(project)
            .ok_or_else(|| Error::ProjectNotFound {
                id: project.clone(),
            })?;
        Ok(record.members.insert(user))
    }

    async fn remove_member(&self, project: &ProjectId, user: &UserId) -> Result<bool> {
        let mut state = self.state.write().await;
        let record = state
            .projects
            .get_mut(project)
            .ok_or_else(|| Error::ProjectNotFound {
                id: project.clone(),
            })?;
        Ok(record.members.shift_remove(user))
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create_comment(&self, comment: Comment) -> Result<()> {
        let mut state = self.state.write().await;
        if state.comments.contains_key(&comment.id) {
            return Err(Error::store(format!(
                "comment '{}' already exists",
                comment.id
            )));
        }
        state.comments.insert(comment.id.clone(), comment);
        Ok(())
    }

    async fn comment(&self, id: &CommentId) -> Result<Option<Comment>> {
        Ok(self.state.read().await.comments.get(id).cloned())
    }

    async fn comments_on(&self, task: &TaskId) -> Result<Vec<Comment>> {
        Ok(self
            .state
            .read()
            .await
            .comments
            .values()
            .filter(|comment| &comment.task_id == task)
            .cloned()
            .collect())
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<bool> {
        Ok(self.state.write().await.comments.shift_remove(id).is_some())
    }

    async fn delete_comments_on(&self, task: &TaskId) -> Result<usize> {
        let mut state = self.state.write().await;
        let before = state.comments.len();
        state.comments.retain(|_, comment| &comment.task_id != task);
        Ok(before - state.comments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::NewTask;
    use tempfile::TempDir;

    fn edge(parent: &str, child: &str) -> DependencyEdge {
        DependencyEdge::new(TaskId::new(parent), TaskId::new(child))
    }

    #[tokio::test]
    async fn edge_insert_is_a_uniqueness_guard() {
        let store = MemoryStore::new();
        assert!(store.insert(&edge("a", "b")).await.unwrap());
        assert!(!store.insert(&edge("a", "b")).await.unwrap());
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_matching_counts_removed_rows() {
        let store = MemoryStore::new();
        store.insert(&edge("a", "b")).await.unwrap();
        assert_eq!(store.delete_matching(&edge("a", "b")).await.unwrap(), 1);
        assert_eq!(store.delete_matching(&edge("a", "b")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_touching_keeps_other_edges_in_order() {
        let store = MemoryStore::new();
        for (p, c) in [("a", "b"), ("x", "y"), ("b", "c"), ("y", "z")] {
            store.insert(&edge(p, c)).await.unwrap();
        }

        assert_eq!(store.delete_touching(&TaskId::new("b")).await.unwrap(), 2);
        assert_eq!(
            store.list_all().await.unwrap(),
            vec![edge("x", "y"), edge("y", "z")]
        );
    }

    #[tokio::test]
    async fn parents_and_children_follow_edges() {
        let store = MemoryStore::new();
        store.insert(&edge("a", "c")).await.unwrap();
        store.insert(&edge("b", "c")).await.unwrap();

        let parents = store.parents_of(&TaskId::new("c")).await.unwrap();
        assert_eq!(parents, vec![TaskId::new("a"), TaskId::new("b")]);
        let children = store.children_of(&TaskId::new("a")).await.unwrap();
        assert_eq!(children, vec![TaskId::new("c")]);
    }

    #[tokio::test]
    async fn membership_requires_known_user_and_project() {
        let store = MemoryStore::new();
        let alice = store.add_user(UserId::new("alice"), "Alice").await.unwrap();
        let project = Project::new("apollo", None, alice.id.clone());
        store.insert_project(project.clone()).await.unwrap();

        assert!(store.is_member(&project.id, &alice.id).await.unwrap());
        assert!(matches!(
            store.add_member(&project.id, UserId::new("bob")).await,
            Err(Error::UserNotFound { .. })
        ));

        store.add_user(UserId::new("bob"), "Bob").await.unwrap();
        assert!(store.add_member(&project.id, UserId::new("bob")).await.unwrap());
        assert!(!store.add_member(&project.id, UserId::new("bob")).await.unwrap());
        assert!(matches!(
            store
                .add_member(&ProjectId::new("nope"), UserId::new("bob"))
                .await,
            Err(Error::ProjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn remove_member_and_delete_project() {
        let store = MemoryStore::new();
        let alice = store.add_user(UserId::new("alice"), "Alice").await.unwrap();
        let bob = store.add_user(UserId::new("bob"), "Bob").await.unwrap();
        let project = Project::new("apollo", None, alice.id);
        store.insert_project(project.clone()).await.unwrap();
        store.add_member(&project.id, bob.id.clone()).await.unwrap();

        assert!(store.remove_member(&project.id, &bob.id).await.unwrap());
        assert!(!store.remove_member(&project.id, &bob.id).await.unwrap());
        assert!(!store.is_member(&project.id, &bob.id).await.unwrap());

        assert!(store.delete_project(&project.id).await.unwrap());
        assert!(!store.delete_project(&project.id).await.unwrap());
        assert!(matches!(
            store.remove_member(&project.id, &bob.id).await,
            Err(Error::ProjectNotFound { .. })
        ));
        assert!(matches!(
            store.update_project(project).await,
            Err(Error::ProjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn comments_are_listed_per_task_in_order() {
        let store = MemoryStore::new();
        let alice = UserId::new("alice");
        let (a, b) = (TaskId::new("a"), TaskId::new("b"));
        let first = Comment::new(a.clone(), alice.clone(), "first");
        let other = Comment::new(b.clone(), alice.clone(), "elsewhere");
        let second = Comment::new(a.clone(), alice, "second");
        for comment in [&first, &other, &second] {
            store.create_comment(comment.clone()).await.unwrap();
        }

        assert_eq!(
            store.comments_on(&a).await.unwrap(),
            vec![first.clone(), second.clone()]
        );
        assert!(store.delete_comment(&first.id).await.unwrap());
        assert!(store.comment(&first.id).await.unwrap().is_none());
        assert_eq!(store.delete_comments_on(&a).await.unwrap(), 1);
        assert_eq!(store.comments_on(&b).await.unwrap(), vec![other]);
    }

    #[tokio::test]
    async fn duplicate_users_are_rejected() {
        let store = MemoryStore::new();
        store.add_user(UserId::new("alice"), "Alice").await.unwrap();
        let err = store.add_user(UserId::new("alice"), "Again").await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn update_of_missing_task_fails() {
        let store = MemoryStore::new();
        let task = NewTask::new(ProjectId::new("p"), "t").into_task();
        let err = store.update(task).await.unwrap_err();
        assert!(matches!(err, Error::TaskNotFound { .. }));
    }

    #[tokio::test]
    async fn snapshot_survives_save_and_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = MemoryStore::new();
        let alice = store.add_user(UserId::new("alice"), "Alice").await.unwrap();
        let project = Project::new("apollo", Some("moonshot".into()), alice.id.clone());
        store.insert_project(project.clone()).await.unwrap();
        let first = NewTask::new(project.id.clone(), "first").into_task();
        let second = NewTask::new(project.id.clone(), "second").into_task();
        store.create(first.clone()).await.unwrap();
        store.create(second.clone()).await.unwrap();
        store
            .insert(&DependencyEdge::new(first.id, second.id.clone()))
            .await
            .unwrap();
        store
            .create_comment(Comment::new(second.id.clone(), alice.id, "blocked"))
            .await
            .unwrap();
        store.save(&path).await.unwrap();

        let reopened = MemoryStore::open(&path).await.unwrap();
        assert_eq!(reopened.snapshot().await, store.snapshot().await);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(store.snapshot().await, Snapshot::default());
    }

    #[tokio::test]
    async fn open_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();

        let err = MemoryStore::open(&path).await.unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
