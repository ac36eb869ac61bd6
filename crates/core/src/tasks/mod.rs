//! Task model, dependency engine and task service.
//!
//! A task belongs to exactly one project. Dependencies between tasks are
//! stored as [`DependencyEdge`] rows; the [`DependencyEngine`] is the only
//! component that inserts them, and it refuses any edge that would close a
//! cycle.

mod comment;
mod engine;
mod service;

pub use comment::Comment;
pub use engine::{AddOutcome, DeletedTasks, DependencyEngine, EngineOptions, IntegrityReport};
pub use service::TaskService;

use crate::{Error, ProjectId, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Open,
    /// Someone is working on it.
    InProgress,
    /// Finished.
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in-progress" | "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(Error::validation(format!("Unknown task status: {s}"))),
        }
    }
}

/// A unit of work inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Short title.
    pub title: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional priority; larger is more urgent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// User the task is assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserId>,
    /// Current status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Project the task will belong to.
    pub project_id: ProjectId,
    /// Short title; must not be blank.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Optional priority.
    pub priority: Option<i32>,
    /// Optional assignee; must be an existing user.
    pub assignee: Option<UserId>,
}

impl NewTask {
    /// Start a new task with just a project and title.
    #[must_use]
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: None,
            priority: None,
            assignee: None,
        }
    }

    /// Turn the input into a task with a fresh id and `Open` status.
    #[must_use]
    pub fn into_task(self) -> Task {
        let now = Utc::now();
        Task {
            id: TaskId::generate(),
            project_id: self.project_id,
            title: self.title.trim().to_string(),
            description: self.description,
            priority: self.priority,
            assignee: self.assignee,
            status: TaskStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a task. `None` fields are left untouched.
///
/// The optional task fields take a nested `Option`: `Some(None)` clears the
/// field, `Some(Some(v))` sets it. In JSON, an explicit `null` clears and an
/// absent key leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New or cleared description.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub description: Option<Option<String>>,
    /// New or cleared priority.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub priority: Option<Option<i32>>,
    /// New assignee, or `Some(None)` to unassign.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub assignee: Option<Option<UserId>>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

/// Deserialize a key that is present, keeping `null` as `Some(None)`.
pub(crate) fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TaskUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
            && self.status.is_none()
    }

    /// Apply the update to `task` and bump `updated_at`.
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assignee) = self.assignee {
            task.assignee = assignee;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        task.updated_at = Utc::now();
    }
}

/// Directed dependency: `parent_task_id` must finish before `task_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The task that must finish first.
    pub parent_task_id: TaskId,
    /// The task that waits.
    pub task_id: TaskId,
}

impl DependencyEdge {
    /// Create an edge saying `parent` must finish before `child`.
    #[must_use]
    pub fn new(parent: TaskId, child: TaskId) -> Self {
        Self {
            parent_task_id: parent,
            task_id: child,
        }
    }

    /// Check whether the edge touches `task` at either end.
    #[must_use]
    pub fn touches(&self, task: &TaskId) -> bool {
        &self.parent_task_id == task || &self.task_id == task
    }

    /// Split into `(parent, child)`.
    #[must_use]
    pub fn into_pair(self) -> (TaskId, TaskId) {
        (self.parent_task_id, self.task_id)
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.parent_task_id, self.task_id)
    }
}
