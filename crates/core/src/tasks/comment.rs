//! Comments attached to tasks.

use crate::{CommentId, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A note left on a task by a project member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier.
    pub id: CommentId,
    /// Task the comment belongs to.
    pub task_id: TaskId,
    /// User who wrote the comment; the only one allowed to delete it.
    pub author: UserId,
    /// Comment text.
    pub body: String,
    /// When the comment was written.
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Create a comment with a fresh id.
    #[must_use]
    pub fn new(task_id: TaskId, author: UserId, body: impl Into<String>) -> Self {
        Self {
            id: CommentId::generate(),
            task_id,
            author,
            body: body.into().trim().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Check whether `user` wrote this comment.
    #[must_use]
    pub fn is_author(&self, user: &UserId) -> bool {
        &self.author == user
    }
}
