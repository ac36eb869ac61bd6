//! Users and projects.
//!
//! These are the records the task service consults for ownership and
//! membership checks. Authentication itself happens before a request reaches
//! this crate; a [`UserId`] here is an already-authenticated principal.
//! [`ProjectService`] manages projects and their membership.

mod service;

pub use service::{DeletedProject, ProjectService, ProjectUpdate};

use crate::{ProjectId, UserId};
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A user that can own projects and be assigned tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// When the user was registered.
    pub created_at: DateTime<Utc>,
}

/// A project groups tasks and the users allowed to work on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier.
    pub id: ProjectId,
    /// Project name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The user who created the project.
    pub owner: UserId,
    /// Members in the order they joined. Always contains the owner.
    pub members: IndexSet<UserId>,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create a project whose only member is its owner.
    #[must_use]
    pub fn new(name: impl Into<String>, description: Option<String>, owner: UserId) -> Self {
        let mut members = IndexSet::new();
        members.insert(owner.clone());
        Self {
            id: ProjectId::generate(),
            name: name.into(),
            description,
            owner,
            members,
            created_at: Utc::now(),
        }
    }

    /// Check whether a user belongs to the project.
    #[must_use]
    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    /// Check whether a user owns the project.
    #[must_use]
    pub fn is_owner(&self, user: &UserId) -> bool {
        &self.owner == user
    }
}
