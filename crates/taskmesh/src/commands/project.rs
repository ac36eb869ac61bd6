//! `taskmesh project ...`

use super::{Output, Session};
use crate::cli::{CliError, ProjectCommands};
use std::fmt::Write;
use taskmesh_core::project::{Project, ProjectUpdate};
use taskmesh_core::{ProjectId, UserId};

pub(super) async fn execute(
    command: ProjectCommands,
    session: &Session,
) -> Result<Output, CliError> {
    let projects = &session.projects;
    match command {
        ProjectCommands::Create {
            name,
            owner,
            description,
        } => {
            let project = projects
                .create(&UserId::new(owner), &name, description)
                .await?;
            Output::write(project.id.to_string(), &project)
        }
        ProjectCommands::Show { project } => {
            let project = projects.get(&ProjectId::new(project)).await?;
            Output::read(describe(&project), &project)
        }
        ProjectCommands::Update {
            project,
            requester,
            name,
            description,
            clear_description,
        } => {
            let update = ProjectUpdate {
                name,
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
            };
            let project = projects
                .update(&ProjectId::new(project), &UserId::new(requester.user), update)
                .await?;
            Output::write(format!("updated {}", project.id), &project)
        }
        ProjectCommands::AddMember {
            project,
            user,
            requester,
        } => {
            let project = ProjectId::new(project);
            let user = UserId::new(user);
            let added = projects
                .add_member(&project, &UserId::new(requester.user), &user)
                .await?;
            let text = if added {
                format!("added {user} to {project}")
            } else {
                format!("{user} is already a member of {project}")
            };
            Output::write(
                text,
                serde_json::json!({ "project": project, "user": user, "added": added }),
            )
        }
        ProjectCommands::RemoveMember {
            project,
            user,
            requester,
        } => {
            let project = ProjectId::new(project);
            let user = UserId::new(user);
            let removed = projects
                .remove_member(&project, &UserId::new(requester.user), &user)
                .await?;
            let text = if removed {
                format!("removed {user} from {project}")
            } else {
                format!("{user} is not a member of {project}")
            };
            Output::write(
                text,
                serde_json::json!({ "project": project, "user": user, "removed": removed }),
            )
        }
        ProjectCommands::Delete { project, requester } => {
            let deleted = projects
                .delete(&ProjectId::new(project), &UserId::new(requester.user))
                .await?;
            Output::write(
                format!(
                    "deleted {} ({} tasks, {} dependencies, {} comments)",
                    deleted.project,
                    deleted.tasks.len(),
                    deleted.edges,
                    deleted.comments
                ),
                &deleted,
            )
        }
        ProjectCommands::List => {
            let projects = session.store.list_projects().await;
            let text = projects
                .iter()
                .map(|p| format!("{}\t{}\towner={}\tmembers={}", p.id, p.name, p.owner, p.members.len()))
                .collect::<Vec<_>>()
                .join("\n");
            Output::read(text, &projects)
        }
    }
}

fn describe(project: &Project) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "id:          {}", project.id);
    let _ = writeln!(out, "name:        {}", project.name);
    if let Some(description) = &project.description {
        let _ = writeln!(out, "description: {description}");
    }
    let _ = writeln!(out, "owner:       {}", project.owner);
    let members = project
        .members
        .iter()
        .map(UserId::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "members:     {members}");
    let _ = write!(out, "created:     {}", project.created_at.to_rfc3339());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_lists_members_in_join_order() {
        let mut project = Project::new("apollo", None, UserId::new("alice"));
        project.members.insert(UserId::new("bob"));
        let text = describe(&project);

        assert!(text.contains("name:        apollo"));
        assert!(text.contains("members:     alice, bob"));
        assert!(!text.contains("description"));
    }
}
