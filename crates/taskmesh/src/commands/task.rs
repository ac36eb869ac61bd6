//! `taskmesh task ...`

use super::{Output, Session};
use crate::cli::{CliError, TaskCommands};
use std::fmt::Write;
use taskmesh_core::tasks::{NewTask, Task, TaskUpdate};
use taskmesh_core::{ProjectId, TaskId, UserId};

pub(super) async fn execute(command: TaskCommands, session: &Session) -> Result<Output, CliError> {
    let service = &session.service;
    match command {
        TaskCommands::Create {
            project,
            title,
            requester,
            description,
            priority,
            assignee,
        } => {
            let new = NewTask {
                description,
                priority,
                assignee: assignee.map(UserId::new),
                ..NewTask::new(ProjectId::new(project), title)
            };
            let task = service.create(&UserId::new(requester.user), new).await?;
            Output::write(task.id.to_string(), &task)
        }
        TaskCommands::Show { task } => {
            let task = service.get(&TaskId::new(task)).await?;
            let dependencies = service.engine().dependencies_of(&task.id).await?;
            let dependents = service.engine().dependents_of(&task.id).await?;
            let text = describe(&task, &dependencies, &dependents);
            Output::read(
                text,
                serde_json::json!({
                    "task": task,
                    "dependencies": dependencies,
                    "dependents": dependents,
                }),
            )
        }
        TaskCommands::Update {
            task,
            requester,
            title,
            description,
            clear_description,
            priority,
            clear_priority,
            assignee,
            unassign,
            status,
        } => {
            let update = TaskUpdate {
                title,
                description: set_or_clear(description, clear_description),
                priority: set_or_clear(priority, clear_priority),
                assignee: set_or_clear(assignee.map(UserId::new), unassign),
                status,
            };
            let task = service
                .update(&TaskId::new(task), &UserId::new(requester.user), update)
                .await?;
            Output::write(format!("updated {}", task.id), &task)
        }
        TaskCommands::Delete { task, requester } => {
            let task = TaskId::new(task);
            let removed = service.delete(&task, &UserId::new(requester.user)).await?;
            Output::write(
                format!("deleted {task} (removed {removed} dependencies)"),
                serde_json::json!({ "task": task, "dependencies_removed": removed }),
            )
        }
        TaskCommands::List { project } => {
            let tasks = service.list_by_project(&ProjectId::new(project)).await?;
            let text = tasks
                .iter()
                .map(|t| format!("{}\t{}\t{}", t.id, t.status, t.title))
                .collect::<Vec<_>>()
                .join("\n");
            Output::read(text, &tasks)
        }
    }
}

/// Map a `--field` / `--clear-field` pair onto a nested update option.
fn set_or_clear<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear { Some(None) } else { value.map(Some) }
}

fn describe(task: &Task, dependencies: &[TaskId], dependents: &[TaskId]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "id:          {}", task.id);
    let _ = writeln!(out, "title:       {}", task.title);
    let _ = writeln!(out, "project:     {}", task.project_id);
    let _ = writeln!(out, "status:      {}", task.status);
    if let Some(description) = &task.description {
        let _ = writeln!(out, "description: {description}");
    }
    if let Some(priority) = task.priority {
        let _ = writeln!(out, "priority:    {priority}");
    }
    if let Some(assignee) = &task.assignee {
        let _ = writeln!(out, "assignee:    {assignee}");
    }
    let _ = writeln!(out, "created:     {}", task.created_at.to_rfc3339());
    let _ = writeln!(out, "updated:     {}", task.updated_at.to_rfc3339());
    let _ = writeln!(out, "depends on:  {}", join_or_dash(dependencies));
    let _ = write!(out, "needed by:   {}", join_or_dash(dependents));
    out
}

fn join_or_dash(ids: &[TaskId]) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.iter().map(TaskId::as_str).collect::<Vec<_>>().join(", ")
    }
}
