//! `taskmesh dep ...`

use super::{Output, Session, lines};
use crate::cli::{CliError, DepCommands};
use taskmesh_core::tasks::AddOutcome;
use taskmesh_core::{TaskId, UserId};

pub(super) async fn execute(command: DepCommands, session: &Session) -> Result<Output, CliError> {
    let service = &session.service;
    match command {
        DepCommands::Add {
            task,
            dependency,
            requester,
        } => {
            let task = TaskId::new(task);
            let dependency = TaskId::new(dependency);
            let outcome = service
                .add_dependency(&task, &dependency, &UserId::new(requester.user))
                .await?;
            let text = match outcome {
                AddOutcome::Added => format!("added: {dependency} -> {task}"),
                AddOutcome::AlreadyPresent => format!("already present: {dependency} -> {task}"),
            };
            let data = serde_json::json!({
                "task": task,
                "dependency": dependency,
                "outcome": outcome,
            });
            match outcome {
                AddOutcome::Added => Output::write(text, data),
                AddOutcome::AlreadyPresent => Output::read(text, data),
            }
        }
        DepCommands::Remove {
            task,
            dependency,
            requester,
        } => {
            let task = TaskId::new(task);
            let dependency = TaskId::new(dependency);
            let removed = service
                .remove_dependency(&task, &dependency, &UserId::new(requester.user))
                .await?;
            let data = serde_json::json!({
                "task": task,
                "dependency": dependency,
                "removed": removed,
            });
            Output::write(format!("removed {removed}"), data)
        }
        DepCommands::List { task, transitive } => {
            let task = TaskId::new(task);
            let ids = if transitive {
                service.engine().prerequisites_of(&task).await?
            } else {
                service.engine().dependencies_of(&task).await?
            };
            Output::read(lines(&ids), &ids)
        }
        DepCommands::Dependents { task } => {
            let ids = service.engine().dependents_of(&TaskId::new(task)).await?;
            Output::read(lines(&ids), &ids)
        }
    }
}
