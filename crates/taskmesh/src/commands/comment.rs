//! `taskmesh comment ...`

use super::{Output, Session};
use crate::cli::{CliError, CommentCommands};
use taskmesh_core::{CommentId, TaskId, UserId};

pub(super) async fn execute(
    command: CommentCommands,
    session: &Session,
) -> Result<Output, CliError> {
    let service = &session.service;
    match command {
        CommentCommands::Add {
            task,
            body,
            requester,
        } => {
            let comment = service
                .add_comment(&TaskId::new(task), &UserId::new(requester.user), &body)
                .await?;
            Output::write(comment.id.to_string(), &comment)
        }
        CommentCommands::List { task } => {
            let comments = service.comments(&TaskId::new(task)).await?;
            let text = comments
                .iter()
                .map(|c| format!("{}\t{}\t{}", c.id, c.author, c.body))
                .collect::<Vec<_>>()
                .join("\n");
            Output::read(text, &comments)
        }
        CommentCommands::Delete { comment, requester } => {
            let comment = CommentId::new(comment);
            service
                .delete_comment(&comment, &UserId::new(requester.user))
                .await?;
            Output::write(
                format!("deleted {comment}"),
                serde_json::json!({ "comment": comment }),
            )
        }
    }
}
