//! `taskmesh user ...`

use super::{Output, Session};
use crate::cli::{CliError, UserCommands};
use taskmesh_core::UserId;

pub(super) async fn execute(command: UserCommands, session: &Session) -> Result<Output, CliError> {
    match command {
        UserCommands::Add { id, name } => {
            let name = name.unwrap_or_else(|| id.clone());
            let user = session.store.add_user(UserId::new(id), name).await?;
            Output::write(user.id.to_string(), &user)
        }
        UserCommands::List => {
            let users = session.store.list_users().await;
            let text = users
                .iter()
                .map(|u| format!("{}\t{}", u.id, u.name))
                .collect::<Vec<_>>()
                .join("\n");
            Output::read(text, &users)
        }
    }
}
