//! `taskmesh order` and `taskmesh check`

use super::{Output, Session, lines};
use crate::cli::CliError;
use taskmesh_core::TaskId;

pub(super) async fn order(session: &Session, waves: bool) -> Result<Output, CliError> {
    let engine = session.service.engine();
    if waves {
        let waves = engine.execution_waves().await?;
        let text = waves
            .iter()
            .enumerate()
            .map(|(i, wave)| {
                let ids: Vec<&str> = wave.iter().map(TaskId::as_str).collect();
                format!("wave {i}: {}", ids.join(" "))
            })
            .collect::<Vec<_>>()
            .join("\n");
        Output::read(text, &waves)
    } else {
        let order = engine.resolve_order().await?;
        Output::read(lines(&order), &order)
    }
}

pub(super) async fn check(session: &Session) -> Result<Output, CliError> {
    let report = session.service.engine().check_integrity().await?;
    if report.is_healthy() {
        return Output::read("ok", serde_json::json!({ "healthy": true }));
    }

    let mut problems: Vec<String> = report.graph.errors.iter().map(ToString::to_string).collect();
    problems.extend(
        report
            .dangling
            .iter()
            .map(|edge| format!("Dangling dependency: {edge}")),
    );
    Err(CliError::domain(format!(
        "Dependency graph check failed:\n{}",
        problems.join("\n")
    )))
}
