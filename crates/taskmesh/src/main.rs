//! taskmesh CLI Application
//!
//! Thin entry point: parse arguments, set up tracing, run one command and map
//! the outcome to an exit code.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use taskmesh::cli::{self, CliError, EXIT_OK, exit_code_for, render_error};
use taskmesh::commands;
use taskmesh::tracing::{TracingConfig, init_tracing};
use tracing::instrument;

fn main() {
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();
    let json_mode = cli.json;

    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        ..Default::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        let err = CliError::config(format!("Failed to initialize tracing: {e}"));
        render_error(&err, json_mode);
        std::process::exit(exit_code_for(&err));
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let exit_code = runtime.block_on(run(cli));
    std::process::exit(exit_code);
}

#[instrument(name = "taskmesh_run", skip_all)]
async fn run(cli: cli::Cli) -> i32 {
    let json_mode = cli.json;
    match commands::run(cli).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            EXIT_OK
        }
        Err(err) => {
            tracing::debug!(error = %err, "Command failed");
            render_error(&err, json_mode);
            exit_code_for(&err)
        }
    }
}
