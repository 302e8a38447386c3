#![allow(clippy::print_stderr)]

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(articlegen_cli::ENV_LOG_FILTER))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match articlegen_cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::debug!(error = %format!("{error:#}"), "command failed");
            eprintln!("error: {}", articlegen_cli::describe_error(&error));
            ExitCode::FAILURE
        }
    }
}
