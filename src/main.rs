use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use expense_split::cli::{self, Cli};

#[tokio::main] // using Tokio runtime for async
async fn main() -> ExitCode {
    // warn by default, RUST_LOG overrides
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
