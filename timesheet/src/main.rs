mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

// Single-threaded so the local UTC offset can be read safely on unix.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let offset = timesheet::time_utils::local_offset();
    dotenvy::dotenv().ok();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::run(cli.command, offset).await
}
