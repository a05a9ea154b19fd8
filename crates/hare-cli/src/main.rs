//! Hare CLI - console entry point

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hare_cli::{app, cli::Cli, config::AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref(), cli.database.as_deref())
        .context("failed to load configuration")?;

    app::execute(cli.command, config).await?;
    Ok(())
}

/// Setup logging; `RUST_LOG` wins over `--verbose`
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
