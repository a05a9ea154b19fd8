//! Application wiring and command execution

use std::io::Write;
use std::sync::Arc;

use hare_core::{ChatId, Clock, SystemClock};
use hare_runtime::{open_store, GameEngine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::cli::Commands;
use crate::commands::{Console, Flow, HELP};
use crate::config::AppConfig;
use crate::console::ConsoleTransport;
use crate::error::Result;

/// Build a console session backed by the configured store
pub async fn build_console(config: &AppConfig, chat: ChatId) -> Result<Console> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = open_store(&config.store, clock.clone()).await?;
    let transport = Arc::new(ConsoleTransport::new(clock.clone(), config.cli.show_private));
    let engine = GameEngine::builder(store, transport.clone())
        .with_config(config.game.clone())
        .with_clock(clock)
        .build()?;
    Ok(Console::new(engine, transport, chat))
}

/// Execute a CLI command
pub async fn execute(command: Commands, config: AppConfig) -> Result<()> {
    match command {
        Commands::Play { chat } => play(&config, ChatId::new(chat)).await,
        Commands::Config { write } => {
            match write {
                Some(path) => {
                    config.save_to_file(&path)?;
                    println!("Configuration written to {}", path.display());
                }
                None => print!("{}", config.to_toml()?),
            }
            Ok(())
        }
    }
}

async fn play(config: &AppConfig, chat: ChatId) -> Result<()> {
    let mut console = build_console(config, chat).await?;
    info!(chat = %chat, backend = ?config.store.backend, "console ready");
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", config.cli.prompt);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match console.handle_line(&line).await {
            Ok((Flow::Quit, _)) => break,
            Ok((Flow::Continue, Some(status))) => println!("{}", status),
            Ok((Flow::Continue, None)) => {}
            Err(e) => {
                debug!(error = %e, "console line rejected");
                println!("error: {}", e);
            }
        }
    }
    Ok(())
}
