//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path, applied over every other source
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep sessions in this sqlite database instead of in memory
    #[arg(long)]
    pub database: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play in a simulated group chat on the console
    Play {
        /// Chat to start in
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        chat: i64,
    },
    /// Print the effective configuration
    Config {
        /// Save the effective configuration to this file instead
        #[arg(long)]
        write: Option<PathBuf>,
    },
}
