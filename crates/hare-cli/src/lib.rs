//! Hare CLI library
//!
//! A console stand-in for a group chat: users type commands and button
//! presses, the engine answers through `ConsoleTransport`.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;

pub use cli::{Cli, Commands};
pub use commands::{Console, ConsoleCommand};
pub use config::AppConfig;
pub use console::ConsoleTransport;
pub use error::{CliError, Result};
