//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `run` (default) -- start the bot and poll for updates
//! - `migrate` -- apply pending database migrations and exit
//! - `version` -- print build/version info

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Ovozbot Telegram text-to-speech bot.
#[derive(Parser, Debug)]
#[command(
    name = "ovoz",
    version = env!("CARGO_PKG_VERSION"),
    about = "Ovozbot — a Telegram bot that reads Uzbek text aloud"
)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./ovozbot.json5).
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the bot (default when no subcommand is given).
    Run,

    /// Apply pending database migrations and exit.
    Migrate,

    /// Print version, build date, and git commit information.
    Version,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::{bot, config, logging, store};

/// Run the `run` subcommand: load config, wire up logging, start polling.
pub async fn handle_run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load(config_path)?;
    logging::init(&config.logging)?;

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("config error at {}: {}", error.path, error.message);
        }
        return Err("configuration validation failed".into());
    }

    bot::run(config).await?;
    Ok(())
}

/// Run the `migrate` subcommand: bring the database up to date and report.
pub async fn handle_migrate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load(config_path)?;
    let store = store::VoiceProfileStore::connect(&config.database.path).await?;
    let applied = store::migrations::run(store.pool()).await?;
    if applied == 0 {
        println!("Database {} is up to date", config.database.path);
    } else {
        println!(
            "Applied {} migration(s) to {}",
            applied, config.database.path
        );
    }
    Ok(())
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("ovozbot {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("OVOZBOT_BUILD_DATE"));
    println!("  Git commit: {}", env!("OVOZBOT_GIT_HASH"));
    println!(
        "  Platform:   {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}
