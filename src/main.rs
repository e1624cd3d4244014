mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use calprompt_core::config::CalPromptConfig;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calprompt")]
#[command(about = "Turn free-text requests into validated calendar changes")]
struct Cli {
    /// Use this config file instead of ~/.config/calprompt/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask for a change, e.g. "add a workout Thursday evening"
    Ask {
        text: String,

        /// Pretend the request is made at this time (e.g. "tomorrow 9am")
        #[arg(long)]
        at: Option<String>,

        /// Show what would change without touching the calendar
        #[arg(long)]
        dry_run: bool,
    },
    /// List every event in the calendar
    Events,
    /// Print the prompt a request would send to the generator
    Context {
        text: String,

        #[arg(long)]
        at: Option<String>,
    },
    /// Apply a generator reply from a file, or stdin with "-"
    Apply {
        file: String,

        /// Request text the reply answers; enables its overrides
        #[arg(short, long)]
        request: Option<String>,

        #[arg(long)]
        at: Option<String>,
    },
    /// Show config path and effective settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CALPROMPT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let Cli { config, command } = Cli::parse();
    let (config_path, config) = load_config(config)?;

    match command {
        Commands::Ask { text, at, dry_run } => {
            let now = resolve_now(&config, at.as_deref())?;
            commands::ask::run(&config, &text, now, dry_run).await
        }
        Commands::Events => commands::events::run(&config).await,
        Commands::Context { text, at } => {
            let now = resolve_now(&config, at.as_deref())?;
            commands::context::run(&config, &text, now).await
        }
        Commands::Apply { file, request, at } => {
            let now = resolve_now(&config, at.as_deref())?;
            commands::apply::run(&config, &file, request.as_deref(), now).await
        }
        Commands::Config => commands::config::run(&config_path, &config),
    }
}

/// The config file in effect, and what it holds.
fn load_config(path: Option<PathBuf>) -> Result<(PathBuf, CalPromptConfig)> {
    let (path, config) = match path {
        Some(path) => {
            let config = CalPromptConfig::load_from(&path);
            (path, config)
        }
        None => (CalPromptConfig::config_path()?, CalPromptConfig::load()),
    };
    let config = config.context("Could not load configuration")?;
    Ok((path, config))
}

/// The reference instant for a request: now, or `--at` read as a wall-clock
/// time in the configured civil zone.
fn resolve_now(config: &CalPromptConfig, at: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(at) = at else {
        return Ok(Utc::now());
    };

    let tz = config.session_settings()?.tz;
    let local = fuzzydate::parse(at)
        .map_err(|_| anyhow::anyhow!("Could not parse date/time: \"{}\"", at))?;

    let now = tz.to_storage_zone(tz.from_wall_clock(local));
    tracing::debug!(%now, "Using --at as the reference time");
    Ok(now)
}
