//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `start` (default) -- run the bot
//! - `config show|get|set|path` -- read/write configuration
//! - `version` -- print build/version info

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bot::Bot;
use crate::bridge::HttpBridge;
use crate::config::{self, ConfigStore};

/// Delayed auto-reply bot for a WhatsApp bridge daemon.
#[derive(Parser, Debug)]
#[command(
    name = "awaybot",
    version = env!("CARGO_PKG_VERSION"),
    about = "awaybot — delayed auto-replies over a WhatsApp bridge"
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "AWAYBOT_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bot (default when no subcommand is given).
    Start,

    /// Read or write configuration values.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the loaded configuration as JSON.
    Show,

    /// Print a specific configuration value by dot-notation path.
    Get {
        /// Dot-notation key (e.g. "defaults.delay_seconds").
        key: String,
    },

    /// Set a configuration value and write to disk.
    Set {
        /// Dot-notation key (e.g. "defaults.rate_limit_minutes").
        key: String,

        /// Value to set (interpreted as JSON; bare strings allowed).
        value: String,
    },

    /// Print the resolved configuration file path.
    Path,
}

/// Run the `start` subcommand: load config, connect the bridge, run the bot
/// until a shutdown signal arrives.
pub async fn handle_start(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(ConfigStore::load(config_path)?);
    let bridge = Arc::new(HttpBridge::connect(store.snapshot().bridge)?);
    let bot = Bot::new(store, bridge);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received");
            shutdown.cancel();
        });
    }

    bot.run(shutdown).await;
    Ok(())
}

/// Run the `config show` subcommand.
pub fn handle_config_show(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let document = config::read_document(config_path)?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

/// Run the `config get <key>` subcommand.
pub fn handle_config_get(config_path: &Path, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let document = config::read_document(config_path)?;
    match get_value_at_path(&document, key) {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(())
        }
        None => Err(format!("key not found: {}", key).into()),
    }
}

/// Run the `config set <key> <value>` subcommand.
pub fn handle_config_set(
    config_path: &Path,
    key: &str,
    raw_value: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    // Parse value as JSON first; fall back to treating it as a plain string.
    let value: Value =
        serde_json::from_str(raw_value).unwrap_or_else(|_| Value::String(raw_value.to_string()));

    let mut document = config::read_document(config_path)?;
    set_value_at_path(&mut document, key, value.clone());

    // Reject edits that would leave the file unloadable.
    let config: config::BotConfig = serde_json::from_value(document.clone())
        .map_err(|e| format!("refusing to write invalid config: {}", e))?;
    config.validate()?;

    config::write_document(config_path, &document)?;
    println!("Set {} = {}", key, serde_json::to_string(&value)?);
    Ok(())
}

/// Print version and build information.
pub fn handle_version() {
    println!(
        "awaybot {} (commit {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("AWAYBOT_GIT_HASH"),
        env!("AWAYBOT_BUILD_DATE"),
    );
}

/// Walk a dot-notation path into a JSON document.
fn get_value_at_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Set a value at a dot-notation path, creating intermediate objects.
fn set_value_at_path(document: &mut Value, path: &str, value: Value) {
    let mut current = document;
    let segments: Vec<&str> = path.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        if !current.is_object() {
            *current = Value::Object(serde_json::Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        if i == segments.len() - 1 {
            map.insert((*segment).to_string(), value);
            return;
        }
        current = map
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
