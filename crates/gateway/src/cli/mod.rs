pub mod chat;
pub mod config;
pub mod process;

use clap::{Parser, Subcommand};

use lq_domain::config::Config;

/// leadqual: webhook-driven lead qualification chatbot.
#[derive(Debug, Parser)]
#[command(name = "leadqual", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the webhook server (default when no subcommand is given).
    Serve,
    /// Run one inactivity sweep and exit.
    ProcessSessions,
    /// Talk to the bot from the terminal, fully in memory.
    Chat {
        /// User id the conversation is recorded under.
        #[arg(long, default_value = "cli-user")]
        user: String,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (defaults and env overrides applied) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load `.env`, then the TOML file named by `LQ_CONFIG` (or `config.toml`),
/// then apply environment overrides. A missing file means all defaults.
///
/// Returns the config and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to read .env");
        }
    }

    let config_path = std::env::var("LQ_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let mut config = read_config_file(std::path::Path::new(&config_path))?;

    for issue in config.apply_env_overrides() {
        tracing::warn!("env: {issue}");
    }

    Ok((config, config_path))
}

/// Parse a TOML config file. A missing file yields [`Config::default`].
pub fn read_config_file(path: &std::path::Path) -> anyhow::Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))
}
