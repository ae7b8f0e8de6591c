//! MedBot Daemon - medical FAQ chatbot
//!
//! Classifies each message into a medical intent and answers from the
//! knowledge base or through a chat-completion backend.

use anyhow::Result;
use clap::Parser;
use medbotd::config::{Config, Mode};
use medbotd::server::{self, AppState};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "medbotd", version, about = "MedBot hybrid ML + LLM medical chatbot")]
struct Args {
    /// Config file (defaults to /etc/medbot/config.toml)
    #[arg(short, long, env = "MEDBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port, overrides config and PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Reply mode, overrides config
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(mode) = args.mode {
        config.bot.mode = mode;
    }

    info!("MedBot Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let state = AppState::from_config(&config)?;
    info!(
        "  Mode: {} | threshold: {} | LLM: {}",
        config.bot.mode.as_str(),
        config.bot.confidence_threshold,
        if config.bot.mode == Mode::Hybrid {
            config.llm.model.as_str()
        } else {
            "disabled"
        }
    );

    server::run(state, &config.listen_addr()).await
}
