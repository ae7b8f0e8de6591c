//! Configuration management for medbotd.
//!
//! Loads settings from the path given on the command line, then
//! /etc/medbot/config.toml, or uses defaults. Every field has a default so a
//! partial file is valid.

use anyhow::{Context, Result};
use medbot_shared::GatingPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/medbot/config.toml";

/// How replies are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Canned knowledge-base answer, low confidence falls back
    Direct,
    /// Generated answer, intent passed as context when confident
    Hybrid,
}

impl Mode {
    pub fn policy(self) -> GatingPolicy {
        match self {
            Mode::Direct => GatingPolicy::GatedFallback,
            Mode::Hybrid => GatingPolicy::ContextOnly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Direct => "direct",
            Mode::Hybrid => "hybrid",
        }
    }
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Intent detection and reply policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_mode")]
    pub mode: Mode,

    /// Minimum top probability (0-1) to trust the detected intent
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Knowledge base JSON; the built-in one is used when unset
    #[serde(default)]
    pub knowledge_path: Option<String>,

    /// Precomputed model report served verbatim by /api/models
    #[serde(default)]
    pub meta_path: Option<String>,

    /// Seed for answer selection in direct mode (random when unset)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_mode() -> Mode {
    Mode::Hybrid
}

fn default_confidence_threshold() -> f64 {
    0.25
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            confidence_threshold: default_confidence_threshold(),
            knowledge_path: None,
            meta_path: None,
            seed: None,
        }
    }
}

/// Chat-completion backend (OpenAI-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Prior conversation turns forwarded with each request
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

fn default_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_top_p() -> f32 {
    0.9
}

fn default_history_turns() -> usize {
    10
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            history_turns: default_history_turns(),
        }
    }
}

impl LlmConfig {
    /// API key from the configured environment variable, if set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

impl Config {
    /// Load config from `path`, else the system path, else defaults.
    ///
    /// An explicitly given path that cannot be read or parsed is an error;
    /// a missing system file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::load_from_path(Path::new(CONFIG_PATH)).unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {:#}", e);
                Config::default()
            }),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply the PORT environment variable, as hosting platforms set it
    pub fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid PORT value {:?}", port),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.bot.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("bot.confidence_threshold must be within [0, 1], got {}", threshold);
        }
        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
