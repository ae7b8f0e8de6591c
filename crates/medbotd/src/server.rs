//! HTTP server for medbotd

use crate::chat::ChatService;
use crate::config::{Config, Mode};
use crate::llm::{ChatClient, HttpChatClient};
use crate::routes;
use anyhow::{Context, Result};
use axum::Router;
use medbot_shared::classifier::Classifier;
use medbot_shared::{IntentModel, KnowledgeBase, ModelMeta, TrainingOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state shared across handlers. Read-only after startup.
pub struct AppState {
    pub chat: ChatService,
    /// Served verbatim by /api/models
    pub model_meta: serde_json::Value,
    pub start_time: Instant,
    seed: Option<u64>,
    request_counter: AtomicU64,
}

impl AppState {
    pub fn new(chat: ChatService, model_meta: serde_json::Value, seed: Option<u64>) -> Self {
        Self {
            chat,
            model_meta,
            start_time: Instant::now(),
            seed,
            request_counter: AtomicU64::new(0),
        }
    }

    /// Load knowledge, train the classifier and connect the generator
    pub fn from_config(config: &Config) -> Result<Self> {
        let kb = match &config.bot.knowledge_path {
            Some(path) => KnowledgeBase::load(path)
                .with_context(|| format!("failed to load knowledge base {}", path))?,
            None => KnowledgeBase::builtin().context("built-in knowledge base is invalid")?,
        };

        let (model, report) = IntentModel::train(&kb, &TrainingOptions::default())
            .context("failed to train intent classifier")?;

        let model_meta = match &config.bot.meta_path {
            Some(path) => load_meta(Path::new(path))?,
            None => serde_json::to_value(ModelMeta::from_training(
                model.name(),
                &report,
                model.labels(),
            ))?,
        };

        let client: Option<Arc<dyn ChatClient>> = match config.bot.mode {
            Mode::Hybrid => {
                let api_key = config.llm.api_key();
                if api_key.is_none() {
                    warn!(
                        "{} is not set; chat-completion requests are sent unauthenticated",
                        config.llm.api_key_env
                    );
                }
                let client: Arc<dyn ChatClient> =
                    Arc::new(HttpChatClient::new(config.llm.clone(), api_key)?);
                Some(client)
            }
            Mode::Direct => None,
        };

        let chat = ChatService::new(
            Arc::new(kb),
            Arc::new(model),
            client,
            config.bot.clone(),
            config.llm.clone(),
        )?;

        Ok(Self::new(chat, model_meta, config.bot.seed))
    }

    /// Fresh RNG for one request: deterministic per request when seeded
    pub fn request_rng(&self) -> StdRng {
        let n = self.request_counter.fetch_add(1, Ordering::Relaxed);
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(n)),
            None => StdRng::from_entropy(),
        }
    }
}

/// Precomputed model report, kept as opaque JSON
fn load_meta(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read model report {}", path.display()))?;
    let meta: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse model report {}", path.display()))?;
    info!("Loaded model report from {}", path.display());
    Ok(meta)
}

/// All routes with state and tracing attached
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::chat_routes())
        .merge(routes::model_routes())
        .merge(routes::health_routes())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(state: AppState, addr: &str) -> Result<()> {
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gracefully");
        })
        .await?;
    Ok(())
}
