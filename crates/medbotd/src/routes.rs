//! API routes for medbotd
//!
//! Every route answers 200: chat failures are reported inside the reply body.

use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use medbot_shared::{ChatRequest, ChatResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Chat Routes
// ============================================================================

pub fn chat_routes() -> Router<AppStateArc> {
    Router::new().route("/api/chat", post(chat))
}

async fn chat(State(state): State<AppStateArc>, body: Bytes) -> Json<ChatResponse> {
    // Only a body that is not a JSON object is treated like an empty message;
    // odd history entries are dropped during parsing
    let request = if body.is_empty() {
        ChatRequest::default()
    } else {
        serde_json::from_slice::<ChatRequest>(&body).unwrap_or_else(|e| {
            warn!("  Malformed chat request: {}", e);
            ChatRequest::default()
        })
    };

    info!(
        "  Chat request: {} chars, {} history turns",
        request.message.chars().count(),
        request.history.len()
    );

    let mut rng = state.request_rng();
    Json(state.chat.respond(request, &mut rng).await)
}

// ============================================================================
// Model Routes
// ============================================================================

pub fn model_routes() -> Router<AppStateArc> {
    Router::new().route("/api/models", get(models))
}

async fn models(State(state): State<AppStateArc>) -> Json<serde_json::Value> {
    Json(state.model_meta.clone())
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub mode: String,
    pub num_intents: usize,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        mode: state.chat.mode().as_str().to_string(),
        num_intents: state.chat.knowledge().len(),
    })
}
