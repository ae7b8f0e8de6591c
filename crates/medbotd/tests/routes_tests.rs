//! HTTP route tests, driven through the router without a socket

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use medbot_shared::api::EMPTY_MESSAGE_REPLY;
use medbot_shared::{IntentModel, KnowledgeBase, TrainingOptions};
use medbotd::chat::ChatService;
use medbotd::config::{BotConfig, LlmConfig, Mode};
use medbotd::llm::{ChatClient, FakeChatClient};
use medbotd::server::{app, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn router(mode: Mode) -> Router {
    let kb = KnowledgeBase::builtin().unwrap();
    let (model, _) = IntentModel::train(&kb, &TrainingOptions::default()).unwrap();
    let client: Option<Arc<dyn ChatClient>> = match mode {
        Mode::Hybrid => {
            let fake: Arc<dyn ChatClient> = Arc::new(FakeChatClient::always("Generated reply."));
            Some(fake)
        }
        Mode::Direct => None,
    };
    let bot = BotConfig {
        mode,
        seed: Some(3),
        ..BotConfig::default()
    };
    let chat = ChatService::new(Arc::new(kb), Arc::new(model), client, bot, LlmConfig::default())
        .unwrap();
    let meta = json!({"best_model": "SVM (LinearSVC)", "accuracy": {"SVM (LinearSVC)": 0.91}});
    app(AppState::new(chat, meta, Some(3)))
}

async fn post_chat(router: Router, body: &'static str) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_chat_hybrid() {
    let (status, body) = post_chat(router(Mode::Hybrid), r#"{"message":"What is diabetes"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Generated reply.");
    assert_eq!(body["intent"], "Diabetes");
    assert!(body["confidence"].as_f64().unwrap() > 50.0);
    assert_eq!(body["top3"].as_array().unwrap().len(), 3);
    assert_eq!(body["top3"][0][0], "diabetes");
}

#[tokio::test]
async fn test_chat_direct_answers_from_knowledge_base() {
    let kb = KnowledgeBase::builtin().unwrap();
    let (_, body) = post_chat(router(Mode::Direct), r#"{"message":"paracetamol dose"}"#).await;
    let answer = body["response"].as_str().unwrap();
    assert!(kb.answers_for("paracetamol").iter().any(|a| a == answer));
    assert_eq!(body["intent"], "Paracetamol");
}

#[tokio::test]
async fn test_chat_empty_message() {
    let (status, body) = post_chat(router(Mode::Hybrid), r#"{"message":"   "}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], EMPTY_MESSAGE_REPLY);
    assert_eq!(body["intent"], "");
    assert_eq!(body["confidence"], 0.0);
}

#[tokio::test]
async fn test_chat_malformed_body_is_empty_message() {
    let (status, body) = post_chat(router(Mode::Direct), "not json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], EMPTY_MESSAGE_REPLY);

    let (_, body) = post_chat(router(Mode::Direct), "").await;
    assert_eq!(body["response"], EMPTY_MESSAGE_REPLY);
}

#[tokio::test]
async fn test_chat_answers_despite_odd_history() {
    let bodies = [
        r#"{"message":"what is diabetes","history":[{"role":"user","content":null}]}"#,
        r#"{"message":"what is diabetes","history":null}"#,
        r#"{"message":"what is diabetes","history":[42,{"role":null,"content":"hi"}]}"#,
    ];
    for body in bodies {
        let (status, reply) = post_chat(router(Mode::Hybrid), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["response"], "Generated reply.", "body: {}", body);
        assert_eq!(reply["intent"], "Diabetes");
    }
}

#[tokio::test]
async fn test_models_is_passthrough() {
    let response = router(Mode::Direct)
        .oneshot(Request::builder().uri("/api/models").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!({"best_model": "SVM (LinearSVC)", "accuracy": {"SVM (LinearSVC)": 0.91}})
    );
}

#[tokio::test]
async fn test_health() {
    let response = router(Mode::Direct)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["mode"], "direct");
    assert_eq!(body["num_intents"], 41);
}
