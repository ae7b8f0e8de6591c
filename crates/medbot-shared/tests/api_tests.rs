//! Tests for api.rs wire shapes

use medbot_shared::api::{display_tag, APOLOGY_REPLY};
use medbot_shared::resolver::{resolve, GatingPolicy};
use medbot_shared::{ChatRequest, ChatResponse, Intent, KnowledgeBase, ModelMeta, TrainingReport};

fn kb() -> KnowledgeBase {
    KnowledgeBase::new(
        vec![
            Intent {
                tag: "heart_disease".into(),
                patterns: vec!["heart attack".into()],
                responses: vec!["See a cardiologist.".into()],
            },
            Intent {
                tag: "fallback".into(),
                patterns: vec![],
                responses: vec!["Not sure.".into()],
            },
        ],
        "fallback",
    )
    .unwrap()
}

#[test]
fn test_response_round_trip_keeps_classification() {
    let labels = vec!["heart_disease".to_string(), "fever".to_string(), "gout".to_string()];
    let resolved = resolve(
        "heart attack",
        &[0.7, 0.2, 0.1],
        &labels,
        &kb(),
        GatingPolicy::ContextOnly,
        0.25,
    )
    .unwrap();

    let reply = ChatResponse::answered("Please rest.", &resolved, "Naive Bayes (MultinomialNB)");
    let json = serde_json::to_string(&reply).unwrap();
    let back: ChatResponse = serde_json::from_str(&json).unwrap();

    assert_eq!(back, reply);
    assert_eq!(back.intent, display_tag(&resolved.tag));
    assert_eq!(back.confidence, resolved.confidence);
    assert_eq!(back.top3.unwrap(), resolved.top3);
}

#[test]
fn test_top3_serializes_as_pairs() {
    let labels = vec!["heart_disease".to_string()];
    let resolved = resolve("x", &[1.0], &labels, &kb(), GatingPolicy::ContextOnly, 0.25).unwrap();
    let json = serde_json::to_value(ChatResponse::answered("ok", &resolved, "m")).unwrap();
    assert_eq!(json["top3"], serde_json::json!([["heart_disease", 100.0]]));
    assert_eq!(json["intent"], "Heart Disease");
    assert_eq!(json["ml_model"], "m");
}

#[test]
fn test_request_history_parsing() {
    let req: ChatRequest = serde_json::from_str(
        r#"{"message":"hi","history":[{"role":"user","content":"a"},{"role":"bot"}]}"#,
    )
    .unwrap();
    assert_eq!(req.message, "hi");
    assert_eq!(req.history.len(), 2);
    assert!(req.history[1].conversational_role().is_none());
}

#[test]
fn test_apology_reply() {
    let reply = ChatResponse::apology();
    assert_eq!(reply.response, APOLOGY_REPLY);
    assert!(reply.intent.is_empty());
    assert_eq!(reply.confidence, 0.0);
}

#[test]
fn test_model_meta_from_training() {
    let report = TrainingReport {
        num_samples: 308,
        num_intents: 40,
        training_accuracy: 0.974_025_97,
    };
    let classes = vec!["anemia".to_string(), "asthma".to_string()];
    let meta = ModelMeta::from_training("NB", &report, &classes);
    assert_eq!(meta.best_model, "NB");
    assert_eq!(meta.accuracy["NB (training set)"], 0.974);
    assert!(!meta.accuracy.contains_key("NB"));
    assert_eq!(meta.num_samples, 308);
    assert_eq!(meta.classes, classes);
}
