//! Wire types for the chat HTTP API.

use crate::classifier::TrainingReport;
use crate::resolver::ResolvedIntent;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reply when the message is empty or missing
pub const EMPTY_MESSAGE_REPLY: &str = "Please ask me a medical question, I'm here to help! 🩺";

/// Reply when anything downstream of validation fails
pub const APOLOGY_REPLY: &str =
    "⚠️ Something went wrong while preparing your answer. Please try again.";

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// One prior turn, as sent by the browser. Unknown roles are kept as text
/// and dropped when the conversation is composed; a null or non-string
/// field reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let role = match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }

    /// User/assistant turns with content; anything else is ignored
    pub fn conversational_role(&self) -> Option<Role> {
        match Role::parse(&self.role) {
            Some(role @ (Role::User | Role::Assistant)) if !self.content.is_empty() => Some(role),
            _ => None,
        }
    }
}

/// POST /api/chat body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_history")]
    pub history: Vec<ChatTurn>,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

/// `null` or a non-array is no history; entries that are not objects are skipped
fn lenient_history<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ChatTurn>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// POST /api/chat reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub intent: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top3: Option<Vec<(String, f64)>>,
}

impl ChatResponse {
    /// Successful reply carrying the classification
    pub fn answered(text: impl Into<String>, resolved: &ResolvedIntent, model: &str) -> Self {
        Self {
            response: text.into(),
            intent: display_tag(&resolved.tag),
            confidence: resolved.confidence,
            ml_model: Some(model.to_string()),
            top3: Some(resolved.top3.clone()),
        }
    }

    pub fn empty_message() -> Self {
        Self::bare(EMPTY_MESSAGE_REPLY)
    }

    pub fn apology() -> Self {
        Self::bare(APOLOGY_REPLY)
    }

    fn bare(text: &str) -> Self {
        Self {
            response: text.to_string(),
            intent: String::new(),
            confidence: 0.0,
            ml_model: None,
            top3: None,
        }
    }
}

/// Model report served by GET /api/models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub best_model: String,
    pub accuracy: BTreeMap<String, f64>,
    pub num_intents: usize,
    pub num_samples: usize,
    pub classes: Vec<String>,
}

impl ModelMeta {
    /// Report for a model trained at startup. The score is measured on the
    /// training phrases and its key says so.
    pub fn from_training(model_name: &str, report: &TrainingReport, classes: &[String]) -> Self {
        let mut accuracy = BTreeMap::new();
        accuracy.insert(
            format!("{} (training set)", model_name),
            (report.training_accuracy * 10_000.0).round() / 10_000.0,
        );
        Self {
            best_model: model_name.to_string(),
            accuracy,
            num_intents: report.num_intents,
            num_samples: report.num_samples,
            classes: classes.to_vec(),
        }
    }
}

/// "heart_disease" -> "Heart Disease"
pub fn display_tag(tag: &str) -> String {
    tag.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_tag() {
        assert_eq!(display_tag("heart_disease"), "Heart Disease");
        assert_eq!(display_tag("covid19"), "Covid19");
        assert_eq!(display_tag("uti"), "Uti");
        assert_eq!(display_tag(""), "");
    }

    #[test]
    fn test_request_defaults() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.message.is_empty());
        assert!(req.history.is_empty());
    }

    #[test]
    fn test_request_tolerates_odd_history() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message":"fever","history":[{"role":"user","content":null},{"role":7},"hi",{"role":"assistant","content":"ok"}]}"#,
        )
        .unwrap();
        assert_eq!(req.message, "fever");
        assert_eq!(req.history.len(), 3);
        assert_eq!(req.history[0].conversational_role(), None);
        assert_eq!(req.history[1].role, "");
        assert_eq!(req.history[2], ChatTurn::new(Role::Assistant, "ok"));

        let req: ChatRequest =
            serde_json::from_str(r#"{"message":"fever","history":null}"#).unwrap();
        assert!(req.history.is_empty());
    }

    #[test]
    fn test_conversational_role_filters() {
        assert_eq!(
            ChatTurn::new(Role::User, "hi").conversational_role(),
            Some(Role::User)
        );
        assert_eq!(ChatTurn::new(Role::System, "x").conversational_role(), None);
        assert_eq!(ChatTurn::new(Role::Assistant, "").conversational_role(), None);
        let odd = ChatTurn {
            role: "tool".into(),
            content: "x".into(),
        };
        assert_eq!(odd.conversational_role(), None);
    }

    #[test]
    fn test_empty_message_reply_shape() {
        let json = serde_json::to_value(ChatResponse::empty_message()).unwrap();
        assert_eq!(json["intent"], "");
        assert_eq!(json["confidence"], 0.0);
        assert!(json.get("top3").is_none());
    }
}
