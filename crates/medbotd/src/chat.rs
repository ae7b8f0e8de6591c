//! Chat pipeline: validate -> classify -> resolve -> reply.
//!
//! Direct mode answers from the knowledge base; hybrid mode asks the
//! chat-completion backend with the resolved intent as context. Every
//! failure past message validation degrades to the fixed apology.

use crate::config::{BotConfig, LlmConfig, Mode};
use crate::llm::{ChatClient, LlmError};
use crate::prompts::{build_system_prompt, compose_messages};
use medbot_shared::resolver::normalize_message;
use medbot_shared::{
    resolve, ChatRequest, ChatResponse, ChatTurn, Classifier, KnowledgeBase, MedbotError,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("intent resolution failed: {0}")]
    Resolve(#[from] MedbotError),

    #[error("generation failed: {0}")]
    Llm(#[from] LlmError),

    #[error("intent '{0}' has no answers")]
    NoAnswer(String),
}

pub struct ChatService {
    kb: Arc<KnowledgeBase>,
    classifier: Arc<dyn Classifier>,
    client: Option<Arc<dyn ChatClient>>,
    bot: BotConfig,
    llm: LlmConfig,
}

impl ChatService {
    /// `client` is required in hybrid mode and ignored in direct mode
    pub fn new(
        kb: Arc<KnowledgeBase>,
        classifier: Arc<dyn Classifier>,
        client: Option<Arc<dyn ChatClient>>,
        bot: BotConfig,
        llm: LlmConfig,
    ) -> Result<Self, MedbotError> {
        if bot.mode == Mode::Hybrid && client.is_none() {
            return Err(MedbotError::Configuration(
                "hybrid mode needs a chat-completion client".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&bot.confidence_threshold) {
            return Err(MedbotError::Configuration(format!(
                "confidence threshold {} is outside [0, 1]",
                bot.confidence_threshold
            )));
        }
        Ok(Self {
            kb,
            classifier,
            client,
            bot,
            llm,
        })
    }

    pub fn mode(&self) -> Mode {
        self.bot.mode
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// Answer one request. Never fails: errors become the apology reply.
    pub async fn respond<R: Rng + Send>(&self, request: ChatRequest, rng: &mut R) -> ChatResponse {
        let message = request.message.trim();
        if message.is_empty() {
            return ChatResponse::empty_message();
        }

        match self.try_respond(message, &request.history, rng).await {
            Ok(response) => response,
            Err(e) => {
                error!("Chat request failed: {}", e);
                ChatResponse::apology()
            }
        }
    }

    async fn try_respond<R: Rng + Send>(
        &self,
        message: &str,
        history: &[ChatTurn],
        rng: &mut R,
    ) -> Result<ChatResponse, ChatError> {
        let normalized = normalize_message(message);
        let probabilities = self.classifier.predict_proba(&normalized);
        let resolved = resolve(
            &normalized,
            &probabilities,
            self.classifier.labels(),
            &self.kb,
            self.bot.mode.policy(),
            self.bot.confidence_threshold,
        )?;

        info!(
            "Intent {} ({}%), resolved to {}",
            resolved.predicted_tag, resolved.confidence, resolved.tag
        );

        let model_name = self.classifier.name();
        let text = match (self.bot.mode, &self.client) {
            (Mode::Hybrid, Some(client)) => {
                let system_prompt = build_system_prompt(&resolved, model_name);
                let messages =
                    compose_messages(system_prompt, history, self.llm.history_turns, message);
                let timeout = Duration::from_secs(self.llm.timeout_secs);
                match tokio::time::timeout(timeout, client.complete(&messages)).await {
                    Ok(reply) => reply?,
                    Err(_) => {
                        warn!("Chat completion exceeded {}s", self.llm.timeout_secs);
                        return Err(LlmError::Timeout(self.llm.timeout_secs).into());
                    }
                }
            }
            _ => resolved
                .pick_answer(rng)
                .map(str::to_string)
                .ok_or_else(|| ChatError::NoAnswer(resolved.tag.clone()))?,
        };

        Ok(ChatResponse::answered(text, &resolved, model_name))
    }
}
