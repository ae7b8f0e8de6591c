//! Shared types and logic for MedBot components.
//!
//! Knowledge base, intent classifier, intent resolver and the chat API wire
//! types. Everything here is synchronous and free of I/O except knowledge
//! base loading.

pub mod api;
pub mod classifier;
pub mod error;
pub mod knowledge;
pub mod resolver;

pub use api::{ChatRequest, ChatResponse, ChatTurn, ModelMeta, Role};
pub use classifier::{Classifier, IntentModel, TrainingOptions, TrainingReport};
pub use error::{MedbotError, Result};
pub use knowledge::{Intent, KnowledgeBase};
pub use resolver::{resolve, GatingPolicy, ResolvedIntent};
