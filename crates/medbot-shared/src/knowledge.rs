//! Intents and the knowledge base of canned answers.
//!
//! The knowledge base is loaded once at startup from JSON:
//!
//! ```json
//! {"fallback": "fallback", "intents": [{"tag": "...", "patterns": [], "responses": []}]}
//! ```
//!
//! After a successful load the fallback intent is guaranteed to exist and to
//! have at least one answer.

use crate::error::{MedbotError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Knowledge base shipped with the daemon
pub const BUILTIN_KNOWLEDGE: &str = include_str!("../../../data/intents.json");

/// One topic a user message can be classified into
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intent {
    pub tag: String,
    /// Example phrasings, only used to train the classifier
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Candidate answers, in authoring order
    #[serde(default)]
    pub responses: Vec<String>,
}

/// On-disk shape of the knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeFile {
    pub fallback: String,
    pub intents: Vec<Intent>,
}

/// Immutable tag -> answers mapping with a validated fallback intent
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    intents: Vec<Intent>,
    answers: HashMap<String, usize>,
    fallback: String,
}

impl KnowledgeBase {
    /// Build from parsed intents, validating the fallback invariant
    pub fn new(intents: Vec<Intent>, fallback: impl Into<String>) -> Result<Self> {
        let fallback = fallback.into();
        let mut answers = HashMap::with_capacity(intents.len());

        for (idx, intent) in intents.iter().enumerate() {
            if intent.tag.trim().is_empty() {
                return Err(MedbotError::Configuration(format!(
                    "intent #{} has an empty tag",
                    idx
                )));
            }
            if answers.insert(intent.tag.clone(), idx).is_some() {
                return Err(MedbotError::Configuration(format!(
                    "duplicate intent tag '{}'",
                    intent.tag
                )));
            }
        }

        match answers.get(&fallback) {
            None => {
                return Err(MedbotError::Configuration(format!(
                    "fallback intent '{}' is missing from the knowledge base",
                    fallback
                )))
            }
            Some(&idx) if intents[idx].responses.is_empty() => {
                return Err(MedbotError::Configuration(format!(
                    "fallback intent '{}' has no responses",
                    fallback
                )))
            }
            Some(_) => {}
        }

        Ok(Self {
            intents,
            answers,
            fallback,
        })
    }

    /// Parse a knowledge base from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        let file: KnowledgeFile = serde_json::from_str(json)?;
        Self::new(file.intents, file.fallback)
    }

    /// Load a knowledge base from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let kb = Self::from_json(&content)?;
        info!(
            "Loaded knowledge base from {} ({} intents)",
            path.display(),
            kb.len()
        );
        Ok(kb)
    }

    /// The knowledge base compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_KNOWLEDGE)
    }

    pub fn fallback_tag(&self) -> &str {
        &self.fallback
    }

    /// Answers of the fallback intent (never empty)
    pub fn fallback_answers(&self) -> &[String] {
        self.get(&self.fallback).unwrap_or(&[])
    }

    /// Answers for a tag, if the tag is known
    pub fn get(&self, tag: &str) -> Option<&[String]> {
        self.answers
            .get(tag)
            .map(|&idx| self.intents[idx].responses.as_slice())
    }

    /// Answers for a tag. Unknown tags and intents without responses get the
    /// fallback intent's answers, so the result is never empty.
    pub fn answers_for(&self, tag: &str) -> &[String] {
        match self.get(tag) {
            Some(answers) if !answers.is_empty() => answers,
            _ => self.fallback_answers(),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.answers.contains_key(tag)
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}
