//! Intent resolver: probability vector -> actionable result.
//!
//! Two confidence-gating policies exist:
//! - [`GatingPolicy::GatedFallback`]: a low-confidence prediction is replaced
//!   by the fallback intent before the answer lookup (direct replies).
//! - [`GatingPolicy::ContextOnly`]: the classifier's tag is always kept, but
//!   it is only offered as a hint to the generator when confident enough.

use crate::classifier::argmax;
use crate::error::{MedbotError, Result};
use crate::knowledge::KnowledgeBase;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How many ranked intents a result carries
pub const TOP_K: usize = 3;

/// How many knowledge-base answers are passed to the generator as hints
pub const MAX_HINT_ANSWERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingPolicy {
    GatedFallback,
    ContextOnly,
}

/// Per-request classification result
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIntent {
    /// Tag used for the answer lookup (may be the fallback)
    pub tag: String,
    /// Classifier's own top tag, before any gating
    pub predicted_tag: String,
    /// Top probability as a percentage, one decimal
    pub confidence: f64,
    /// Ranked (tag, percentage) pairs, at most [`TOP_K`]
    pub top3: Vec<(String, f64)>,
    /// Knowledge-base answers for `tag`
    pub answers: Vec<String>,
    /// Whether the intent should be offered as generator context
    pub hint_attached: bool,
}

impl ResolvedIntent {
    /// Up to [`MAX_HINT_ANSWERS`] answers, in authoring order
    pub fn hint_answers(&self) -> &[String] {
        let n = self.answers.len().min(MAX_HINT_ANSWERS);
        &self.answers[..n]
    }

    /// One answer chosen uniformly at random
    pub fn pick_answer<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        if self.answers.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.answers.len());
        Some(self.answers[idx].as_str())
    }
}

/// Lowercase and trim a message before classification
pub fn normalize_message(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Convert a probability to a percentage with one decimal
pub fn to_percent(probability: f64) -> f64 {
    round1(probability * 100.0)
}

/// Highest `k` entries as (index, probability), descending, ties by index
pub fn top_k(probabilities: &[f64], k: usize) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = probabilities.iter().copied().enumerate().collect();
    // sort_by is stable, so equal probabilities keep index order
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}

/// Resolve a classifier output into a [`ResolvedIntent`]
pub fn resolve(
    text: &str,
    probabilities: &[f64],
    labels: &[String],
    kb: &KnowledgeBase,
    policy: GatingPolicy,
    confidence_threshold: f64,
) -> Result<ResolvedIntent> {
    if text.trim().is_empty() {
        return Err(MedbotError::EmptyInput);
    }
    if probabilities.len() != labels.len() {
        return Err(MedbotError::InvalidInput(format!(
            "probability vector has {} entries but there are {} labels",
            probabilities.len(),
            labels.len()
        )));
    }
    if !(0.0..=1.0).contains(&confidence_threshold) {
        return Err(MedbotError::Configuration(format!(
            "confidence threshold {} is outside [0, 1]",
            confidence_threshold
        )));
    }
    if !kb.contains(kb.fallback_tag()) {
        return Err(MedbotError::Configuration(format!(
            "fallback intent '{}' is missing from the knowledge base",
            kb.fallback_tag()
        )));
    }

    let top_idx = argmax(probabilities)
        .ok_or_else(|| MedbotError::InvalidInput("no labels to classify into".to_string()))?;
    let predicted_tag = labels[top_idx].clone();
    let top_confidence = probabilities[top_idx];
    let confident = top_confidence >= confidence_threshold;

    let top3 = top_k(probabilities, TOP_K)
        .into_iter()
        .map(|(idx, p)| (labels[idx].clone(), to_percent(p)))
        .collect();

    let (tag, hint_attached) = match policy {
        GatingPolicy::GatedFallback if !confident => (kb.fallback_tag().to_string(), false),
        GatingPolicy::GatedFallback => (predicted_tag.clone(), true),
        GatingPolicy::ContextOnly => (predicted_tag.clone(), confident),
    };

    let answers = kb.answers_for(&tag).to_vec();

    Ok(ResolvedIntent {
        tag,
        predicted_tag,
        confidence: to_percent(top_confidence),
        top3,
        answers,
        hint_attached,
    })
}
