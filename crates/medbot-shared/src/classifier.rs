//! Intent classifier: TF-IDF over character n-grams + multinomial Naive Bayes.
//!
//! The resolver only depends on the [`Classifier`] contract: one probability
//! per label, non-negative, summing to 1, indexed like `labels()`. The
//! built-in [`IntentModel`] is trained at startup from the knowledge base
//! patterns.
//!
//! Feature extraction works on word-bounded character n-grams: every
//! whitespace-separated word is padded with a space on both sides and the
//! n-grams are taken inside the padded word only. This makes the model
//! tolerant to typos ("diabetis" still shares most n-grams with "diabetes").

use crate::error::{MedbotError, Result};
use crate::knowledge::KnowledgeBase;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Display name reported in model metadata
pub const MODEL_NAME: &str = "Naive Bayes (MultinomialNB)";

/// Classifier contract consumed by the resolver
pub trait Classifier: Send + Sync {
    /// Intent tags, in the order `predict_proba` reports them
    fn labels(&self) -> &[String];

    /// Probability distribution over `labels()`
    fn predict_proba(&self, text: &str) -> Vec<f64>;

    /// Human-readable model name
    fn name(&self) -> &str {
        MODEL_NAME
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    pub min_n: usize,
    pub max_n: usize,
    pub max_features: usize,
    /// Additive (Lidstone) smoothing for Naive Bayes
    pub alpha: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            min_n: 2,
            max_n: 4,
            max_features: 12_000,
            alpha: 0.1,
        }
    }
}

/// Sparse row: (feature index, weight), sorted by index
pub type SparseVec = Vec<(usize, f64)>;

// ============================================================================
// Feature extraction
// ============================================================================

/// Word-bounded character n-grams of `text`, lowercased
pub fn char_wb_ngrams(text: &str, min_n: usize, max_n: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut grams = Vec::new();

    for word in lowered.split_whitespace() {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();

        for n in min_n..=max_n {
            if padded.len() <= n {
                // Short words contribute themselves once
                grams.push(padded.iter().collect());
                break;
            }
            for window in padded.windows(n) {
                grams.push(window.iter().collect());
            }
        }
    }

    grams
}

/// TF-IDF vectorizer over word-bounded character n-grams
#[derive(Debug, Clone)]
pub struct CharNgramVectorizer {
    min_n: usize,
    max_n: usize,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl CharNgramVectorizer {
    /// Learn vocabulary and IDF weights from a corpus
    pub fn fit(corpus: &[String], min_n: usize, max_n: usize, max_features: usize) -> Self {
        let mut term_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in corpus {
            let grams = char_wb_ngrams(doc, min_n, max_n);
            let mut seen: Vec<&String> = Vec::with_capacity(grams.len());
            for gram in &grams {
                *term_freq.entry(gram.clone()).or_insert(0) += 1;
                if !seen.contains(&gram) {
                    seen.push(gram);
                    *doc_freq.entry(gram.clone()).or_insert(0) += 1;
                }
            }
        }

        // Keep the most frequent n-grams, ties broken lexically
        let mut ranked: Vec<(String, usize)> = term_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut kept: Vec<String> = ranked.into_iter().map(|(gram, _)| gram).collect();
        kept.sort();

        let n_docs = corpus.len() as f64;
        let idf = kept
            .iter()
            .map(|gram| {
                let df = doc_freq.get(gram).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(idx, gram)| (gram, idx))
            .collect();

        Self {
            min_n,
            max_n,
            vocabulary,
            idf,
        }
    }

    pub fn num_features(&self) -> usize {
        self.idf.len()
    }

    /// Sublinear TF-IDF, L2-normalised
    pub fn transform(&self, text: &str) -> SparseVec {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for gram in char_wb_ngrams(text, self.min_n, self.max_n) {
            if let Some(&idx) = self.vocabulary.get(&gram) {
                *counts.entry(idx).or_insert(0) += 1;
            }
        }

        let mut row: SparseVec = counts
            .into_iter()
            .map(|(idx, count)| (idx, (1.0 + (count as f64).ln()) * self.idf[idx]))
            .collect();

        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in row.iter_mut() {
                *w /= norm;
            }
        }
        row
    }
}

// ============================================================================
// Multinomial Naive Bayes
// ============================================================================

#[derive(Debug, Clone)]
pub struct NaiveBayes {
    class_log_prior: Vec<f64>,
    /// [class][feature]
    feature_log_prob: Vec<Vec<f64>>,
}

impl NaiveBayes {
    pub fn fit(
        rows: &[SparseVec],
        targets: &[usize],
        n_classes: usize,
        n_features: usize,
        alpha: f64,
    ) -> Self {
        let mut class_count = vec![0usize; n_classes];
        let mut feature_count = vec![vec![0.0f64; n_features]; n_classes];

        for (row, &class) in rows.iter().zip(targets) {
            class_count[class] += 1;
            for &(idx, weight) in row {
                feature_count[class][idx] += weight;
            }
        }

        let total = targets.len().max(1) as f64;
        let class_log_prior = class_count
            .iter()
            .map(|&c| (c as f64 / total).ln())
            .collect();

        let feature_log_prob = feature_count
            .into_iter()
            .map(|counts| {
                let denom = (counts.iter().sum::<f64>() + alpha * n_features as f64).ln();
                counts.into_iter().map(|c| (c + alpha).ln() - denom).collect()
            })
            .collect();

        Self {
            class_log_prior,
            feature_log_prob,
        }
    }

    /// Posterior over classes, via a max-shifted softmax of joint log likelihoods
    pub fn predict_proba(&self, row: &SparseVec) -> Vec<f64> {
        let joint: Vec<f64> = self
            .class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, flp)| prior + row.iter().map(|&(idx, w)| w * flp[idx]).sum::<f64>())
            .collect();

        let max = joint.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = joint.iter().map(|j| (j - max).exp()).collect();
        let sum: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / sum).collect()
    }
}

// ============================================================================
// Intent model
// ============================================================================

/// Summary of a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub num_samples: usize,
    pub num_intents: usize,
    /// Accuracy on the training phrases themselves
    pub training_accuracy: f64,
}

/// Trained vectorizer + Naive Bayes, with its label ordering
#[derive(Debug, Clone)]
pub struct IntentModel {
    labels: Vec<String>,
    vectorizer: CharNgramVectorizer,
    nb: NaiveBayes,
}

impl IntentModel {
    /// Train on the patterns of every intent that has any.
    ///
    /// Labels are the pattern-bearing tags in sorted order. An intent
    /// without patterns (typically the fallback) is never predicted.
    pub fn train(kb: &KnowledgeBase, options: &TrainingOptions) -> Result<(Self, TrainingReport)> {
        let mut labels: Vec<String> = kb
            .intents()
            .iter()
            .filter(|i| !i.patterns.is_empty())
            .map(|i| i.tag.clone())
            .collect();
        labels.sort();

        if labels.is_empty() {
            return Err(MedbotError::EmptyCorpus);
        }

        let label_index: HashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, tag)| (tag.as_str(), i))
            .collect();

        let mut corpus = Vec::new();
        let mut targets = Vec::new();
        for intent in kb.intents() {
            let Some(&class) = label_index.get(intent.tag.as_str()) else {
                continue;
            };
            for pattern in &intent.patterns {
                corpus.push(pattern.to_lowercase());
                targets.push(class);
            }
        }

        let vectorizer =
            CharNgramVectorizer::fit(&corpus, options.min_n, options.max_n, options.max_features);
        let rows: Vec<SparseVec> = corpus.iter().map(|doc| vectorizer.transform(doc)).collect();
        let nb = NaiveBayes::fit(
            &rows,
            &targets,
            labels.len(),
            vectorizer.num_features(),
            options.alpha,
        );

        let model = Self {
            labels,
            vectorizer,
            nb,
        };

        let correct = rows
            .iter()
            .zip(&targets)
            .filter(|&(row, &class)| argmax(&model.nb.predict_proba(row)) == Some(class))
            .count();

        let report = TrainingReport {
            num_samples: corpus.len(),
            num_intents: model.labels.len(),
            training_accuracy: correct as f64 / corpus.len() as f64,
        };

        info!(
            "Trained intent model: {} samples, {} intents, {} features, training accuracy {:.3}",
            report.num_samples,
            report.num_intents,
            model.vectorizer.num_features(),
            report.training_accuracy
        );

        Ok((model, report))
    }
}

impl Classifier for IntentModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict_proba(&self, text: &str) -> Vec<f64> {
        let row = self.vectorizer.transform(text);
        debug!("Classifying {:?}: {} active features", text, row.len());
        self.nb.predict_proba(&row)
    }
}

/// Index of the largest entry, first one on ties
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some(b) if values[b] >= value => {}
            _ => best = Some(idx),
        }
    }
    best
}
