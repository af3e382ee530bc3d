//! External zero-shot classification capability.
//!
//! A [`ZeroShotClassifier`] scores a text against caller-supplied label
//! names. Scores lie in [0, 1] and are independent per label (multi-label
//! entailment), so they need not sum to 1. Responses are checked against
//! the requested labels before use; anything inconsistent is a
//! [`ZeroShotError`].

use std::collections::HashSet;

use newsdesk_core::Category;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ZeroShotError {
    #[error("zero-shot response is empty")]
    Empty,

    #[error("zero-shot response has {labels} labels but {scores} scores")]
    LengthMismatch { labels: usize, scores: usize },

    #[error("zero-shot response contains unrequested label {0:?}")]
    UnexpectedLabel(String),

    #[error("zero-shot response repeats label {0:?}")]
    DuplicateLabel(String),

    #[error("zero-shot score for {label:?} is not finite: {score}")]
    NonFiniteScore { label: String, score: f64 },

    #[error("zero-shot score for {label:?} is outside [0, 1]: {score}")]
    ScoreOutOfRange { label: String, score: f64 },

    #[cfg(feature = "onnx")]
    #[error("zero-shot session lock poisoned")]
    SessionPoisoned,
}

/// Labels ordered best-first with parallel scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ZeroShotScores {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

impl ZeroShotScores {
    /// Build from `(label, score)` pairs, sorting best-first.
    pub fn from_pairs(mut pairs: Vec<(String, f64)>) -> Self {
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        let (labels, scores) = pairs.into_iter().unzip();
        Self { labels, scores }
    }

    /// Map the response back onto the requested categories, best-first.
    ///
    /// Label matching is exact on the category name. Scores are kept as
    /// returned; they are not renormalized.
    pub fn validate(&self, requested: &[Category]) -> Result<Vec<(Category, f64)>, ZeroShotError> {
        if self.labels.len() != self.scores.len() {
            return Err(ZeroShotError::LengthMismatch {
                labels: self.labels.len(),
                scores: self.scores.len(),
            });
        }
        if self.labels.is_empty() {
            return Err(ZeroShotError::Empty);
        }

        let mut seen = HashSet::new();
        let mut ranked = Vec::with_capacity(self.labels.len());
        for (label, &score) in self.labels.iter().zip(&self.scores) {
            let category = requested
                .iter()
                .copied()
                .find(|c| c.as_str() == label)
                .ok_or_else(|| ZeroShotError::UnexpectedLabel(label.clone()))?;
            if !seen.insert(category) {
                return Err(ZeroShotError::DuplicateLabel(label.clone()));
            }
            if !score.is_finite() {
                return Err(ZeroShotError::NonFiniteScore {
                    label: label.clone(),
                    score,
                });
            }
            if !(0.0..=1.0).contains(&score) {
                return Err(ZeroShotError::ScoreOutOfRange {
                    label: label.clone(),
                    score,
                });
            }
            ranked.push((category, score));
        }

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked)
    }
}

/// A blocking zero-shot model. Implementations must be shareable across
/// threads; calls may run concurrently.
pub trait ZeroShotClassifier: Send + Sync {
    /// Short identifier for logs and model info.
    fn name(&self) -> &str;

    fn classify(&self, text: &str, labels: &[&str]) -> anyhow::Result<ZeroShotScores>;
}
