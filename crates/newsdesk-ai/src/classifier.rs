//! Multinomial naive Bayes over TF-IDF features.
//!
//! Training accumulates per-category feature mass, smooths it with
//! `alpha`, and stores log-probabilities; prediction sums the joint
//! log-likelihood per category and normalizes with log-sum-exp.

use newsdesk_core::Category;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ModelError;
use crate::vectorizer::FeatureVector;

/// Probability distribution over a model's categories, positionally
/// aligned to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    categories: Vec<Category>,
    probabilities: Vec<f64>,
}

impl Distribution {
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Most probable category; exact ties go to the earlier category.
    pub fn best(&self) -> (Category, f64) {
        let mut best = 0;
        for (i, &p) in self.probabilities.iter().enumerate() {
            if p > self.probabilities[best] {
                best = i;
            }
        }
        (self.categories[best], self.probabilities[best])
    }

    pub fn confidence(&self) -> f64 {
        self.best().1
    }

    /// Every category with its probability, highest first. The sort is
    /// stable, so ties keep definition order.
    pub fn ranked(&self) -> Vec<(Category, f64)> {
        let mut ranked: Vec<(Category, f64)> = self
            .categories
            .iter()
            .copied()
            .zip(self.probabilities.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNb {
    alpha: f64,
    /// Trained categories in definition order; empty until trained.
    categories: Vec<Category>,
    class_log_prior: Vec<f64>,
    /// `[category][feature]` smoothed log-probabilities.
    feature_log_prob: Vec<Vec<f64>>,
    n_features: usize,
}

impl Default for MultinomialNb {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl MultinomialNb {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            categories: Vec::new(),
            class_log_prior: Vec::new(),
            feature_log_prob: Vec::new(),
            n_features: 0,
        }
    }

    pub fn is_trained(&self) -> bool {
        !self.categories.is_empty()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Fit priors and term weights, replacing any previous training.
    pub fn train(
        &mut self,
        features: &[FeatureVector],
        labels: &[Category],
    ) -> Result<(), ModelError> {
        if !(self.alpha > 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "alpha must be positive, got {}",
                self.alpha
            )));
        }
        if features.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let n_features = features[0].len();
        if let Some(bad) = features.iter().find(|f| f.len() != n_features) {
            return Err(ModelError::DimensionMismatch {
                expected: n_features,
                got: bad.len(),
            });
        }

        let mut categories: Vec<Category> = labels.to_vec();
        categories.sort();
        categories.dedup();

        let mut class_count = vec![0usize; categories.len()];
        let mut feature_mass = vec![vec![0.0f64; n_features]; categories.len()];
        for (x, label) in features.iter().zip(labels) {
            let c = categories.binary_search(label).unwrap_or_default();
            class_count[c] += 1;
            for (acc, &w) in feature_mass[c].iter_mut().zip(x.as_slice()) {
                *acc += w;
            }
        }

        let n = features.len() as f64;
        let class_log_prior = class_count.iter().map(|&k| (k as f64 / n).ln()).collect();

        let feature_log_prob = feature_mass
            .into_iter()
            .map(|row| {
                let total: f64 = row.iter().sum::<f64>() + self.alpha * n_features as f64;
                row.into_iter()
                    .map(|m| ((m + self.alpha) / total).ln())
                    .collect()
            })
            .collect();

        info!(
            samples = features.len(),
            categories = categories.len(),
            features = n_features,
            alpha = self.alpha,
            "trained naive bayes"
        );

        self.categories = categories;
        self.class_log_prior = class_log_prior;
        self.feature_log_prob = feature_log_prob;
        self.n_features = n_features;
        Ok(())
    }

    /// Posterior distribution over the trained categories.
    pub fn predict(&self, x: &FeatureVector) -> Result<Distribution, ModelError> {
        if !self.is_trained() {
            return Err(ModelError::ClassifierNotTrained);
        }
        if x.len() != self.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features,
                got: x.len(),
            });
        }

        let joint: Vec<f64> = self
            .class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, row)| {
                prior
                    + row
                        .iter()
                        .zip(x.as_slice())
                        .map(|(lp, w)| lp * w)
                        .sum::<f64>()
            })
            .collect();

        let log_norm = log_sum_exp(&joint);
        let probabilities = joint.iter().map(|j| (j - log_norm).exp()).collect();

        Ok(Distribution {
            categories: self.categories.clone(),
            probabilities,
        })
    }

    pub(crate) fn check(&self) -> Result<(), ModelError> {
        if !self.is_trained() {
            return Err(ModelError::ClassifierNotTrained);
        }
        let k = self.categories.len();
        if self.categories.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ModelError::CorruptArtifact(
                "classifier categories are not in definition order".into(),
            ));
        }
        if self.class_log_prior.len() != k
            || self.feature_log_prob.len() != k
            || self
                .feature_log_prob
                .iter()
                .any(|row| row.len() != self.n_features)
        {
            return Err(ModelError::CorruptArtifact(
                "classifier parameter shapes disagree".into(),
            ));
        }
        Ok(())
    }
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}
