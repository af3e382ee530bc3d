//! Training pipeline: normalize, stratified hold-out evaluation, then the
//! production fit on every supplied document.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use newsdesk_core::{Category, LabeledDocument, normalize};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifact::{METRICS_FILE, ModelArtifact, write_json_atomic};
use crate::classifier::MultinomialNb;
use crate::error::ModelError;
use crate::vectorizer::{TfidfVectorizer, VectorizerConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainerConfig {
    pub vectorizer: VectorizerConfig,
    /// Additive smoothing for naive Bayes.
    pub alpha: f64,
    /// Fraction of each category held out for evaluation.
    pub test_ratio: f64,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerConfig::default(),
            alpha: 1.0,
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

impl TrainerConfig {
    pub fn validate(self) -> Result<Self, ModelError> {
        self.vectorizer.validate()?;
        if !(self.alpha > 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "alpha must be positive, got {}",
                self.alpha
            )));
        }
        if !(0.0..1.0).contains(&self.test_ratio) {
            return Err(ModelError::InvalidConfig(format!(
                "test_ratio must be in [0, 1), got {}",
                self.test_ratio
            )));
        }
        Ok(self)
    }
}

/// Held-out scores for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: Category,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub trained_at: DateTime<Utc>,
    pub total_samples: usize,
    pub train_size: usize,
    pub test_size: usize,
    /// `None` when the corpus was too small to hold anything out.
    pub accuracy: Option<f64>,
    pub report: Vec<CategoryReport>,
    pub vocabulary_size: usize,
    pub categories: Vec<Category>,
}

impl TrainingMetrics {
    pub fn save(&self, dir: &Path) -> Result<(), ModelError> {
        write_json_atomic(&dir.join(METRICS_FILE), self)
    }

    pub fn load(dir: &Path) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(dir.join(METRICS_FILE))?;
        Ok(serde_json::from_str(&json)?)
    }
}

pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub metrics: TrainingMetrics,
}

pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Result<Self, ModelError> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Evaluate on a stratified hold-out, then fit the production model on
    /// all of `docs`.
    pub fn train(&self, docs: &[LabeledDocument]) -> Result<TrainingOutcome, ModelError> {
        if docs.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let texts: Vec<String> = docs.iter().map(|d| normalize(&d.text)).collect();
        let labels: Vec<Category> = docs.iter().map(|d| d.category).collect();
        info!(samples = docs.len(), "normalized training corpus");

        let (train_idx, test_idx) =
            stratified_split(&labels, self.config.test_ratio, self.config.seed);

        let (accuracy, report) = if test_idx.is_empty() {
            warn!(samples = docs.len(), "corpus too small for a hold-out set; skipping evaluation");
            (None, Vec::new())
        } else {
            let pick = |idx: &[usize]| -> (Vec<&str>, Vec<Category>) {
                idx.iter().map(|&i| (texts[i].as_str(), labels[i])).unzip()
            };
            let (train_texts, train_labels) = pick(&train_idx);
            let (test_texts, test_labels) = pick(&test_idx);

            let held_out = self.fit(&train_texts, &train_labels)?;
            let predicted = test_texts
                .iter()
                .map(|t| held_out.predict_normalized(t).map(|d| d.best().0))
                .collect::<Result<Vec<_>, _>>()?;

            let correct = predicted
                .iter()
                .zip(&test_labels)
                .filter(|(p, a)| p == a)
                .count();
            let accuracy = correct as f64 / test_labels.len() as f64;
            info!(
                train = train_idx.len(),
                test = test_idx.len(),
                accuracy,
                "held-out evaluation"
            );
            (
                Some(accuracy),
                classification_report(held_out.categories(), &test_labels, &predicted),
            )
        };

        let artifact = self.fit(&texts, &labels)?;
        let metrics = TrainingMetrics {
            trained_at: artifact.metadata.trained_at,
            total_samples: docs.len(),
            train_size: train_idx.len(),
            test_size: test_idx.len(),
            accuracy,
            report,
            vocabulary_size: artifact.vocabulary_size(),
            categories: artifact.categories().to_vec(),
        };
        info!(
            samples = docs.len(),
            features = metrics.vocabulary_size,
            categories = metrics.categories.len(),
            "trained production model"
        );

        Ok(TrainingOutcome { artifact, metrics })
    }

    fn fit<S: AsRef<str>>(
        &self,
        texts: &[S],
        labels: &[Category],
    ) -> Result<ModelArtifact, ModelError> {
        let mut vectorizer = TfidfVectorizer::new(self.config.vectorizer.clone());
        let features = vectorizer.fit_transform(texts)?;
        let mut classifier = MultinomialNb::new(self.config.alpha);
        classifier.train(&features, labels)?;
        ModelArtifact::new(vectorizer, classifier, texts.len())
    }
}

/// Split indices per category so each keeps its share in both halves.
///
/// Every category keeps at least one training row; with fewer than two
/// rows nothing of it is held out.
pub fn stratified_split(labels: &[Category], test_ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut groups: BTreeMap<Category, Vec<usize>> = BTreeMap::new();
    for (i, &c) in labels.iter().enumerate() {
        groups.entry(c).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (_, mut idx) in groups {
        idx.shuffle(&mut rng);
        let n_test = ((idx.len() as f64 * test_ratio).round() as usize).min(idx.len() - 1);
        test.extend_from_slice(&idx[..n_test]);
        train.extend_from_slice(&idx[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Precision, recall, F1 and support per category. Undefined ratios are 0.
pub fn classification_report(
    categories: &[Category],
    actual: &[Category],
    predicted: &[Category],
) -> Vec<CategoryReport> {
    categories
        .iter()
        .map(|&c| {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fn_ = 0usize;
            for (&a, &p) in actual.iter().zip(predicted) {
                match (a == c, p == c) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            CategoryReport {
                category: c,
                precision,
                recall,
                f1,
                support: tp + fn_,
            }
        })
        .collect()
}
