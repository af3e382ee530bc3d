//! Inference orchestration over the statistical and zero-shot backends.
//!
//! The current [`ModelArtifact`] sits in an `RwLock<Option<Arc<_>>>` slot.
//! A prediction clones the `Arc` and releases the lock before doing any
//! work, so retraining can swap in a new artifact while in-flight calls
//! finish on the old one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::{Duration, Instant};

use newsdesk_core::{Category, LabeledDocument, normalize};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifact::ModelArtifact;
use crate::error::{ApiError, ModelError};
use crate::train::{Trainer, TrainerConfig, TrainingMetrics};
use crate::zero_shot::ZeroShotClassifier;

/// Backend requested by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Statistical,
    External,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statistical => "statistical",
            Self::External => "external",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "statistical" | "sklearn" => Ok(Self::Statistical),
            "external" | "transformer" => Ok(Self::External),
            _ => Err(ApiError::UnknownBackend(s.to_string())),
        }
    }
}

/// A backend that is actually available for one call.
#[derive(Clone)]
pub enum Capability {
    Statistical(Arc<ModelArtifact>),
    ExternalZeroShot(Arc<dyn ZeroShotClassifier>),
}

impl Capability {
    pub fn backend(&self) -> Backend {
        match self {
            Self::Statistical(_) => Backend::Statistical,
            Self::ExternalZeroShot(_) => Backend::External,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub category: Category,
    pub confidence: f64,
    /// Best first. Sums to 1 for the statistical backend; independent
    /// per-label scores for the zero-shot backend.
    pub scores: Vec<(Category, f64)>,
    pub backend: Backend,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Which backends are loaded and what the statistical model covers.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub statistical_loaded: bool,
    pub zero_shot_loaded: bool,
    pub zero_shot_name: Option<String>,
    pub categories: Vec<Category>,
    pub total_categories: usize,
    pub vectorizer_features: usize,
}

pub struct ClassifierService {
    model_dir: PathBuf,
    artifact: RwLock<Option<Arc<ModelArtifact>>>,
    zero_shot: Option<Arc<dyn ZeroShotClassifier>>,
    trainer: TrainerConfig,
    training: Mutex<()>,
}

impl ClassifierService {
    /// A service with no model loaded yet.
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            artifact: RwLock::new(None),
            zero_shot: None,
            trainer: TrainerConfig::default(),
            training: Mutex::new(()),
        }
    }

    /// Load the artifact persisted in `model_dir`.
    pub fn load(model_dir: impl Into<PathBuf>) -> Result<Self, ModelError> {
        let service = Self::new(model_dir);
        let artifact = ModelArtifact::load(&service.model_dir)?;
        service.swap(artifact);
        Ok(service)
    }

    pub fn with_zero_shot(mut self, classifier: Arc<dyn ZeroShotClassifier>) -> Self {
        info!(backend = classifier.name(), "zero-shot backend attached");
        self.zero_shot = Some(classifier);
        self
    }

    pub fn with_trainer_config(mut self, config: TrainerConfig) -> Self {
        self.trainer = config;
        self
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// The current artifact, if any.
    pub fn artifact(&self) -> Option<Arc<ModelArtifact>> {
        match self.artifact.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Install a new artifact, returning the one it replaced.
    pub fn swap(&self, artifact: ModelArtifact) -> Option<Arc<ModelArtifact>> {
        let new = Arc::new(artifact);
        let mut slot = match self.artifact.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.replace(new)
    }

    /// Categories predictions are drawn from: the artifact's, or every
    /// category when no artifact is loaded.
    pub fn categories(&self) -> Vec<Category> {
        self.artifact()
            .map(|a| a.categories().to_vec())
            .unwrap_or_else(|| Category::ALL.to_vec())
    }

    pub fn info(&self) -> ModelInfo {
        let artifact = self.artifact();
        let categories = self.categories();
        ModelInfo {
            statistical_loaded: artifact.is_some(),
            zero_shot_loaded: self.zero_shot.is_some(),
            zero_shot_name: self.zero_shot.as_ref().map(|z| z.name().to_string()),
            total_categories: categories.len(),
            categories,
            vectorizer_features: artifact.map_or(0, |a| a.vocabulary_size()),
        }
    }

    /// Ordered capabilities to try for `backend`.
    pub fn fallback_chain(&self, backend: Backend) -> Vec<Capability> {
        let mut chain = Vec::with_capacity(2);
        if backend == Backend::External {
            match &self.zero_shot {
                Some(zs) => chain.push(Capability::ExternalZeroShot(Arc::clone(zs))),
                None => warn!("zero-shot backend requested but not loaded; using statistical"),
            }
        }
        if let Some(artifact) = self.artifact() {
            chain.push(Capability::Statistical(artifact));
        }
        chain
    }

    /// Classify one text. External failures fall through to the
    /// statistical backend; only a missing or failing statistical model is
    /// an error.
    pub fn predict(&self, text: &str, backend: Backend) -> Result<Prediction, ModelError> {
        let start = Instant::now();
        let normalized = normalize(text);
        let categories = self.categories();

        let mut last_err = ModelError::ClassifierNotTrained;
        for capability in self.fallback_chain(backend) {
            let outcome = match &capability {
                Capability::ExternalZeroShot(zs) => match external(zs.as_ref(), &normalized, &categories) {
                    Ok(scores) => Ok(scores),
                    Err(e) => {
                        warn!(backend = zs.name(), error = %e, "zero-shot failed; falling back");
                        continue;
                    }
                },
                Capability::Statistical(artifact) => artifact
                    .predict_normalized(&normalized)
                    .map(|d| d.ranked()),
            };

            match outcome {
                Ok(scores) => {
                    let (category, confidence) = scores[0];
                    let prediction = Prediction {
                        category,
                        confidence,
                        scores,
                        backend: capability.backend(),
                        elapsed: start.elapsed(),
                    };
                    debug!(
                        category = %prediction.category,
                        confidence = prediction.confidence,
                        backend = %prediction.backend,
                        elapsed_us = prediction.elapsed.as_micros() as u64,
                        "predicted"
                    );
                    return Ok(prediction);
                }
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    /// Train on `docs`, persist the metrics and then the artifact, then swap
    /// the new artifact in. Only one retrain runs at a time.
    ///
    /// `model.json` is written last: if any write fails, the file on disk
    /// still matches the artifact being served.
    pub fn retrain(&self, docs: &[LabeledDocument]) -> Result<TrainingMetrics, ModelError> {
        let _guard = match self.training.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(ModelError::TrainingInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let outcome = Trainer::new(self.trainer.clone())?.train(docs)?;
        outcome.metrics.save(&self.model_dir)?;
        outcome.artifact.save(&self.model_dir)?;
        self.swap(outcome.artifact);

        info!(
            model_dir = %self.model_dir.display(),
            samples = outcome.metrics.total_samples,
            accuracy = outcome.metrics.accuracy,
            "retrained and swapped model"
        );
        Ok(outcome.metrics)
    }
}

/// Run the zero-shot backend and validate its response.
fn external(
    zs: &dyn ZeroShotClassifier,
    text: &str,
    categories: &[Category],
) -> anyhow::Result<Vec<(Category, f64)>> {
    let labels: Vec<&str> = categories.iter().map(Category::as_str).collect();
    let response = zs.classify(text, &labels)?;
    Ok(response.validate(categories)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_corpus;
    use crate::zero_shot::ZeroShotScores;

    struct Failing;

    impl ZeroShotClassifier for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn classify(&self, _text: &str, _labels: &[&str]) -> anyhow::Result<ZeroShotScores> {
            anyhow::bail!("model unavailable")
        }
    }

    /// Scores the first label highest, or returns a fixed response.
    struct Scripted(Option<ZeroShotScores>);

    impl ZeroShotClassifier for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn classify(&self, _text: &str, labels: &[&str]) -> anyhow::Result<ZeroShotScores> {
            if let Some(fixed) = &self.0 {
                return Ok(fixed.clone());
            }
            let pairs = labels
                .iter()
                .enumerate()
                .map(|(i, l)| (l.to_string(), 0.9 / (i + 1) as f64))
                .collect();
            Ok(ZeroShotScores::from_pairs(pairs))
        }
    }

    fn trained_service() -> (tempfile::TempDir, ClassifierService) {
        let dir = tempfile::tempdir().unwrap();
        let service = ClassifierService::new(dir.path());
        service.retrain(&sample_corpus()).unwrap();
        (dir, service)
    }

    #[test]
    fn backend_names() {
        assert_eq!("sklearn".parse::<Backend>().unwrap(), Backend::Statistical);
        assert_eq!("Statistical".parse::<Backend>().unwrap(), Backend::Statistical);
        assert_eq!("transformer".parse::<Backend>().unwrap(), Backend::External);
        assert_eq!("external".parse::<Backend>().unwrap(), Backend::External);
        assert!(matches!(
            "gpt".parse::<Backend>(),
            Err(ApiError::UnknownBackend(_))
        ));
    }

    #[test]
    fn untrained_service_errors() {
        let service = ClassifierService::new("/nonexistent");
        for backend in [Backend::Statistical, Backend::External] {
            assert!(matches!(
                service.predict("anything", backend),
                Err(ModelError::ClassifierNotTrained)
            ));
        }
    }

    #[test]
    fn statistical_prediction() {
        let (_dir, service) = trained_service();
        let p = service
            .predict("The team won the championship game in overtime.", Backend::Statistical)
            .unwrap();
        assert_eq!(p.category, Category::Sports);
        assert_eq!(p.backend, Backend::Statistical);
        assert!(p.scores[0].1 > p.scores[1].1);
        let sum: f64 = p.scores.iter().map(|(_, s)| s).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn failing_external_falls_back() {
        let (_dir, service) = trained_service();
        let service = service.with_zero_shot(Arc::new(Failing));
        let p = service
            .predict("Senate approves the new budget", Backend::External)
            .unwrap();
        assert_eq!(p.backend, Backend::Statistical);
    }

    #[test]
    fn external_without_zero_shot_uses_statistical() {
        let (_dir, service) = trained_service();
        let p = service.predict("stock market", Backend::External).unwrap();
        assert_eq!(p.backend, Backend::Statistical);
    }

    #[test]
    fn external_scores_are_kept_as_returned() {
        let (_dir, service) = trained_service();
        let service = service.with_zero_shot(Arc::new(Scripted(None)));
        let p = service.predict("anything at all", Backend::External).unwrap();
        assert_eq!(p.backend, Backend::External);
        assert_eq!(p.category, Category::Sports);
        assert_eq!(p.confidence, 0.9);
        assert_eq!(p.scores.len(), 7);
    }

    #[test]
    fn malformed_external_response_falls_back() {
        let (_dir, service) = trained_service();
        let bogus = ZeroShotScores {
            labels: vec!["Weather".into()],
            scores: vec![0.99],
        };
        let service = service.with_zero_shot(Arc::new(Scripted(Some(bogus))));
        let p = service.predict("rain expected", Backend::External).unwrap();
        assert_eq!(p.backend, Backend::Statistical);
    }

    #[test]
    fn out_of_range_external_scores_fall_back() {
        let (_dir, service) = trained_service();
        let bogus = ZeroShotScores {
            labels: vec!["Sports".into(), "Politics".into()],
            scores: vec![3.5, -0.25],
        };
        let service = service.with_zero_shot(Arc::new(Scripted(Some(bogus))));
        let p = service
            .predict("The team won the championship game", Backend::External)
            .unwrap();
        assert_eq!(p.backend, Backend::Statistical);
        assert!((0.0..=1.0).contains(&p.confidence));
        assert!(p.scores.iter().all(|(_, s)| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn failed_metrics_write_leaves_model_untouched() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes the rename onto metrics.json fail.
        let blocker = dir.path().join(crate::artifact::METRICS_FILE);
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let service = ClassifierService::new(dir.path());
        assert!(matches!(
            service.retrain(&sample_corpus()),
            Err(ModelError::Io(_))
        ));
        assert!(!dir.path().join(crate::artifact::MODEL_FILE).exists());
        assert!(service.artifact().is_none());
    }

    #[test]
    fn retrain_persists_and_reloads() {
        let (dir, service) = trained_service();
        assert!(dir.path().join(crate::artifact::MODEL_FILE).exists());
        assert!(dir.path().join(crate::artifact::METRICS_FILE).exists());

        let reloaded = ClassifierService::load(dir.path()).unwrap();
        let a = service.predict("new smartphone processors", Backend::Statistical).unwrap();
        let b = reloaded.predict("new smartphone processors", Backend::Statistical).unwrap();
        assert_eq!(a.scores, b.scores);
    }

    #[test]
    fn in_flight_artifact_survives_swap() {
        let (_dir, service) = trained_service();
        let held = service.artifact().unwrap();
        let old = service.swap((*held).clone()).unwrap();
        assert!(Arc::ptr_eq(&held, &old));
        assert!(held.predict("election vote").is_ok());
    }

    #[test]
    fn concurrent_retrain_is_rejected() {
        let (_dir, service) = trained_service();
        let _busy = service.training.lock().unwrap();
        assert!(matches!(
            service.retrain(&sample_corpus()),
            Err(ModelError::TrainingInProgress)
        ));
    }

    #[test]
    fn info_reports_loaded_backends() {
        let service = ClassifierService::new("/nonexistent");
        let info = service.info();
        assert!(!info.statistical_loaded);
        assert_eq!(info.total_categories, 12);

        let (_dir, service) = trained_service();
        let info = service.with_zero_shot(Arc::new(Failing)).info();
        assert!(info.statistical_loaded);
        assert!(info.zero_shot_loaded);
        assert_eq!(info.total_categories, 7);
        assert!(info.vectorizer_features > 0);
    }
}
