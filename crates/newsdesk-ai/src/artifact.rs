//! Model artifact: fitted vectorizer + trained classifier + metadata,
//! persisted as one JSON bundle.
//!
//! A model directory holds `model.json` and, after training, `metrics.json`.
//! Both are written to a temp file in the same directory and renamed into
//! place, so a reader never observes a half-written file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use newsdesk_core::{Category, normalize};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::{Distribution, MultinomialNb};
use crate::error::ModelError;
use crate::vectorizer::{FeatureVector, TfidfVectorizer};

pub const MODEL_FILE: &str = "model.json";
pub const METRICS_FILE: &str = "metrics.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub samples: usize,
    /// Categories seen in training, in definition order.
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    vectorizer: TfidfVectorizer,
    classifier: MultinomialNb,
}

impl ModelArtifact {
    /// Bundle a fitted vectorizer with a classifier trained on its output.
    pub fn new(
        vectorizer: TfidfVectorizer,
        classifier: MultinomialNb,
        samples: usize,
    ) -> Result<Self, ModelError> {
        let artifact = Self {
            metadata: ArtifactMetadata {
                format_version: FORMAT_VERSION,
                trained_at: Utc::now(),
                samples,
                categories: classifier.categories().to_vec(),
            },
            vectorizer,
            classifier,
        };
        artifact.check()?;
        Ok(artifact)
    }

    pub fn categories(&self) -> &[Category] {
        &self.metadata.categories
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.dim()
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &MultinomialNb {
        &self.classifier
    }

    pub fn features(&self, normalized: &str) -> Result<FeatureVector, ModelError> {
        self.vectorizer.transform(normalized)
    }

    /// Distribution for already-normalized text.
    pub fn predict_normalized(&self, normalized: &str) -> Result<Distribution, ModelError> {
        let x = self.vectorizer.transform(normalized)?;
        self.classifier.predict(&x)
    }

    /// Normalize raw text, then predict.
    pub fn predict(&self, text: &str) -> Result<Distribution, ModelError> {
        self.predict_normalized(&normalize(text))
    }

    /// Write `model.json` into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ModelError> {
        let path = dir.join(MODEL_FILE);
        write_json_atomic(&path, self)?;
        info!(
            path = %path.display(),
            features = self.vocabulary_size(),
            categories = self.metadata.categories.len(),
            "saved model artifact"
        );
        Ok(path)
    }

    /// Load and validate `model.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ModelError> {
        let path = dir.join(MODEL_FILE);
        if !path.exists() {
            return Err(ModelError::ArtifactNotFound(path));
        }
        let json = std::fs::read_to_string(&path)?;
        let artifact: ModelArtifact = serde_json::from_str(&json)?;
        if artifact.metadata.format_version != FORMAT_VERSION {
            return Err(ModelError::CorruptArtifact(format!(
                "format version {} (expected {FORMAT_VERSION})",
                artifact.metadata.format_version
            )));
        }
        artifact.check()?;
        info!(
            path = %path.display(),
            trained_at = %artifact.metadata.trained_at,
            features = artifact.vocabulary_size(),
            "loaded model artifact"
        );
        Ok(artifact)
    }

    fn check(&self) -> Result<(), ModelError> {
        self.vectorizer.check()?;
        self.classifier.check()?;
        if self.classifier.n_features() != self.vectorizer.dim() {
            return Err(ModelError::CorruptArtifact(format!(
                "classifier expects {} features, vocabulary has {}",
                self.classifier.n_features(),
                self.vectorizer.dim()
            )));
        }
        if self.classifier.categories() != self.metadata.categories.as_slice() {
            return Err(ModelError::CorruptArtifact(
                "metadata categories disagree with classifier".into(),
            ));
        }
        Ok(())
    }
}

/// Serialize `value` as pretty JSON to `path` via temp file + rename.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ModelError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(tmp.as_file_mut(), value)?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| ModelError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::VectorizerConfig;

    fn small_artifact() -> ModelArtifact {
        let docs = [
            "goal striker match",
            "match referee goal",
            "vote election senate",
            "senate budget vote",
        ];
        let labels = [
            Category::Sports,
            Category::Sports,
            Category::Politics,
            Category::Politics,
        ];
        let mut vectorizer = TfidfVectorizer::new(VectorizerConfig::default());
        let x = vectorizer.fit_transform(&docs).unwrap();
        let mut nb = MultinomialNb::default();
        nb.train(&x, &labels).unwrap();
        ModelArtifact::new(vectorizer, nb, docs.len()).unwrap()
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = small_artifact();
        let path = artifact.save(dir.path()).unwrap();
        assert!(path.ends_with(MODEL_FILE));

        let loaded = ModelArtifact::load(dir.path()).unwrap();
        assert_eq!(loaded.metadata, artifact.metadata);
        assert_eq!(
            loaded.predict("Striker scores a goal").unwrap(),
            artifact.predict("Striker scores a goal").unwrap()
        );
    }

    #[test]
    fn categories_follow_definition_order() {
        let artifact = small_artifact();
        assert_eq!(artifact.categories(), [Category::Sports, Category::Politics]);
    }

    #[test]
    fn missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ModelArtifact::load(dir.path()),
            Err(ModelError::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn inconsistent_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut artifact = small_artifact();
        artifact.metadata.categories = vec![Category::World];
        write_json_atomic(&dir.path().join(MODEL_FILE), &artifact).unwrap();
        assert!(matches!(
            ModelArtifact::load(dir.path()),
            Err(ModelError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn untrained_parts_are_rejected() {
        let result = ModelArtifact::new(TfidfVectorizer::default(), MultinomialNb::default(), 0);
        assert!(matches!(result, Err(ModelError::VectorizerNotFitted)));
    }
}
