use std::path::PathBuf;

use newsdesk_store::StoreError;
use thiserror::Error;

/// Model-level failures: unmet preconditions, training input problems,
/// and artifact persistence.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("vectorizer has not been fitted")]
    VectorizerNotFitted,

    #[error("classifier has not been trained")]
    ClassifierNotTrained,

    #[error("feature vector has {got} dimensions, model expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("training already in progress")]
    TrainingInProgress,

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("{features} feature vectors but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    #[error("no term survived vocabulary filtering")]
    EmptyVocabulary,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("model artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("inconsistent model artifact: {0}")]
    CorruptArtifact(String),

    #[error("corpus: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Request-boundary failures reported by [`crate::api::Dispatcher`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("text must not be empty")]
    EmptyText,

    #[error("file is not valid UTF-8 text")]
    InvalidUtf8,

    #[error("batch of {size} exceeds the limit of {limit} articles")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("unknown backend {0:?}")]
    UnknownBackend(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("prediction task failed: {0}")]
    Task(String),
}
