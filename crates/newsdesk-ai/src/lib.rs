//! Classification layer: TF-IDF features, naive Bayes, training, and the
//! inference service with zero-shot fallback.

mod error;
pub use error::{ApiError, ModelError};

pub mod api;
pub mod artifact;
pub mod classifier;
pub mod sample;
pub mod service;
pub mod train;
pub mod vectorizer;
pub mod zero_shot;

#[cfg(feature = "onnx")]
mod nli;
#[cfg(feature = "onnx")]
pub use nli::NliZeroShot;

pub use api::Dispatcher;
pub use artifact::ModelArtifact;
pub use classifier::{Distribution, MultinomialNb};
pub use service::{Backend, Capability, ClassifierService, ModelInfo, Prediction};
pub use train::{Trainer, TrainerConfig, TrainingMetrics};
pub use vectorizer::{FeatureVector, TfidfVectorizer, VectorizerConfig, Vocabulary};
pub use zero_shot::{ZeroShotClassifier, ZeroShotError, ZeroShotScores};
