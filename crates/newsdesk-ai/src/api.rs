//! Transport-independent request dispatcher.
//!
//! Validates requests at the boundary, runs predictions on the blocking
//! pool, and shapes responses. An HTTP layer only has to map routes onto
//! these methods and [`ApiError`] variants onto status codes.

use std::sync::Arc;

use futures::future::join_all;
use newsdesk_core::Category;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::service::{Backend, ClassifierService, ModelInfo, Prediction};

/// Most articles accepted in one batch.
pub const MAX_BATCH_SIZE: usize = 100;

/// Echoed input is cut to this many characters.
pub const ECHO_CHARS: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleRequest {
    pub text: String,
    /// Backend name; defaults to the statistical model.
    #[serde(default)]
    pub backend: Option<String>,
}

impl ArticleRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            backend: None,
        }
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCategory {
    pub category: Category,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub category: Category,
    pub confidence: f64,
    pub confidence_scores: Vec<ScoredCategory>,
    pub backend: Backend,
    pub input_text: String,
    /// Seconds from request entry to return.
    pub processing_time: f64,
}

impl PredictionResponse {
    fn new(prediction: Prediction, input: &str) -> Self {
        Self {
            category: prediction.category,
            confidence: prediction.confidence,
            confidence_scores: prediction
                .scores
                .into_iter()
                .map(|(category, score)| ScoredCategory { category, score })
                .collect(),
            backend: prediction.backend,
            input_text: echo(input),
            processing_time: prediction.elapsed.as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItemError {
    pub error: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Ok(PredictionResponse),
    Err(BatchItemError),
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub predictions: Vec<BatchItem>,
    pub total: usize,
    pub successful: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
    pub total_categories: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub available_backends: Vec<Backend>,
}

#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<ClassifierService>,
}

impl Dispatcher {
    pub fn new(service: Arc<ClassifierService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<ClassifierService> {
        &self.service
    }

    pub async fn predict(&self, request: ArticleRequest) -> Result<PredictionResponse, ApiError> {
        if request.text.trim().is_empty() {
            return Err(ApiError::EmptyText);
        }
        let backend = match &request.backend {
            Some(name) => name.parse::<Backend>()?,
            None => Backend::default(),
        };

        let service = Arc::clone(&self.service);
        let text = request.text.clone();
        let prediction = tokio::task::spawn_blocking(move || service.predict(&text, backend))
            .await
            .map_err(|e| ApiError::Task(e.to_string()))??;

        Ok(PredictionResponse::new(prediction, &request.text))
    }

    /// Classify an uploaded file's contents.
    pub async fn predict_file(
        &self,
        bytes: Vec<u8>,
        backend: Option<String>,
    ) -> Result<PredictionResponse, ApiError> {
        let text = String::from_utf8(bytes).map_err(|_| ApiError::InvalidUtf8)?;
        debug!(chars = text.chars().count(), "decoded upload");
        self.predict(ArticleRequest { text, backend }).await
    }

    /// Classify each article independently. A failing item is reported in
    /// place and does not affect the others.
    pub async fn batch_predict(
        &self,
        requests: Vec<ArticleRequest>,
    ) -> Result<BatchResponse, ApiError> {
        if requests.len() > MAX_BATCH_SIZE {
            return Err(ApiError::BatchTooLarge {
                size: requests.len(),
                limit: MAX_BATCH_SIZE,
            });
        }

        let tasks = requests.into_iter().map(|request| async move {
            let echoed = echo(&request.text);
            match self.predict(request).await {
                Ok(response) => BatchItem::Ok(response),
                Err(e) => {
                    warn!(error = %e, "batch item failed");
                    BatchItem::Err(BatchItemError {
                        error: e.to_string(),
                        text: echoed,
                    })
                }
            }
        });
        let predictions = join_all(tasks).await;

        let successful = predictions.iter().filter(|p| p.is_ok()).count();
        Ok(BatchResponse {
            total: predictions.len(),
            successful,
            predictions,
        })
    }

    pub fn categories(&self) -> CategoriesResponse {
        let categories = self.service.categories();
        CategoriesResponse {
            total_categories: categories.len(),
            categories,
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        self.service.info()
    }

    pub fn health(&self) -> HealthResponse {
        let info = self.service.info();
        let mut available_backends = Vec::new();
        if info.statistical_loaded {
            available_backends.push(Backend::Statistical);
        }
        if info.zero_shot_loaded {
            available_backends.push(Backend::External);
        }
        HealthResponse {
            status: if info.statistical_loaded { "healthy" } else { "unhealthy" },
            model_loaded: info.statistical_loaded,
            available_backends,
        }
    }
}

/// First [`ECHO_CHARS`] characters, with `...` appended when cut.
pub fn echo(text: &str) -> String {
    match text.char_indices().nth(ECHO_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
