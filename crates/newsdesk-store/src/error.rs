use std::path::PathBuf;

use newsdesk_core::CategoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}: unknown category {label:?} at row {row}")]
    UnknownCategory {
        path: PathBuf,
        row: usize,
        label: String,
    },

    #[error("no source produced any rows")]
    NoUsableRows,

    #[error("invalid curation config: {0}")]
    InvalidConfig(String),

    #[error("label map: {0}")]
    Labels(#[from] CategoryError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
