//! Labeled documents flowing from curation into training.

use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Article text paired with its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledDocument {
    pub text: String,
    pub category: Category,
}

impl LabeledDocument {
    pub fn new(text: impl Into<String>, category: Category) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }
}
