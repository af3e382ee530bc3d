//! JSON curation plans: which sources to read, how, and where to write.
//!
//! ```json
//! {
//!   "sources": [
//!     { "path": "bbc.csv" },
//!     { "path": "ag_news.csv", "columns": ["label", "title", "description"],
//!       "text_columns": ["title", "description"], "category_column": "label",
//!       "label_codes": { "1": "World", "2": "Sports", "3": "Business", "4": "Sci/Tech" } }
//!   ],
//!   "output": "corpus.csv",
//!   "curator": { "min_support": 50 },
//!   "label_aliases": { "footy": "Sports" }
//! }
//! ```
//!
//! Relative paths resolve against the directory holding the plan file. A
//! source with `columns` has no header row; those names label its fields in
//! order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use newsdesk_core::LabelMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::corpus::{RawRow, SourceColumns, read_source, write_corpus};
use crate::curate::{CurationStats, Curator, CuratorConfig};
use crate::error::StoreError;

fn default_text_columns() -> Vec<String> {
    vec!["text".to_string()]
}

fn default_category_column() -> String {
    "category".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    pub path: PathBuf,
    #[serde(default = "default_text_columns")]
    pub text_columns: Vec<String>,
    #[serde(default = "default_category_column")]
    pub category_column: String,
    #[serde(default)]
    pub label_codes: BTreeMap<String, String>,
    /// Field names for a headerless file.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            text_columns: default_text_columns(),
            category_column: default_category_column(),
            label_codes: BTreeMap::new(),
            columns: None,
        }
    }

    fn columns(&self) -> SourceColumns {
        SourceColumns {
            text: self.text_columns.clone(),
            category: self.category_column.clone(),
            label_codes: self.label_codes.clone(),
            names: self.columns.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurationPlan {
    pub sources: Vec<SourceSpec>,
    pub output: PathBuf,
    #[serde(default)]
    pub curator: CuratorConfig,
    /// Extra `alias → category` pairs layered over the default label map.
    #[serde(default)]
    pub label_aliases: BTreeMap<String, String>,
}

impl CurationPlan {
    /// Load a plan, resolving relative paths against its directory.
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::FileNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let mut plan: CurationPlan = serde_json::from_str(&json)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for source in &mut plan.sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
        if plan.output.is_relative() {
            plan.output = base.join(&plan.output);
        }
        Ok(plan)
    }

    /// Validated label map: defaults plus this plan's aliases.
    pub fn label_map(&self) -> Result<LabelMap, StoreError> {
        let extra = LabelMap::from_aliases(&self.label_aliases)?;
        Ok(LabelMap::default().with_aliases(extra))
    }

    /// Read every source, curate, and write the corpus.
    ///
    /// A source that cannot be read is skipped with a warning; the run
    /// fails only when no source yields any rows.
    pub fn run(&self) -> Result<CurationStats, StoreError> {
        let curator = Curator::new(self.curator.clone(), self.label_map()?)?;

        let mut loaded: Vec<Vec<RawRow>> = Vec::new();
        for source in &self.sources {
            match read_source(&source.path, &source.columns()) {
                Ok(rows) => {
                    info!(path = %source.path.display(), rows = rows.len(), "loaded source");
                    loaded.push(rows);
                }
                Err(e) => {
                    warn!(path = %source.path.display(), error = %e, "skipping source");
                }
            }
        }

        if loaded.iter().all(|rows| rows.is_empty()) {
            return Err(StoreError::NoUsableRows);
        }

        let curated = curator.curate(loaded);
        write_corpus(&self.output, &curated.rows)?;
        info!(
            output = %self.output.display(),
            rows = curated.stats.output_rows,
            "wrote curated corpus"
        );
        Ok(curated.stats)
    }
}
