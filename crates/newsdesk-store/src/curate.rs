//! Dataset curation: raw labeled sources → clean, balanced training corpus.
//!
//! Steps run in a fixed order, each a pure function over its input table:
//!
//! 1. concatenate sources
//! 2. drop duplicate texts (first occurrence wins)
//! 3. drop rows with missing text or category
//! 4. keep texts whose length is in `[min_text_len, max_text_len)`
//! 5. resolve labels through the [`LabelMap`]
//! 6. drop categories below `min_support`
//! 7. optionally downsample categories above `max_samples`
//! 8. optionally shuffle
//!
//! All randomness comes from one RNG seeded from the config, so the same
//! sources and seed always produce the same rows in the same order.

use std::collections::{BTreeMap, HashSet};

use newsdesk_core::{Category, LabelMap, LabeledDocument};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::corpus::{RawRow, category_counts};
use crate::error::StoreError;

/// Curation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CuratorConfig {
    /// Shortest accepted text, in characters (inclusive).
    pub min_text_len: usize,
    /// Longest accepted text, in characters (exclusive).
    pub max_text_len: usize,
    /// Categories with fewer rows are dropped entirely.
    pub min_support: usize,
    pub rebalance: Option<RebalanceConfig>,
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            min_text_len: 51,
            max_text_len: 15_000,
            min_support: 50,
            rebalance: Some(RebalanceConfig::default()),
            shuffle: true,
            seed: 42,
        }
    }
}

/// Per-category floor and ceiling. Rows above the ceiling are sampled
/// away; categories under the floor are only reported, never upsampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RebalanceConfig {
    pub min_samples: usize,
    pub max_samples: usize,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            min_samples: 5_000,
            max_samples: 30_000,
        }
    }
}

impl CuratorConfig {
    /// Ensure the thresholds are consistent.
    pub fn validate(self) -> Result<Self, StoreError> {
        if self.min_text_len >= self.max_text_len {
            return Err(StoreError::InvalidConfig(format!(
                "min_text_len ({}) must be below max_text_len ({})",
                self.min_text_len, self.max_text_len
            )));
        }
        if let Some(r) = &self.rebalance {
            if r.max_samples == 0 {
                return Err(StoreError::InvalidConfig(
                    "rebalance.max_samples must be greater than 0".into(),
                ));
            }
            if r.min_samples > r.max_samples {
                return Err(StoreError::InvalidConfig(format!(
                    "rebalance.min_samples ({}) exceeds max_samples ({})",
                    r.min_samples, r.max_samples
                )));
            }
        }
        Ok(self)
    }
}

/// What each step removed, plus the final distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurationStats {
    pub input_rows: usize,
    pub duplicate_rows: usize,
    pub missing_rows: usize,
    pub length_rejected: usize,
    pub unmapped_rows: usize,
    /// Categories dropped for falling under `min_support`, with their counts.
    pub sparse_categories: Vec<(Category, usize)>,
    pub downsampled_rows: usize,
    /// Categories kept below the rebalance floor, with their counts.
    pub under_represented: Vec<(Category, usize)>,
    pub output_rows: usize,
    pub category_counts: BTreeMap<Category, usize>,
}

/// Curated rows and the statistics of the run that produced them.
#[derive(Debug, Clone)]
pub struct Curated {
    pub rows: Vec<LabeledDocument>,
    pub stats: CurationStats,
}

pub struct Curator {
    config: CuratorConfig,
    labels: LabelMap,
}

impl Curator {
    pub fn new(config: CuratorConfig, labels: LabelMap) -> Result<Self, StoreError> {
        Ok(Self {
            config: config.validate()?,
            labels,
        })
    }

    pub fn config(&self) -> &CuratorConfig {
        &self.config
    }

    /// Run every curation step over the given sources, in order.
    pub fn curate(&self, sources: Vec<Vec<RawRow>>) -> Curated {
        let mut stats = CurationStats::default();
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let rows = concat(sources);
        stats.input_rows = rows.len();

        let (rows, removed) = dedup_by_text(rows);
        stats.duplicate_rows = removed;

        let (rows, removed) = drop_missing(rows);
        stats.missing_rows = removed;

        let (rows, removed) =
            filter_length(rows, self.config.min_text_len, self.config.max_text_len);
        stats.length_rejected = removed;

        let (docs, removed) = resolve_labels(rows, &self.labels);
        stats.unmapped_rows = removed;

        let (docs, sparse) = drop_sparse(docs, self.config.min_support);
        stats.sparse_categories = sparse;

        let docs = match &self.config.rebalance {
            Some(r) => {
                let (docs, outcome) = rebalance(docs, r, &mut rng);
                stats.downsampled_rows = outcome.downsampled;
                stats.under_represented = outcome.under_represented;
                docs
            }
            None => docs,
        };

        let mut docs = docs;
        if self.config.shuffle {
            docs.shuffle(&mut rng);
        }

        stats.output_rows = docs.len();
        stats.category_counts = category_counts(&docs);

        info!(
            input = stats.input_rows,
            duplicates = stats.duplicate_rows,
            missing = stats.missing_rows,
            length_rejected = stats.length_rejected,
            unmapped = stats.unmapped_rows,
            downsampled = stats.downsampled_rows,
            output = stats.output_rows,
            categories = stats.category_counts.len(),
            "curation complete"
        );

        Curated { rows: docs, stats }
    }
}

pub fn concat(sources: Vec<Vec<RawRow>>) -> Vec<RawRow> {
    sources.into_iter().flatten().collect()
}

/// Keep the first row for each distinct text. Rows without text pass
/// through untouched; the missing-value step removes them.
pub fn dedup_by_text(rows: Vec<RawRow>) -> (Vec<RawRow>, usize) {
    let before = rows.len();
    let mut seen = HashSet::new();
    let kept: Vec<RawRow> = rows
        .into_iter()
        .filter(|row| match &row.text {
            Some(text) => seen.insert(text.clone()),
            None => true,
        })
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

pub fn drop_missing(rows: Vec<RawRow>) -> (Vec<RawRow>, usize) {
    let before = rows.len();
    let kept: Vec<RawRow> = rows
        .into_iter()
        .filter(|row| row.text.is_some() && row.category.is_some())
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Keep rows whose text has `min <= chars < max`.
pub fn filter_length(rows: Vec<RawRow>, min: usize, max: usize) -> (Vec<RawRow>, usize) {
    let before = rows.len();
    let kept: Vec<RawRow> = rows
        .into_iter()
        .filter(|row| {
            row.text.as_deref().is_some_and(|t| {
                let len = t.chars().count();
                len >= min && len < max
            })
        })
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Resolve raw labels to categories; rows whose label names no category
/// are dropped and counted.
pub fn resolve_labels(rows: Vec<RawRow>, labels: &LabelMap) -> (Vec<LabeledDocument>, usize) {
    let mut unmapped: BTreeMap<String, usize> = BTreeMap::new();
    let mut docs = Vec::with_capacity(rows.len());

    for row in rows {
        let (Some(text), Some(raw)) = (row.text, row.category) else {
            continue;
        };
        match labels.resolve(&raw) {
            Some(category) => docs.push(LabeledDocument { text, category }),
            None => *unmapped.entry(raw).or_insert(0) += 1,
        }
    }

    let removed = unmapped.values().sum();
    for (label, count) in &unmapped {
        warn!(label = %label, count, "label does not name a category; rows dropped");
    }
    (docs, removed)
}

/// Drop every category with fewer than `min_support` rows.
pub fn drop_sparse(
    docs: Vec<LabeledDocument>,
    min_support: usize,
) -> (Vec<LabeledDocument>, Vec<(Category, usize)>) {
    let counts = category_counts(&docs);
    let sparse: Vec<(Category, usize)> = counts
        .into_iter()
        .filter(|&(_, n)| n < min_support)
        .collect();

    if sparse.is_empty() {
        return (docs, sparse);
    }

    for (category, count) in &sparse {
        warn!(%category, count, min_support, "category below minimum support; dropped");
    }
    let dropped: HashSet<Category> = sparse.iter().map(|&(c, _)| c).collect();
    let kept = docs
        .into_iter()
        .filter(|d| !dropped.contains(&d.category))
        .collect();
    (kept, sparse)
}

pub struct RebalanceOutcome {
    pub downsampled: usize,
    pub under_represented: Vec<(Category, usize)>,
}

/// Downsample categories above the ceiling; report those under the floor.
///
/// Output is grouped by category in definition order. Kept rows of a
/// downsampled category stay in their original relative order.
pub fn rebalance(
    docs: Vec<LabeledDocument>,
    config: &RebalanceConfig,
    rng: &mut StdRng,
) -> (Vec<LabeledDocument>, RebalanceOutcome) {
    let mut groups: BTreeMap<Category, Vec<LabeledDocument>> = BTreeMap::new();
    for doc in docs {
        groups.entry(doc.category).or_default().push(doc);
    }

    let mut outcome = RebalanceOutcome {
        downsampled: 0,
        under_represented: Vec::new(),
    };
    let mut out = Vec::new();

    for (category, group) in groups {
        let n = group.len();
        if n > config.max_samples {
            let mut keep = rand::seq::index::sample(rng, n, config.max_samples).into_vec();
            keep.sort_unstable();
            let mut keep = keep.into_iter().peekable();
            for (i, doc) in group.into_iter().enumerate() {
                if keep.peek() == Some(&i) {
                    keep.next();
                    out.push(doc);
                }
            }
            outcome.downsampled += n - config.max_samples;
            info!(%category, from = n, to = config.max_samples, "downsampled");
        } else {
            if n < config.min_samples {
                warn!(
                    %category,
                    count = n,
                    min_samples = config.min_samples,
                    "category under-represented; kept as-is"
                );
                outcome.under_represented.push((category, n));
            }
            out.extend(group);
        }
    }

    (out, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str, category: &str) -> RawRow {
        RawRow::new(Some(text), Some(category))
    }

    fn long(prefix: &str, i: usize) -> String {
        format!("{prefix} article number {i} with enough characters to pass the length filter")
    }

    fn config(min_support: usize, rebalance: Option<RebalanceConfig>) -> CuratorConfig {
        CuratorConfig {
            min_text_len: 10,
            max_text_len: 200,
            min_support,
            rebalance,
            shuffle: true,
            seed: 7,
        }
    }

    fn sources() -> Vec<Vec<RawRow>> {
        let mut a: Vec<RawRow> = (0..40).map(|i| raw(&long("sport", i), "sport")).collect();
        a.extend((0..12).map(|i| raw(&long("tech", i), "TECH")));
        let mut b: Vec<RawRow> = (0..5).map(|i| raw(&long("health", i), "health")).collect();
        b.push(raw(&long("sport", 0), "sport"));
        b.push(RawRow::new(None, Some("sport")));
        b.push(raw("short", "sport"));
        b.push(raw(&long("weather", 0), "weather"));
        vec![a, b]
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let rows = vec![raw("same", "a"), raw("other", "b"), raw("same", "c")];
        let (kept, removed) = dedup_by_text(rows);
        assert_eq!(removed, 1);
        assert_eq!(kept, vec![raw("same", "a"), raw("other", "b")]);
    }

    #[test]
    fn length_bounds_are_inclusive_exclusive() {
        let rows = vec![raw("abcd", "x"), raw("abcde", "x"), raw("abcdefghij", "x")];
        let (kept, removed) = filter_length(rows, 5, 10);
        assert_eq!(removed, 2);
        assert_eq!(kept, vec![raw("abcde", "x")]);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let rows = vec![raw("ééééé", "x")];
        let (kept, _) = filter_length(rows, 5, 6);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn unmapped_labels_are_dropped() {
        let rows = vec![raw("a", "sport"), raw("b", "weather"), raw("c", "FINANCE")];
        let (docs, removed) = resolve_labels(rows, &LabelMap::default());
        assert_eq!(removed, 1);
        assert_eq!(docs[0].category, Category::Sports);
        assert_eq!(docs[1].category, Category::Finance);
    }

    #[test]
    fn full_pipeline_stats() {
        let curator = Curator::new(config(10, None), LabelMap::default()).unwrap();
        let out = curator.curate(sources());

        let s = &out.stats;
        assert_eq!(s.input_rows, 61);
        assert_eq!(s.duplicate_rows, 1);
        assert_eq!(s.missing_rows, 1);
        assert_eq!(s.length_rejected, 1);
        assert_eq!(s.unmapped_rows, 1);
        assert_eq!(s.sparse_categories, vec![(Category::Health, 5)]);
        assert_eq!(s.output_rows, 52);
        assert_eq!(s.category_counts[&Category::Sports], 40);
        assert_eq!(s.category_counts[&Category::Technology], 12);
    }

    #[test]
    fn no_category_below_min_support_and_no_duplicates() {
        let curator = Curator::new(config(10, None), LabelMap::default()).unwrap();
        let out = curator.curate(sources());

        assert!(out.stats.category_counts.values().all(|&n| n >= 10));
        let distinct: HashSet<&str> = out.rows.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(distinct.len(), out.rows.len());
    }

    #[test]
    fn rebalance_downsamples_and_reports_floor() {
        let rebalance = RebalanceConfig {
            min_samples: 20,
            max_samples: 25,
        };
        let curator = Curator::new(config(10, Some(rebalance)), LabelMap::default()).unwrap();
        let out = curator.curate(sources());

        assert_eq!(out.stats.category_counts[&Category::Sports], 25);
        assert_eq!(out.stats.downsampled_rows, 15);
        assert_eq!(
            out.stats.under_represented,
            vec![(Category::Technology, 12)]
        );
        assert_eq!(out.stats.category_counts[&Category::Technology], 12);
    }

    #[test]
    fn same_seed_reproduces_rows() {
        let rebalance = Some(RebalanceConfig {
            min_samples: 1,
            max_samples: 20,
        });
        let a = Curator::new(config(10, rebalance), LabelMap::default())
            .unwrap()
            .curate(sources());
        let b = Curator::new(config(10, rebalance), LabelMap::default())
            .unwrap()
            .curate(sources());
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn different_seed_changes_order() {
        let mut other = config(10, None);
        other.seed = 8;
        let a = Curator::new(config(10, None), LabelMap::default())
            .unwrap()
            .curate(sources());
        let b = Curator::new(other, LabelMap::default()).unwrap().curate(sources());
        assert_ne!(a.rows, b.rows);
        assert_eq!(a.stats.category_counts, b.stats.category_counts);
    }

    #[test]
    fn downsampling_preserves_relative_order() {
        let docs: Vec<LabeledDocument> = (0..10)
            .map(|i| LabeledDocument::new(format!("{i:02}"), Category::World))
            .collect();
        let mut rng = StdRng::seed_from_u64(1);
        let (out, outcome) = rebalance(
            docs,
            &RebalanceConfig {
                min_samples: 0,
                max_samples: 4,
            },
            &mut rng,
        );
        assert_eq!(out.len(), 4);
        assert_eq!(outcome.downsampled, 6);
        let texts: Vec<&str> = out.iter().map(|d| d.text.as_str()).collect();
        let mut sorted = texts.clone();
        sorted.sort();
        assert_eq!(texts, sorted);
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let mut cfg = CuratorConfig::default();
        cfg.min_text_len = 100;
        cfg.max_text_len = 50;
        assert!(cfg.validate().is_err());

        let cfg = CuratorConfig {
            rebalance: Some(RebalanceConfig {
                min_samples: 10,
                max_samples: 5,
            }),
            ..CuratorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_json_defaults_and_unknown_fields() {
        let cfg: CuratorConfig = serde_json::from_str(r#"{"min_support": 100}"#).unwrap();
        assert_eq!(cfg.min_support, 100);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.rebalance, Some(RebalanceConfig::default()));

        let bad: Result<CuratorConfig, _> = serde_json::from_str(r#"{"min_suport": 100}"#);
        assert!(bad.is_err());
    }
}
