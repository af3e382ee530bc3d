//! TF-IDF feature extraction.
//!
//! `fit` learns a capped vocabulary and smoothed IDF weights from a corpus;
//! `transform` maps a text to a dense, L2-normalized vector with one slot
//! per vocabulary term. Terms are stored in lexicographic order, so a
//! term's index is its position and lookup is a binary search.

use std::collections::{BTreeMap, HashMap};

use newsdesk_core::normalize::is_stopword;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VectorizerConfig {
    /// Keep at most this many terms, highest total frequency first.
    pub max_features: usize,
    /// Drop terms found in fewer documents than this.
    pub min_df: usize,
    /// Drop terms found in more than this fraction of documents.
    pub max_df: f64,
    pub min_token_len: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: 1000,
            min_df: 1,
            max_df: 1.0,
            min_token_len: 2,
        }
    }
}

impl VectorizerConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.max_features == 0 {
            return Err(ModelError::InvalidConfig(
                "max_features must be greater than 0".into(),
            ));
        }
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(ModelError::InvalidConfig(format!(
                "max_df must be in (0, 1], got {}",
                self.max_df
            )));
        }
        Ok(())
    }
}

/// Fitted term → index mapping with per-term IDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<String>,
    idf: Vec<f64>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// Terms must be sorted and unique, one IDF per term.
    fn check(&self) -> Result<(), ModelError> {
        if self.terms.len() != self.idf.len() {
            return Err(ModelError::CorruptArtifact(format!(
                "{} terms but {} idf weights",
                self.terms.len(),
                self.idf.len()
            )));
        }
        if self.terms.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ModelError::CorruptArtifact(
                "vocabulary terms are not sorted and unique".into(),
            ));
        }
        Ok(())
    }
}

/// Dense TF-IDF vector, positionally aligned to a [`Vocabulary`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of non-zero slots.
    pub fn nnz(&self) -> usize {
        self.0.iter().filter(|&&w| w != 0.0).count()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(v: Vec<f64>) -> Self {
        Self(v)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    vocabulary: Option<Vocabulary>,
}

impl TfidfVectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        Self {
            config,
            vocabulary: None,
        }
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.vocabulary.is_some()
    }

    /// Number of features produced by `transform`, 0 before fitting.
    pub fn dim(&self) -> usize {
        self.vocabulary.as_ref().map_or(0, Vocabulary::len)
    }

    /// Learn the vocabulary and IDF weights, replacing any previous fit.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<&Vocabulary, ModelError> {
        self.config.validate()?;
        if documents.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let n_docs = documents.len();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let counts = self.term_counts(doc.as_ref());
            for (term, n) in counts {
                *total_freq.entry(term.clone()).or_insert(0) += n;
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let max_docs = self.config.max_df * n_docs as f64;
        let mut candidates: Vec<(String, usize)> = total_freq
            .into_iter()
            .filter(|(term, _)| {
                let df = doc_freq[term];
                df >= self.config.min_df && df as f64 <= max_docs
            })
            .collect();

        // Highest frequency first, lexicographic among equals.
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        candidates.truncate(self.config.max_features);

        let mut terms: Vec<String> = candidates.into_iter().map(|(t, _)| t).collect();
        terms.sort();
        if terms.is_empty() {
            return Err(ModelError::EmptyVocabulary);
        }

        let n = n_docs as f64;
        let idf = terms
            .iter()
            .map(|t| ((1.0 + n) / (1.0 + doc_freq[t] as f64)).ln() + 1.0)
            .collect();

        info!(
            documents = n_docs,
            candidates = doc_freq.len(),
            features = terms.len(),
            "fitted vectorizer"
        );
        Ok(self.vocabulary.insert(Vocabulary { terms, idf }))
    }

    /// Map a text onto the fitted vocabulary.
    pub fn transform(&self, text: &str) -> Result<FeatureVector, ModelError> {
        let vocab = self
            .vocabulary
            .as_ref()
            .ok_or(ModelError::VectorizerNotFitted)?;

        let mut weights = vec![0.0; vocab.len()];
        for (term, n) in self.term_counts(text) {
            if let Some(i) = vocab.index_of(&term) {
                weights[i] = n as f64 * vocab.idf[i];
            }
        }

        let norm = weights.iter().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for w in &mut weights {
                *w /= norm;
            }
        }

        let v = FeatureVector(weights);
        debug!(dim = v.len(), nnz = v.nnz(), "transformed text");
        Ok(v)
    }

    /// Fit on `documents`, then transform each of them.
    pub fn fit_transform<S: AsRef<str>>(
        &mut self,
        documents: &[S],
    ) -> Result<Vec<FeatureVector>, ModelError> {
        self.fit(documents)?;
        documents
            .iter()
            .map(|d| self.transform(d.as_ref()))
            .collect()
    }

    pub(crate) fn check(&self) -> Result<(), ModelError> {
        match &self.vocabulary {
            Some(v) => v.check(),
            None => Err(ModelError::VectorizerNotFitted),
        }
    }

    fn term_counts(&self, text: &str) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for token in tokenize(text, self.config.min_token_len) {
            *counts.entry(token).or_insert(0) += 1;
        }
        counts
    }
}

/// Lower-cased alphabetic runs of at least `min_len` chars that are not
/// stopwords.
fn tokenize(text: &str, min_len: usize) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphabetic())
        .filter(move |t| t.chars().count() >= min_len)
        .map(str::to_lowercase)
        .filter(|t| !is_stopword(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec![
            "team win championship game",
            "team lose game overtime",
            "election vote parliament",
            "parliament debate election budget",
        ]
    }

    fn fitted(config: VectorizerConfig) -> TfidfVectorizer {
        let mut v = TfidfVectorizer::new(config);
        v.fit(&corpus()).unwrap();
        v
    }

    #[test]
    fn transform_before_fit_fails() {
        let v = TfidfVectorizer::default();
        assert!(matches!(
            v.transform("anything"),
            Err(ModelError::VectorizerNotFitted)
        ));
    }

    #[test]
    fn vocabulary_is_sorted_with_smoothed_idf() {
        let v = fitted(VectorizerConfig::default());
        let vocab = v.vocabulary().unwrap();
        assert_eq!(vocab.len(), 11);
        assert!(vocab.terms().windows(2).all(|w| w[0] < w[1]));

        // "team" appears in 2 of 4 documents.
        let i = vocab.index_of("team").unwrap();
        let expected = (5.0f64 / 3.0).ln() + 1.0;
        assert!((vocab.idf()[i] - expected).abs() < 1e-12);
    }

    #[test]
    fn max_features_keeps_most_frequent() {
        let v = fitted(VectorizerConfig {
            max_features: 4,
            ..VectorizerConfig::default()
        });
        let terms = v.vocabulary().unwrap().terms();
        assert_eq!(terms, ["election", "game", "parliament", "team"]);
    }

    #[test]
    fn document_frequency_caps() {
        let v = fitted(VectorizerConfig {
            min_df: 2,
            ..VectorizerConfig::default()
        });
        assert_eq!(v.dim(), 4);

        let v = fitted(VectorizerConfig {
            max_df: 0.3,
            ..VectorizerConfig::default()
        });
        assert!(v.vocabulary().unwrap().index_of("team").is_none());
        assert!(v.vocabulary().unwrap().index_of("budget").is_some());
    }

    #[test]
    fn vectors_have_vocabulary_length_and_unit_norm() {
        let v = fitted(VectorizerConfig::default());
        let x = v.transform("team game game unknownword").unwrap();
        assert_eq!(x.len(), v.dim());
        assert_eq!(x.nnz(), 2);
        let norm: f64 = x.as_slice().iter().map(|w| w * w).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_vocabulary_text_is_zero_vector() {
        let v = fitted(VectorizerConfig::default());
        let x = v.transform("completely unrelated words").unwrap();
        assert_eq!(x.nnz(), 0);
        assert_eq!(x.len(), v.dim());
    }

    #[test]
    fn transform_is_deterministic() {
        let a = fitted(VectorizerConfig::default());
        let b = fitted(VectorizerConfig::default());
        let text = "parliament election team";
        assert_eq!(a.transform(text).unwrap(), b.transform(text).unwrap());
    }

    #[test]
    fn stopwords_and_short_tokens_ignored() {
        let mut v = TfidfVectorizer::default();
        v.fit(&["the a x team"]).unwrap();
        assert_eq!(v.vocabulary().unwrap().terms(), ["team"]);
    }

    #[test]
    fn empty_inputs_are_errors() {
        let mut v = TfidfVectorizer::default();
        let none: [&str; 0] = [];
        assert!(matches!(v.fit(&none), Err(ModelError::EmptyTrainingSet)));
        assert!(matches!(v.fit(&["the and"]), Err(ModelError::EmptyVocabulary)));
        assert!(!v.is_fitted());
    }

    #[test]
    fn serde_round_trip_preserves_transform() {
        let v = fitted(VectorizerConfig::default());
        let json = serde_json::to_string(&v).unwrap();
        let back: TfidfVectorizer = serde_json::from_str(&json).unwrap();
        back.check().unwrap();
        assert_eq!(
            v.transform("team election").unwrap(),
            back.transform("team election").unwrap()
        );
    }
}
