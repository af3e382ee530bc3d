//! Text normalization for news articles.
//!
//! Pipeline: lowercase → strip URLs, HTML tags, emails → keep `[a-z ]` →
//! collapse whitespace → tokenize → drop stopwords and short tokens →
//! lemmatize → rejoin.
//!
//! Every stage is idempotent and the whole transform is a fixed point:
//! `normalize(&normalize(t)) == normalize(t)`. Normalization never fails;
//! when every token is filtered out the cleaned, untokenized string is
//! returned so a short headline is never silently erased.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// Tokens shorter than this are dropped.
pub const MIN_TOKEN_LEN: usize = 3;

/// NLTK English stopwords, without the apostrophe forms (apostrophes are
/// stripped before stopword matching, so those entries could never hit).
pub const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by", "for",
    "with", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where", "why", "how", "all",
    "any", "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not",
    "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will", "just", "don",
    "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "couldn", "didn",
    "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn", "needn", "shan",
    "shouldn", "wasn", "weren", "won", "wouldn",
];

static STOPWORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ENGLISH_STOPWORDS.iter().copied().collect());

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[a-z][a-z0-9+.\-]*://|www\.)\S*").expect("valid regex")
});
static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").expect("valid regex"));
static NON_ALPHA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z\s]").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Irregular plural → lemma. Values are base forms that no suffix rule
/// rewrites further.
const IRREGULAR: &[(&str, &str)] = &[
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("leaves", "leaf"),
    ("knives", "knife"),
    ("wives", "wife"),
    ("lives", "life"),
    ("halves", "half"),
    ("wolves", "wolf"),
    ("shelves", "shelf"),
    ("thieves", "thief"),
    ("criteria", "criterion"),
    ("phenomena", "phenomenon"),
    ("media", "medium"),
    ("analyses", "analysis"),
    ("crises", "crisis"),
    ("theses", "thesis"),
    ("diagnoses", "diagnosis"),
    ("heroes", "hero"),
    ("potatoes", "potato"),
    ("tomatoes", "tomato"),
    ("echoes", "echo"),
    ("vetoes", "veto"),
    ("quizzes", "quiz"),
    ("movies", "movie"),
    ("cookies", "cookie"),
    ("rookies", "rookie"),
    ("zombies", "zombie"),
    ("calories", "calorie"),
    ("selfies", "selfie"),
    ("goalies", "goalie"),
];

/// Words that end in `s` but are already base forms.
const INVARIANT: &[&str] = &[
    "news", "series", "species", "physics", "economics", "politics", "athletics",
    "mathematics", "gymnastics", "olympics", "electronics", "chaos", "lens", "bias",
    "atlas", "canvas", "alias", "christmas", "texas", "kansas", "arkansas", "vegas",
    "pancreas", "always", "perhaps", "sometimes", "towards", "afterwards", "besides",
    "whereas", "paris", "athens",
];

/// Singular forms ending in `che`, whose plural only drops the `s`.
const CHE_NOUNS: &[&str] = &[
    "ache", "headache", "niche", "cache", "avalanche", "cliche", "psyche", "moustache",
];

static IRREGULAR_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| IRREGULAR.iter().copied().collect());

pub fn is_stopword(token: &str) -> bool {
    STOPWORD_SET.contains(token)
}

/// Normalize raw article text into space-separated lemmas.
pub fn normalize(text: &str) -> String {
    let cleaned = clean(text);

    let lemmas: Vec<String> = cleaned
        .split(' ')
        .filter(|t| keep_token(t))
        .map(lemmatize)
        .filter(|t| keep_token(t))
        .collect();

    if lemmas.is_empty() {
        cleaned
    } else {
        lemmas.join(" ")
    }
}

/// Stages up to (not including) tokenization.
fn clean(text: &str) -> String {
    let lowered = text.to_lowercase();
    let no_urls = URL_RE.replace_all(&lowered, " ");
    let no_html = HTML_TAG_RE.replace_all(&no_urls, " ");
    let no_email = EMAIL_RE.replace_all(&no_html, " ");
    let letters = NON_ALPHA_RE.replace_all(&no_email, "");
    WHITESPACE_RE.replace_all(&letters, " ").trim().to_string()
}

fn keep_token(token: &str) -> bool {
    token.len() >= MIN_TOKEN_LEN && !is_stopword(token)
}

/// Reduce a lowercase token to its noun lemma.
///
/// Rules are applied until none fires; every rule either shortens the word
/// or maps it to a terminal base form, so the loop always ends.
pub fn lemmatize(token: &str) -> String {
    let mut current = token.to_string();
    while let Some(next) = lemma_step(&current) {
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn lemma_step(word: &str) -> Option<String> {
    if let Some(&base) = IRREGULAR_MAP.get(word) {
        return Some(base.to_string());
    }
    if INVARIANT.contains(&word) || word.len() < 4 {
        return None;
    }

    let candidate = if word.ends_with("sses") {
        strip(word, 2)
    } else if let Some(stem) = word.strip_suffix("ies") {
        if stem.len() >= 2 {
            format!("{stem}y")
        } else {
            strip(word, 1)
        }
    } else if word.ends_with("xes") || word.ends_with("zzes") || word.ends_with("shes") {
        strip(word, 2)
    } else if word.ends_with("ches") {
        let singular = &word[..word.len() - 1];
        if CHE_NOUNS.contains(&singular) {
            singular.to_string()
        } else {
            strip(word, 2)
        }
    } else if word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("is")
    {
        strip(word, 1)
    } else {
        return None;
    };

    (candidate.len() >= MIN_TOKEN_LEN).then_some(candidate)
}

fn strip(word: &str, n: usize) -> String {
    word[..word.len() - n].to_string()
}
