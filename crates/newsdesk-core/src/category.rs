//! News categories and raw-label normalization.
//!
//! [`Category`] is the closed label set every model is trained and served
//! against. Its definition order is significant: probability vectors are
//! positionally aligned to it and exact ties resolve to the lowest index.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CategoryError {
    #[error("unknown category: {0:?}")]
    Unknown(String),

    #[error("label alias {alias:?} maps to unknown category {target:?}")]
    UnknownAliasTarget { alias: String, target: String },

    #[error("invalid label map JSON: {0}")]
    Json(String),
}

/// Topical category of a news article.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Category {
    Sports,
    Politics,
    Technology,
    Entertainment,
    Business,
    Health,
    Science,
    World,
    Lifestyle,
    Education,
    Legal,
    Finance,
}

impl Category {
    /// Every category in definition order.
    pub const ALL: [Category; 12] = [
        Category::Sports,
        Category::Politics,
        Category::Technology,
        Category::Entertainment,
        Category::Business,
        Category::Health,
        Category::Science,
        Category::World,
        Category::Lifestyle,
        Category::Education,
        Category::Legal,
        Category::Finance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sports => "Sports",
            Self::Politics => "Politics",
            Self::Technology => "Technology",
            Self::Entertainment => "Entertainment",
            Self::Business => "Business",
            Self::Health => "Health",
            Self::Science => "Science",
            Self::World => "World",
            Self::Lifestyle => "Lifestyle",
            Self::Education => "Education",
            Self::Legal => "Legal",
            Self::Finance => "Finance",
        }
    }

    /// Position in definition order.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Match a label against category names, ignoring ASCII case and
    /// surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| CategoryError::Unknown(s.to_string()))
    }
}

/// Aliases applied by [`LabelMap::default`]: lower-cased raw label → category.
const DEFAULT_ALIASES: &[(&str, Category)] = &[
    ("technology", Category::Technology),
    ("tech", Category::Technology),
    ("sci/tech", Category::Technology),
    ("entertainment", Category::Entertainment),
    ("sports", Category::Sports),
    ("sport", Category::Sports),
    ("business", Category::Business),
    ("politics", Category::Politics),
    ("political", Category::Politics),
    ("health", Category::Health),
    ("science", Category::Science),
    ("world", Category::World),
    ("lifestyle", Category::Lifestyle),
    ("education", Category::Education),
    ("legal", Category::Legal),
    ("finance", Category::Finance),
];

/// Case-insensitive mapping from raw dataset labels to [`Category`].
///
/// Targets are validated when the map is built, so an alias can never
/// point at a category that does not exist. Labels missing from the map
/// fall back to title-casing (`"SPORTS"` → `"Sports"`) before matching
/// category names.
#[derive(Debug, Clone)]
pub struct LabelMap {
    aliases: HashMap<String, Category>,
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|&(alias, cat)| (alias.to_string(), cat))
                .collect(),
        }
    }
}

impl LabelMap {
    /// An empty map: only title-case matching applies.
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    /// Build from `alias → category name` pairs, failing on the first
    /// target that names no category.
    pub fn from_aliases<I, K, V>(pairs: I) -> Result<Self, CategoryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut aliases = HashMap::new();
        for (alias, target) in pairs {
            let alias = alias.as_ref().trim().to_lowercase();
            let cat = Category::from_label(target.as_ref()).ok_or_else(|| {
                CategoryError::UnknownAliasTarget {
                    alias: alias.clone(),
                    target: target.as_ref().to_string(),
                }
            })?;
            aliases.insert(alias, cat);
        }
        Ok(Self { aliases })
    }

    /// Parse a JSON object of `"alias": "Category"` pairs.
    pub fn from_json(json: &str) -> Result<Self, CategoryError> {
        let pairs: HashMap<String, String> =
            serde_json::from_str(json).map_err(|e| CategoryError::Json(e.to_string()))?;
        Self::from_aliases(pairs)
    }

    /// Extend this map with more aliases; later entries win.
    pub fn with_aliases(mut self, other: LabelMap) -> Self {
        self.aliases.extend(other.aliases);
        self
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Resolve a raw label, or `None` if neither the alias table nor the
    /// title-cased label names a category.
    pub fn resolve(&self, raw: &str) -> Option<Category> {
        let key = raw.trim().to_lowercase();
        if let Some(&cat) = self.aliases.get(&key) {
            return Some(cat);
        }
        let titled = title_case(raw.trim());
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == titled)
    }
}

/// Upper-case the first letter of each alphabetic run and lower-case the
/// rest, so `"sci-TECH news"` becomes `"Sci-Tech News"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_order_matches_index() {
        for (i, cat) in Category::ALL.iter().enumerate() {
            assert_eq!(cat.index(), i);
        }
        assert!(Category::Sports < Category::Finance);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("sports".parse::<Category>().unwrap(), Category::Sports);
        assert_eq!(" TECHNOLOGY ".parse::<Category>().unwrap(), Category::Technology);
        assert!("weather".parse::<Category>().is_err());
    }

    #[test]
    fn default_map_resolves_aliases() {
        let map = LabelMap::default();
        assert_eq!(map.resolve("tech"), Some(Category::Technology));
        assert_eq!(map.resolve("Sport"), Some(Category::Sports));
        assert_eq!(map.resolve("POLITICAL"), Some(Category::Politics));
    }

    #[test]
    fn unmapped_label_falls_back_to_title_case() {
        let map = LabelMap::empty();
        assert_eq!(map.resolve("FINANCE"), Some(Category::Finance));
        assert_eq!(map.resolve("lifestyle"), Some(Category::Lifestyle));
        assert_eq!(map.resolve("weather"), None);
    }

    #[test]
    fn from_json_rejects_unknown_targets() {
        let err = LabelMap::from_json(r#"{"footy": "Sports", "wx": "Weather"}"#).unwrap_err();
        assert_eq!(
            err,
            CategoryError::UnknownAliasTarget {
                alias: "wx".into(),
                target: "Weather".into()
            }
        );
    }

    #[test]
    fn from_json_lowercases_keys() {
        let map = LabelMap::from_json(r#"{"FOOTY": "sports"}"#).unwrap();
        assert_eq!(map.resolve("footy"), Some(Category::Sports));
    }

    #[test]
    fn with_aliases_overrides() {
        let map = LabelMap::default()
            .with_aliases(LabelMap::from_aliases([("tech", "Science")]).unwrap());
        assert_eq!(map.resolve("tech"), Some(Category::Science));
    }

    #[test]
    fn title_case_matches_python_semantics() {
        assert_eq!(title_case("sci-TECH news"), "Sci-Tech News");
        assert_eq!(title_case("world"), "World");
        assert_eq!(title_case(""), "");
    }
}
