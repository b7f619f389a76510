//! Category key → platform category id lookup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Built-in mapping for the five supported item categories.
const DEFAULT_CATEGORIES: [(&str, &str); 5] = [
    ("hair", "61681e66ec485e4a0df0d476"),
    ("top", "DR_TOP_01"),
    ("bottom", "DR_PANTS_01"),
    ("dress", "DR_DRESS_01"),
    ("shoes", "SH_SHOES_01"),
];

/// Errors produced when building a [`CategoryMap`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryMapError {
    #[error("category map is empty")]
    Empty,

    #[error("category key is empty")]
    EmptyKey,

    #[error("category {0:?} maps to an empty id")]
    EmptyId(String),
}

/// Fixed lookup from category key to platform category id.
///
/// Every key maps to a non-empty id; construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct CategoryMap {
    entries: BTreeMap<String, String>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self {
            entries: DEFAULT_CATEGORIES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl CategoryMap {
    /// Builds a map from explicit entries.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, CategoryMapError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (k, v) in entries {
            let key = k.into();
            let id = v.into();
            if key.trim().is_empty() {
                return Err(CategoryMapError::EmptyKey);
            }
            if id.trim().is_empty() {
                return Err(CategoryMapError::EmptyId(key));
            }
            map.insert(key, id);
        }
        if map.is_empty() {
            return Err(CategoryMapError::Empty);
        }
        Ok(Self { entries: map })
    }

    /// Returns the platform category id for `key`, if defined.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Supported keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<BTreeMap<String, String>> for CategoryMap {
    type Error = CategoryMapError;

    fn try_from(entries: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<CategoryMap> for BTreeMap<String, String> {
    fn from(map: CategoryMap) -> Self {
        map.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_is_total_on_five_keys() {
        let map = CategoryMap::default();
        assert_eq!(map.len(), 5);
        for key in ["hair", "top", "bottom", "dress", "shoes"] {
            let id = map.resolve(key).unwrap();
            assert!(!id.is_empty(), "{key} should map to a non-empty id");
        }
        assert_eq!(map.resolve("top"), Some("DR_TOP_01"));
    }

    #[test]
    fn unknown_keys_resolve_to_none() {
        let map = CategoryMap::default();
        assert_eq!(map.resolve("hat"), None);
        assert_eq!(map.resolve(""), None);
        assert_eq!(map.resolve("TOP"), None);
    }

    #[test]
    fn from_entries_rejects_empty_values() {
        assert_eq!(
            CategoryMap::from_entries([("top", "")]),
            Err(CategoryMapError::EmptyId("top".into()))
        );
        assert_eq!(
            CategoryMap::from_entries([(" ", "X")]),
            Err(CategoryMapError::EmptyKey)
        );
        assert_eq!(
            CategoryMap::from_entries(Vec::<(String, String)>::new()),
            Err(CategoryMapError::Empty)
        );
    }

    #[test]
    fn keys_are_sorted() {
        let map = CategoryMap::default();
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["bottom", "dress", "hair", "shoes", "top"]);
    }

    #[test]
    fn deserialize_validates() {
        let ok: CategoryMap = serde_json::from_str(r#"{"hat":"HT_01"}"#).unwrap();
        assert_eq!(ok.resolve("hat"), Some("HT_01"));

        let bad = serde_json::from_str::<CategoryMap>(r#"{"hat":""}"#);
        assert!(bad.is_err());
    }
}
