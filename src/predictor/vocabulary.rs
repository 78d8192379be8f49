use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use super::error::PredictionError;
use super::SENTINEL_INDEX;

/// Bidirectional word <-> index mapping produced at training time.
///
/// Index 0 is the unknown/padding sentinel and never maps to a word.
#[derive(Debug, Clone, Default)]
pub struct VocabularyTable {
    word_to_index: HashMap<String, u32>,
    index_to_word: HashMap<u32, String>,
    index_space: usize,
}

impl VocabularyTable {
    /// Loads a flat JSON object `{ "word": index, ... }` from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PredictionError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PredictionError::resource_load(format!("Cannot read vocabulary {}: {}", path.display(), e))
        })?;

        let table = Self::from_json(&content).map_err(|e| match e {
            PredictionError::ResourceLoad(msg) => {
                PredictionError::resource_load(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        info!(
            "Loaded vocabulary from {}: {} words, index space {}",
            path.display(),
            table.len(),
            table.index_space()
        );
        Ok(table)
    }

    /// Parses the serialized mapping. Entries are applied in document order.
    pub fn from_json(json: &str) -> Result<Self, PredictionError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| PredictionError::resource_load(format!("Malformed vocabulary JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| PredictionError::resource_load("Vocabulary must be a JSON object"))?;

        let mut entries = Vec::with_capacity(object.len());
        for (word, index) in object {
            let index = index
                .as_u64()
                .and_then(|i| u32::try_from(i).ok())
                .ok_or_else(|| {
                    PredictionError::resource_load(format!(
                        "Vocabulary entry {:?} has a non-integer index: {}",
                        word, index
                    ))
                })?;
            entries.push((word.clone(), index));
        }

        Self::from_entries(entries)
    }

    /// Builds the table from `(word, index)` pairs.
    ///
    /// When two words share an index the later one owns the reverse mapping.
    pub fn from_entries<I>(entries: I) -> Result<Self, PredictionError>
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        let mut table = Self::default();
        let mut collisions = 0usize;

        for (word, index) in entries {
            if index == SENTINEL_INDEX {
                return Err(PredictionError::resource_load(format!(
                    "Word {:?} maps to the reserved index {}",
                    word, SENTINEL_INDEX
                )));
            }

            if let Some(previous) = table.index_to_word.insert(index, word.clone()) {
                if previous != word {
                    collisions += 1;
                }
            }
            table.word_to_index.insert(word, index);
            table.index_space = table.index_space.max(index as usize + 1);
        }

        if collisions > 0 {
            warn!("{} vocabulary indices are shared by several words; the last one wins", collisions);
        }

        // the sentinel is always part of the index space
        table.index_space = table.index_space.max(1);
        Ok(table)
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup_index(&self, word: &str) -> Option<u32> {
        self.word_to_index.get(word).copied()
    }

    pub fn lookup_word(&self, index: u32) -> Option<&str> {
        if index == SENTINEL_INDEX {
            return None;
        }
        self.index_to_word.get(&index).map(String::as_str)
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.word_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_to_index.is_empty()
    }

    /// Highest index + 1, i.e. the width a model over this vocabulary must have.
    pub fn index_space(&self) -> usize {
        self.index_space
    }

    /// Number of indices that resolve to a word.
    pub fn mapped_indices(&self) -> usize {
        self.index_to_word.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_inverse_lookup() {
        let vocab = VocabularyTable::from_json(r#"{"the": 1, "cat": 2, "sat": 3}"#).unwrap();

        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.index_space(), 4);
        assert_eq!(vocab.lookup_index("cat"), Some(2));
        assert_eq!(vocab.lookup_word(3), Some("sat"));
        assert_eq!(vocab.lookup_word(0), None);
        assert_eq!(vocab.lookup_word(4), None);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let vocab = VocabularyTable::from_json(r#"{"the": 1}"#).unwrap();
        assert_eq!(vocab.lookup_index("The"), None);
        assert_eq!(vocab.lookup_index(" the"), None);
    }

    #[test]
    fn test_round_trip_over_every_index() {
        let vocab = VocabularyTable::from_json(r#"{"a": 1, "b": 5, "c": 2, "d": 9}"#).unwrap();
        for index in 1..vocab.index_space() as u32 {
            if let Some(word) = vocab.lookup_word(index) {
                assert_eq!(vocab.lookup_index(word), Some(index));
            }
        }
    }

    #[test]
    fn test_duplicate_index_last_wins() {
        let vocab = VocabularyTable::from_json(r#"{"first": 1, "second": 1, "third": 2}"#).unwrap();
        assert_eq!(vocab.lookup_word(1), Some("second"));
        assert_eq!(vocab.lookup_index("first"), Some(1));
        assert_eq!(vocab.mapped_indices(), 2);
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(matches!(
            VocabularyTable::from_json(r#"["the", "cat"]"#),
            Err(PredictionError::ResourceLoad(_))
        ));
    }

    #[test]
    fn test_rejects_non_integer_values() {
        for json in [r#"{"the": "1"}"#, r#"{"the": -1}"#, r#"{"the": 1.5}"#, r#"{"the": {"x": 1}}"#] {
            assert!(
                matches!(VocabularyTable::from_json(json), Err(PredictionError::ResourceLoad(_))),
                "accepted {}",
                json
            );
        }
    }

    #[test]
    fn test_rejects_sentinel_index() {
        assert!(VocabularyTable::from_json(r#"{"<pad>": 0, "the": 1}"#).is_err());
    }

    #[test]
    fn test_empty_object_is_loadable() {
        let vocab = VocabularyTable::from_json("{}").unwrap();
        assert!(vocab.is_empty());
        assert_eq!(vocab.index_space(), 1);
    }

    #[test]
    fn test_missing_file() {
        let err = VocabularyTable::load("/definitely/not/here/word_index.json").unwrap_err();
        assert!(err.to_string().contains("Cannot read vocabulary"));
    }
}
