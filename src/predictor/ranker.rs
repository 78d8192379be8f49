use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::engine::ScoreVector;
use super::vocabulary::VocabularyTable;
use super::SENTINEL_INDEX;

/// Word shown when a ranked index has no vocabulary entry
pub const UNKNOWN_WORD: &str = "Unknown";

/// A scored next-word suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub word: String,
    pub score: f32,
}

impl Candidate {
    pub fn new(word: impl Into<String>, score: f32) -> Self {
        Self { word: word.into(), score }
    }
}

/// Descending by score, then ascending by index. NaN sorts after every number.
fn by_rank(a: &(u32, f32), b: &(u32, f32)) -> Ordering {
    let by_score = match (a.1.is_nan(), b.1.is_nan()) {
        (false, false) => b.1.total_cmp(&a.1),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    };
    by_score.then(a.0.cmp(&b.0))
}

/// Picks the `k` best non-sentinel indices and resolves them to words.
pub fn rank(scores: &ScoreVector, vocabulary: &VocabularyTable, k: usize) -> Vec<Candidate> {
    let mut pairs: Vec<(u32, f32)> = scores
        .as_slice()
        .iter()
        .enumerate()
        .map(|(index, &score)| (index as u32, score))
        .filter(|&(index, _)| index != SENTINEL_INDEX)
        .collect();

    // by_rank is a total order, so partial selection gives the same prefix as a full sort
    if k < pairs.len() {
        pairs.select_nth_unstable_by(k, by_rank);
        pairs.truncate(k);
    }
    pairs.sort_unstable_by(by_rank);

    pairs
        .into_iter()
        .map(|(index, score)| {
            let word = vocabulary.lookup_word(index).unwrap_or(UNKNOWN_WORD);
            Candidate::new(word, score)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> VocabularyTable {
        VocabularyTable::from_json(r#"{"the": 1, "cat": 2, "sat": 3}"#).unwrap()
    }

    fn words(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.word.as_str()).collect()
    }

    #[test]
    fn test_sentinel_excluded_and_vocabulary_exhausted() {
        let scores = ScoreVector::from(vec![0.1, 0.9, 0.5, 0.05]);
        let ranked = rank(&scores, &vocab(), 3);
        assert_eq!(
            ranked,
            vec![
                Candidate::new("the", 0.9),
                Candidate::new("cat", 0.5),
                Candidate::new("sat", 0.05),
            ]
        );
    }

    #[test]
    fn test_top_scoring_sentinel_is_skipped() {
        let scores = ScoreVector::from(vec![0.99, 0.001, 0.004, 0.005]);
        let ranked = rank(&scores, &vocab(), 3);
        assert_eq!(words(&ranked), vec!["sat", "cat", "the"]);
    }

    #[test]
    fn test_ties_break_by_ascending_index() {
        let scores = ScoreVector::from(vec![0.0, 0.3, 0.3, 0.3]);
        let ranked = rank(&scores, &vocab(), 2);
        assert_eq!(words(&ranked), vec!["the", "cat"]);
    }

    #[test]
    fn test_never_pads_when_vocabulary_is_small() {
        let scores = ScoreVector::from(vec![0.5, 0.5]);
        let ranked = rank(&scores, &vocab(), 3);
        assert_eq!(ranked, vec![Candidate::new("the", 0.5)]);
    }

    #[test]
    fn test_unmapped_index_gets_placeholder() {
        let scores = ScoreVector::from(vec![0.0, 0.1, 0.2, 0.3, 0.9]);
        let ranked = rank(&scores, &vocab(), 1);
        assert_eq!(ranked, vec![Candidate::new(UNKNOWN_WORD, 0.9)]);
    }

    #[test]
    fn test_nan_sorts_last() {
        let scores = ScoreVector::from(vec![0.0, f32::NAN, 0.2, 0.1]);
        let ranked = rank(&scores, &vocab(), 3);
        assert_eq!(words(&ranked), vec!["cat", "sat", "the"]);
        assert!(ranked[2].score.is_nan());
    }

    #[test]
    fn test_output_is_sorted_descending() {
        let raw: Vec<f32> = (0..500).map(|i| ((i * 7919) % 503) as f32 / 503.0).collect();
        let ranked_pairs = {
            let mut pairs: Vec<(u32, f32)> = raw.iter().enumerate().skip(1).map(|(i, &s)| (i as u32, s)).collect();
            pairs.sort_by(by_rank);
            pairs.truncate(10);
            pairs
        };

        let ranked = rank(&ScoreVector::from(raw), &VocabularyTable::default(), 10);
        assert_eq!(ranked.len(), 10);
        for (candidate, (_, score)) in ranked.iter().zip(ranked_pairs.iter()) {
            assert_eq!(candidate.score, *score);
        }
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
