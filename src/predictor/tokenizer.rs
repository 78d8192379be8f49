use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::vocabulary::VocabularyTable;
use super::SENTINEL_INDEX;

/// Everything except lowercase ASCII letters, digits and the plain space.
///
/// Matches are deleted rather than replaced, so "don't" becomes "dont" and
/// "end.Start" becomes one token.
static DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-z0-9 ]").expect("static pattern is valid")
});

/// Lowercases and deletes every disallowed character.
pub(crate) fn normalize(text: &str) -> String {
    DISALLOWED.replace_all(&text.to_lowercase(), "").into_owned()
}

/// Fixed-length model input, left-padded with the sentinel index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSequence(Vec<u32>);

impl TokenSequence {
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Turns typed text into the index sequence the model was trained on.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    vocabulary: Arc<VocabularyTable>,
    max_len: usize,
}

impl Tokenizer {
    pub fn new(vocabulary: Arc<VocabularyTable>, max_len: usize) -> Self {
        Self { vocabulary, max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Lowercases, strips disallowed characters, splits on single spaces and
    /// maps each token to its index. Empty and unknown tokens become 0.
    pub fn tokenize(&self, text: &str) -> Vec<u32> {
        normalize(text)
            .split(' ')
            .map(|token| self.vocabulary.lookup_index(token).unwrap_or(SENTINEL_INDEX))
            .collect()
    }

    /// Left-pads with zeros up to `max_len`; longer input keeps its most recent
    /// `max_len` tokens.
    pub fn pad(&self, sequence: Vec<u32>) -> TokenSequence {
        if sequence.len() >= self.max_len {
            let start = sequence.len() - self.max_len;
            return TokenSequence(sequence[start..].to_vec());
        }

        let mut padded = vec![SENTINEL_INDEX; self.max_len - sequence.len()];
        padded.extend(sequence);
        TokenSequence(padded)
    }

    pub fn encode(&self, text: &str) -> TokenSequence {
        self.pad(self.tokenize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer(max_len: usize) -> Tokenizer {
        let vocab = VocabularyTable::from_json(
            r#"{"the": 1, "cat": 2, "sat": 3, "dont": 4, "42": 5, "cafe": 6}"#,
        )
        .unwrap();
        Tokenizer::new(Arc::new(vocab), max_len)
    }

    #[test]
    fn test_lowercases_before_lookup() {
        assert_eq!(tokenizer(8).tokenize("The CAT"), vec![1, 2]);
    }

    #[test]
    fn test_strips_instead_of_replacing() {
        let t = tokenizer(8);
        assert_eq!(t.tokenize("don't"), vec![4]);
        assert_eq!(t.tokenize("cat!"), vec![2]);
        // punctuation between words glues them into one unknown token
        assert_eq!(t.tokenize("the.cat"), vec![0]);
        // the accented letter is dropped whole, leaving "caf"
        assert_eq!(t.tokenize("café"), vec![0]);
        assert_eq!(t.tokenize("42"), vec![5]);
    }

    #[test]
    fn test_consecutive_spaces_yield_unknown_tokens() {
        assert_eq!(tokenizer(8).tokenize("the  cat"), vec![1, 0, 2]);
        assert_eq!(tokenizer(8).tokenize("the cat "), vec![1, 2, 0]);
    }

    #[test]
    fn test_tabs_and_newlines_are_stripped() {
        assert_eq!(tokenizer(8).tokenize("the\tcat"), vec![0]);
        assert_eq!(tokenizer(8).tokenize("the\n"), vec![1]);
    }

    #[test]
    fn test_empty_text_is_one_unknown_token() {
        let t = tokenizer(8);
        assert_eq!(t.tokenize(""), vec![0]);
        assert_eq!(t.encode("").as_slice(), &[0; 8]);
    }

    #[test]
    fn test_pad_left_fills_with_sentinel() {
        let seq = tokenizer(5).encode("the cat sat");
        assert_eq!(seq.as_slice(), &[0, 0, 1, 2, 3]);
    }

    #[test]
    fn test_pad_exact_length_is_untouched() {
        let seq = tokenizer(3).encode("the cat sat");
        assert_eq!(seq.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_pad_keeps_most_recent_tokens() {
        let seq = tokenizer(2).encode("the cat sat");
        assert_eq!(seq.as_slice(), &[2, 3]);
    }
}
