//! C6 — the regex vocabulary: expands a REGEX query unit's pattern into
//! the set of known words it matches (spec.md §4.1). Netspeak treats this
//! as an external collaborator — no source for it was retrieved, only its
//! use from the normalizer — so this module defines the trait such a
//! collaborator implements plus a small `fst`-backed reference
//! implementation good enough to exercise it in tests.

use fst::{IntoStreamer, Set, SetBuilder, Streamer};

use crate::error::{NetspeakError, Result};

/// Resolves a regex pattern (as written inside `/.../` in a query) to the
/// finite set of vocabulary words it matches, under the per-call match
/// budget the normalizer passes through from the search options
/// (spec.md §4.1's `max_regex_matches`).
pub trait RegexVocabulary {
    fn expand(&self, pattern: &str, max_matches: usize) -> Result<Vec<String>>;
}

/// A vocabulary held as a sorted `fst::Set`, searched with `fst`'s own
/// `fst::Automaton`-driven regex automaton instead of a Levenshtein one.
pub struct FstRegexVocabulary<D> {
    words: Set<D>,
}

impl<D: AsRef<[u8]>> FstRegexVocabulary<D> {
    fn from_parts(words: Set<D>) -> Self {
        FstRegexVocabulary { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<D: AsRef<[u8]>> RegexVocabulary for FstRegexVocabulary<D> {
    fn expand(&self, pattern: &str, max_matches: usize) -> Result<Vec<String>> {
        // `fst::Regex` only supports a subset of standard regex syntax, so
        // validate against the general-purpose engine first to turn a
        // malformed pattern into a proper error instead of a panic deep in
        // `fst`.
        regex::Regex::new(pattern).map_err(|e| NetspeakError::InvalidPattern(e.to_string()))?;
        let automaton = fst::Regex::new(pattern)
            .map_err(|e| NetspeakError::InvalidPattern(e.to_string()))?;

        let mut stream = self.words.search(&automaton).into_stream();
        let mut matches = Vec::new();
        while let Some(word) = stream.next() {
            if matches.len() >= max_matches {
                break;
            }
            matches.push(String::from_utf8_lossy(word).into_owned());
        }
        Ok(matches)
    }
}

impl FstRegexVocabulary<Vec<u8>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let words = Set::from_bytes(bytes)?;
        Ok(FstRegexVocabulary::from_parts(words))
    }
}

#[cfg(feature = "mmap")]
impl FstRegexVocabulary<memmap::Mmap> {
    pub unsafe fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let words = Set::from_path(path)?;
        log::info!("opened regex vocabulary at {}", path.display());
        Ok(FstRegexVocabulary::from_parts(words))
    }
}

/// Builds an [`FstRegexVocabulary`] from words inserted in ascending order.
pub struct FstRegexVocabularyBuilder {
    builder: SetBuilder<Vec<u8>>,
}

impl FstRegexVocabularyBuilder {
    pub fn new() -> Self {
        FstRegexVocabularyBuilder { builder: SetBuilder::memory() }
    }

    pub fn insert(&mut self, word: &str) -> Result<()> {
        self.builder
            .insert(word)
            .map_err(|e| NetspeakError::CorruptIndex(format!("duplicate or out-of-order word '{}': {}", word, e)))
    }

    pub fn finish(self) -> Result<FstRegexVocabulary<Vec<u8>>> {
        let bytes = self.builder.into_inner()?;
        FstRegexVocabulary::from_bytes(bytes)
    }
}

impl Default for FstRegexVocabularyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary(words: &[&str]) -> FstRegexVocabulary<Vec<u8>> {
        let mut sorted = words.to_vec();
        sorted.sort_unstable();
        let mut builder = FstRegexVocabularyBuilder::new();
        for word in sorted {
            builder.insert(word).unwrap();
        }
        builder.finish().unwrap()
    }

    #[test]
    fn expands_matching_words_only() {
        let vocab = vocabulary(&["cat", "car", "dog", "cart"]);
        let mut matches = vocab.expand("ca.*", 100).unwrap();
        matches.sort();
        assert_eq!(matches, vec!["car".to_string(), "cart".to_string(), "cat".to_string()]);
    }

    #[test]
    fn respects_max_matches_budget() {
        let vocab = vocabulary(&["cat", "car", "cart"]);
        let matches = vocab.expand("ca.*", 1).unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let vocab = vocabulary(&["cat"]);
        assert!(matches!(vocab.expand("((", 10), Err(NetspeakError::InvalidPattern(_))));
    }
}
