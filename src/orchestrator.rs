//! C10 — the search orchestrator: drives normalization, cache lookup,
//! retrieval, and phrase materialization for one request (spec.md §4.4).
//! Grounded on `QueryProcessor.hpp`'s top-level `process` (partition by
//! wildcard-bearing-ness, merge per-normalization results, unknown-word
//! union).

use std::sync::Arc;

use crate::cache::LfuCache;
use crate::corpus::PhraseCorpus;
use crate::dictionary::PhraseDictionary;
use crate::error::Result;
use crate::hash_dictionary::SynonymDictionary;
use crate::index::inverted::InvertedIndex;
use crate::index::postlist_meta::PostlistMetaIndex;
use crate::index::IndexProperties;
use crate::model::{IndexFrequency, Phrase, PhraseId, Query, SearchOptions};
use crate::normalizer::{self, NormalizeOptions};
use crate::retrieval::{self, RawRefResult};
use crate::vocabulary::RegexVocabulary;

/// A materialized result together with which normalized query produced
/// it, preserving provenance through the merge (spec.md §4.4 step 5).
#[derive(Debug, Clone)]
pub struct RankedPhrase {
    pub phrase: Phrase,
    pub norm_query_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub phrases: Vec<RankedPhrase>,
    pub unknown_words: Vec<String>,
}

#[derive(Clone, Copy)]
struct RankedRef {
    id: PhraseId,
    frequency: IndexFrequency,
    norm_query_index: usize,
}

/// Diagnostic snapshot of the backing stores a request was served from,
/// generalizing `RetrievalStrategy3::properties()` (spec.md §4.2: "Stats
/// is diagnostics, not part of the contract") across both indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusProperties {
    pub inverted: IndexProperties,
    pub meta: IndexProperties,
}

/// Holds read-only handles onto every collaborator C10 drives, plus the
/// shared result cache. Construction is cheap (all fields are
/// references); instances are typically created once per request from
/// long-lived backing stores.
pub struct Orchestrator<'a, D1, D2, D3>
where
    D1: AsRef<[u8]>,
    D2: AsRef<[u8]>,
    D3: AsRef<[u8]>,
{
    pub dictionary: &'a PhraseDictionary<D3>,
    pub inverted: &'a InvertedIndex<D1>,
    pub meta: &'a PostlistMetaIndex<D2>,
    pub corpus: &'a PhraseCorpus,
    pub vocabulary: &'a dyn RegexVocabulary,
    pub synonyms: &'a dyn SynonymDictionary,
    pub cache: &'a LfuCache<RawRefResult>,
}

impl<'a, D1, D2, D3> Orchestrator<'a, D1, D2, D3>
where
    D1: AsRef<[u8]>,
    D2: AsRef<[u8]>,
    D3: AsRef<[u8]>,
{
    pub fn search(
        &self,
        pattern: &Query,
        normalize_options: &NormalizeOptions,
        search_options: &SearchOptions,
    ) -> Result<SearchOutcome> {
        let norm_queries = normalizer::normalize(pattern, normalize_options, self.vocabulary, self.synonyms)?;

        let mut ranked: Vec<RankedRef> = Vec::new();
        let mut direct_hits: Vec<(IndexFrequency, RankedPhrase)> = Vec::new();
        let mut unknown_words: Vec<String> = Vec::new();

        for (index, norm_query) in norm_queries.iter().enumerate() {
            // Pure-word queries can sometimes be answered directly from
            // the phrase dictionary, when it happens to carry an entry
            // for the whole n-gram, skipping C8 entirely. The dictionary's
            // id is a word-id in its own densely-assigned id space, not a
            // phrase-corpus local-id, so the phrase is built straight from
            // the normalized query's own words rather than round-tripped
            // through `corpus.read_phrase`.
            if !norm_query.has_wildcards() {
                if let Some((frequency, _word_id)) = self.dictionary.get(&norm_query.canonical_text()) {
                    let words: Vec<String> =
                        norm_query.units().iter().map(|u| u.text().expect("pure-word query").to_string()).collect();
                    let phrase = Phrase { id: PhraseId::new(norm_query.len() as u32, 0), words, frequency };
                    let sort_frequency = frequency.min(IndexFrequency::MAX as u64) as IndexFrequency;
                    direct_hits.push((sort_frequency, RankedPhrase { phrase, norm_query_index: index }));
                    continue;
                }
            }

            let fingerprint = format!("{}|{}", norm_query.canonical_text(), search_options.salient_key());
            let raw = match self.cache.find(&fingerprint) {
                Some(cached) => cached,
                None => {
                    let computed = retrieval::retrieve(norm_query, search_options, self.dictionary, self.inverted, self.meta);
                    let arc = Arc::new(computed);
                    self.cache.insert(fingerprint, arc.clone());
                    arc
                }
            };

            unknown_words.extend(raw.unknown_words.iter().cloned());
            for r in &raw.refs {
                ranked.push(RankedRef { id: r.id, frequency: r.frequency, norm_query_index: index });
            }
        }

        // Per-norm result lists are each already bounded by
        // `max_phrase_count`, so a single sort over their union reaches
        // the same end state as a streaming k-way merge would, just
        // without the intermediate heap.
        ranked.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.id.cmp(&b.id)));
        ranked.truncate(search_options.max_phrase_count);

        unknown_words.sort();
        unknown_words.dedup();

        let ids: Vec<PhraseId> = ranked.iter().map(|r| r.id).collect();
        let phrases = self.corpus.read_phrases(&ids)?;
        let mut merged: Vec<(IndexFrequency, RankedPhrase)> = phrases
            .into_iter()
            .zip(ranked.iter())
            .map(|(phrase, r)| (r.frequency, RankedPhrase { phrase, norm_query_index: r.norm_query_index }))
            .collect();
        merged.extend(direct_hits);

        // Both groups already arrive frequency-sorted internally (the
        // indexed group by `(frequency, id)`, the dictionary-shortcut
        // group by insertion order); a stable sort on frequency alone
        // merges them without needing a phrase-id to tie-break a
        // dictionary hit against an indexed one.
        merged.sort_by(|a, b| b.0.cmp(&a.0));
        merged.truncate(search_options.max_phrase_count);

        let ranked_phrases = merged.into_iter().map(|(_, phrase)| phrase).collect();

        Ok(SearchOutcome { phrases: ranked_phrases, unknown_words })
    }

    /// Size/shape diagnostics for the indices this orchestrator serves
    /// from, for monitoring/observability rather than request handling.
    pub fn properties(&self) -> CorpusProperties {
        CorpusProperties { inverted: self.inverted.properties(), meta: self.meta.properties() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PostlistEntry;
    use crate::dictionary::PhraseDictionaryBuilder;
    use crate::index::inverted::InvertedIndexBuilder;
    use crate::index::postlist_meta::PostlistMetaIndexBuilder;
    use crate::model::QueryKind;
    use crate::vocabulary::FstRegexVocabularyBuilder;

    fn corpus_with_one_phrase(length: u32, local: u32, words: &[&str], frequency: u64) -> PhraseCorpus {
        use crate::codec::PhraseRow;
        use std::collections::HashMap;
        use std::sync::Arc as StdArc;

        let mut vocabulary = HashMap::new();
        let word_ids: Vec<u32> = words
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let id = i as u32;
                vocabulary.insert(id, w.to_string());
                id
            })
            .collect();

        let row = PhraseRow { word_ids, frequency };
        let bytes = row.encode();
        // Pad so local-id `local` lands on the correct record boundary.
        let mut file_bytes = vec![0u8; bytes.len() * local as usize];
        file_bytes.extend_from_slice(&bytes);

        PhraseCorpus::from_parts(vocabulary, vec![(length, StdArc::new(file_bytes))]).unwrap()
    }

    #[test]
    fn pure_word_query_round_trips_through_the_pipeline() {
        let mut inv = InvertedIndexBuilder::new();
        inv.insert(1, 0, "hello", PostlistEntry { frequency: 42, local_id: 0 });
        let inverted = inv.finish().unwrap();
        let meta = PostlistMetaIndexBuilder::new().finish().unwrap();
        let dict = {
            let mut b = PhraseDictionaryBuilder::new();
            b.insert("hello", 42).unwrap();
            b.finish().unwrap()
        };
        let corpus = corpus_with_one_phrase(1, 0, &["hello"], 42);
        let vocabulary = FstRegexVocabularyBuilder::new().finish().unwrap();
        let synonyms = crate::hash_dictionary::HashDictionaryBuilder::new().finish().unwrap();
        let cache = LfuCache::new(16);

        let orchestrator =
            Orchestrator { dictionary: &dict, inverted: &inverted, meta: &meta, corpus: &corpus, vocabulary: &vocabulary, synonyms: &synonyms, cache: &cache };

        let pattern = Query { kind: QueryKind::Word("hello".to_string()), range: crate::model::LengthRange::exact(1) };
        let outcome = orchestrator
            .search(&pattern, &NormalizeOptions::default(), &SearchOptions::default())
            .unwrap();

        assert_eq!(outcome.phrases.len(), 1);
        assert_eq!(outcome.phrases[0].phrase.words, vec!["hello".to_string()]);
        assert_eq!(outcome.phrases[0].phrase.frequency, 42);

        let properties = orchestrator.properties();
        assert_eq!(properties.inverted.key_count, 1);
        assert_eq!(properties.inverted.record_count(), 1);
    }

    // A second dictionary entry assigns "hello" a non-zero word-id while its
    // corpus phrase still sits at local-id 0 for its length class: the
    // dictionary shortcut must never treat that word-id as a corpus local-id.
    #[test]
    fn pure_word_lookup_does_not_confuse_dictionary_id_with_corpus_local_id() {
        let mut inv = InvertedIndexBuilder::new();
        inv.insert(1, 0, "hello", PostlistEntry { frequency: 42, local_id: 0 });
        let inverted = inv.finish().unwrap();
        let meta = PostlistMetaIndexBuilder::new().finish().unwrap();
        let dict = {
            let mut b = PhraseDictionaryBuilder::new();
            // Inserted in sorted order: "apple" takes word-id 0, "hello"
            // takes word-id 1. Corpus local-id 0 for length 1 is "hello".
            b.insert("apple", 7).unwrap();
            b.insert("hello", 42).unwrap();
            b.finish().unwrap()
        };
        let corpus = corpus_with_one_phrase(1, 0, &["hello"], 42);
        let vocabulary = FstRegexVocabularyBuilder::new().finish().unwrap();
        let synonyms = crate::hash_dictionary::HashDictionaryBuilder::new().finish().unwrap();
        let cache = LfuCache::new(16);

        let orchestrator =
            Orchestrator { dictionary: &dict, inverted: &inverted, meta: &meta, corpus: &corpus, vocabulary: &vocabulary, synonyms: &synonyms, cache: &cache };

        let pattern = Query { kind: QueryKind::Word("hello".to_string()), range: crate::model::LengthRange::exact(1) };
        let outcome = orchestrator
            .search(&pattern, &NormalizeOptions::default(), &SearchOptions::default())
            .unwrap();

        assert_eq!(outcome.phrases.len(), 1);
        assert_eq!(outcome.phrases[0].phrase.words, vec!["hello".to_string()]);
        assert_eq!(outcome.phrases[0].phrase.frequency, 42);
    }
}
