//! End-to-end scenarios from spec.md §8, driving the orchestrator (C10)
//! and the load-balancing proxy (C11) the way a serving binary would,
//! entirely from in-memory fixtures.

extern crate netspeak_core;

use std::collections::HashMap;
use std::sync::Arc;

use netspeak_core::cache::LfuCache;
use netspeak_core::codec::{PhraseRow, PostlistEntry};
use netspeak_core::corpus::PhraseCorpus;
use netspeak_core::dictionary::{PhraseDictionary, PhraseDictionaryBuilder};
use netspeak_core::error::NetspeakError;
use netspeak_core::hash_dictionary::{HashDictionary, HashDictionaryBuilder};
use netspeak_core::index::inverted::{InvertedIndex, InvertedIndexBuilder};
use netspeak_core::index::postlist_meta::{PostlistMetaIndex, PostlistMetaIndexBuilder};
use netspeak_core::model::{LengthRange, Query, QueryKind, SearchOptions};
use netspeak_core::normalizer::NormalizeOptions;
use netspeak_core::orchestrator::Orchestrator;
use netspeak_core::proxy::LoadBalanceProxy;
use netspeak_core::service::{Corpus, NetspeakService, SearchRequest, SearchResult};
use netspeak_core::vocabulary::{FstRegexVocabulary, FstRegexVocabularyBuilder};

/// Builds a corpus from `(words, frequency)` pairs. Phrases of the same
/// length must be given in ascending local-id order (0, 1, 2, ...).
fn build_corpus(phrases: &[(&[&str], u64)]) -> PhraseCorpus {
    let mut vocabulary: HashMap<u32, String> = HashMap::new();
    let mut word_ids: HashMap<String, u32> = HashMap::new();
    let mut rows_by_length: HashMap<u32, Vec<u8>> = HashMap::new();

    for (words, frequency) in phrases {
        let ids: Vec<u32> = words
            .iter()
            .map(|w| {
                *word_ids.entry(w.to_string()).or_insert_with(|| {
                    let id = vocabulary.len() as u32;
                    vocabulary.insert(id, w.to_string());
                    id
                })
            })
            .collect();
        let row = PhraseRow { word_ids: ids, frequency: *frequency };
        rows_by_length.entry(words.len() as u32).or_default().extend(row.encode());
    }

    let files = rows_by_length
        .into_iter()
        .map(|(length, bytes)| (length, Arc::new(bytes) as Arc<dyn netspeak_core::storage::Bytes>))
        .collect();

    PhraseCorpus::from_parts(vocabulary, files).unwrap()
}

fn word(text: &str) -> Query {
    Query::word(text)
}

fn qmark() -> Query {
    Query::qmark()
}

fn concat(children: Vec<Query>) -> Query {
    Query::concat(children)
}

fn alternation(children: Vec<Query>) -> Query {
    Query::alternation(children)
}

struct Fixture {
    dictionary: PhraseDictionary<Vec<u8>>,
    inverted: InvertedIndex<Vec<u8>>,
    meta: PostlistMetaIndex<Vec<u8>>,
    corpus: PhraseCorpus,
    vocabulary: FstRegexVocabulary<Vec<u8>>,
    synonyms: HashDictionary<Vec<u8>>,
    cache: LfuCache<netspeak_core::retrieval::RawRefResult>,
}

impl Fixture {
    fn orchestrator(&self) -> Orchestrator<'_, Vec<u8>, Vec<u8>, Vec<u8>> {
        Orchestrator {
            dictionary: &self.dictionary,
            inverted: &self.inverted,
            meta: &self.meta,
            corpus: &self.corpus,
            vocabulary: &self.vocabulary,
            synonyms: &self.synonyms,
            cache: &self.cache,
        }
    }
}

fn empty_synonyms() -> HashDictionary<Vec<u8>> {
    HashDictionaryBuilder::new().finish().unwrap()
}

fn empty_vocabulary() -> FstRegexVocabulary<Vec<u8>> {
    FstRegexVocabularyBuilder::new().finish().unwrap()
}

// Scenario 1: pure-word lookup answered straight from the phrase dictionary.
#[test]
fn pure_word_lookup_returns_the_dictionary_entry() {
    let dictionary = {
        let mut b = PhraseDictionaryBuilder::new();
        b.insert("hello world", 42).unwrap();
        b.finish().unwrap()
    };
    let inverted = InvertedIndexBuilder::new().finish().unwrap();
    let meta = PostlistMetaIndexBuilder::new().finish().unwrap();
    let corpus = build_corpus(&[(&["hello", "world"], 42)]);
    let fixture = Fixture {
        dictionary,
        inverted,
        meta,
        corpus,
        vocabulary: empty_vocabulary(),
        synonyms: empty_synonyms(),
        cache: LfuCache::new(16),
    };

    let pattern = concat(vec![word("hello"), word("world")]);
    let outcome = fixture
        .orchestrator()
        .search(&pattern, &NormalizeOptions::default(), &SearchOptions::default())
        .unwrap();

    assert_eq!(outcome.phrases.len(), 1);
    assert_eq!(outcome.phrases[0].phrase.words, vec!["hello", "world"]);
    assert_eq!(outcome.phrases[0].phrase.frequency, 42);
}

// Scenario 2: single wildcard, capped to the two highest-frequency phrases.
#[test]
fn single_wildcard_returns_the_top_phrases_in_order() {
    let mut inv = InvertedIndexBuilder::new();
    inv.insert(2, 0, "hello", PostlistEntry { frequency: 100, local_id: 3 });
    inv.insert(2, 0, "hello", PostlistEntry { frequency: 42, local_id: 7 });
    inv.insert(2, 0, "hello", PostlistEntry { frequency: 10, local_id: 9 });
    let inverted = inv.finish().unwrap();

    let mut meta_builder = PostlistMetaIndexBuilder::new();
    meta_builder.insert_postlist(
        2,
        0,
        "hello",
        &[
            PostlistEntry { frequency: 100, local_id: 3 },
            PostlistEntry { frequency: 42, local_id: 7 },
            PostlistEntry { frequency: 10, local_id: 9 },
        ],
    );
    let meta = meta_builder.finish().unwrap();

    let dictionary = {
        let mut b = PhraseDictionaryBuilder::new();
        b.insert("hello", 1000).unwrap();
        b.finish().unwrap()
    };

    let corpus = build_corpus(&[
        (&["hello", "zero"], 0),
        (&["hello", "one"], 0),
        (&["hello", "two"], 0),
        (&["hello", "three"], 100),
        (&["hello", "four"], 0),
        (&["hello", "five"], 0),
        (&["hello", "six"], 0),
        (&["hello", "seven"], 42),
        (&["hello", "eight"], 0),
        (&["hello", "nine"], 10),
    ]);

    let fixture = Fixture {
        dictionary,
        inverted,
        meta,
        corpus,
        vocabulary: empty_vocabulary(),
        synonyms: empty_synonyms(),
        cache: LfuCache::new(16),
    };

    let pattern = concat(vec![word("hello"), qmark()]);
    let mut options = SearchOptions::default();
    options.max_phrase_count = 2;
    let outcome = fixture.orchestrator().search(&pattern, &NormalizeOptions::default(), &options).unwrap();

    assert_eq!(outcome.phrases.len(), 2);
    assert_eq!(outcome.phrases[0].phrase.words, vec!["hello", "three"]);
    assert_eq!(outcome.phrases[1].phrase.words, vec!["hello", "seven"]);
}

// Scenario 3: alternation normalizes to two length-1 queries, merged and
// de-ranked by frequency.
#[test]
fn alternation_merges_both_branches_by_frequency() {
    let mut inv = InvertedIndexBuilder::new();
    inv.insert(1, 0, "hello", PostlistEntry { frequency: 10, local_id: 0 });
    inv.insert(1, 0, "hi", PostlistEntry { frequency: 99, local_id: 1 });
    let inverted = inv.finish().unwrap();
    let meta = PostlistMetaIndexBuilder::new().finish().unwrap();
    let dictionary = PhraseDictionaryBuilder::new().finish().unwrap();
    let corpus = build_corpus(&[(&["hello"], 10), (&["hi"], 99)]);

    let fixture = Fixture {
        dictionary,
        inverted,
        meta,
        corpus,
        vocabulary: empty_vocabulary(),
        synonyms: empty_synonyms(),
        cache: LfuCache::new(16),
    };

    let pattern = alternation(vec![word("hello"), word("hi")]);
    let mut options = SearchOptions::default();
    options.max_phrase_count = 10;
    let outcome = fixture.orchestrator().search(&pattern, &NormalizeOptions::default(), &options).unwrap();

    assert_eq!(outcome.phrases.len(), 2);
    assert_eq!(outcome.phrases[0].phrase.words, vec!["hi"]);
    assert_eq!(outcome.phrases[1].phrase.words, vec!["hello"]);
}

// Scenario 4: an option set of three words normalizes to 3! = 6 ordered
// sequences of length 3.
#[test]
fn option_set_of_three_normalizes_to_six_sequences() {
    let pattern = Query {
        kind: QueryKind::OptionSet(vec![word("a"), word("b"), word("c")]),
        range: LengthRange::exact(3),
    };
    let vocabulary = empty_vocabulary();
    let synonyms = empty_synonyms();
    let norm_queries =
        netspeak_core::normalizer::normalize(&pattern, &NormalizeOptions::default(), &vocabulary, &synonyms).unwrap();

    assert_eq!(norm_queries.len(), 6);
    for q in &norm_queries {
        assert_eq!(q.len(), 3);
    }
}

// Scenario 5: an unknown word makes its normalization unsatisfiable.
#[test]
fn unknown_word_yields_empty_results_and_is_reported() {
    let inverted = InvertedIndexBuilder::new().finish().unwrap();
    let meta = PostlistMetaIndexBuilder::new().finish().unwrap();
    let dictionary = PhraseDictionaryBuilder::new().finish().unwrap();
    let corpus = build_corpus(&[]);

    let fixture = Fixture {
        dictionary,
        inverted,
        meta,
        corpus,
        vocabulary: empty_vocabulary(),
        synonyms: empty_synonyms(),
        cache: LfuCache::new(16),
    };

    let pattern = concat(vec![word("zzznotaword"), qmark()]);
    let outcome = fixture
        .orchestrator()
        .search(&pattern, &NormalizeOptions::default(), &SearchOptions::default())
        .unwrap();

    assert!(outcome.phrases.is_empty());
    assert_eq!(outcome.unknown_words, vec!["zzznotaword".to_string()]);
}

// Scenario 6: the proxy refuses to initialize when two backends disagree
// about a shared corpus key's metadata.
#[test]
fn incompatible_corpora_refuse_proxy_initialization() {
    struct StubBackend;
    impl NetspeakService for StubBackend {
        fn search(&self, _request: &SearchRequest) -> Result<SearchResult, netspeak_core::service::SearchError> {
            Ok(SearchResult::default())
        }
        fn get_corpora(&self) -> Vec<Corpus> {
            Vec::new()
        }
    }

    let a: Arc<dyn NetspeakService> = Arc::new(StubBackend);
    let b: Arc<dyn NetspeakService> = Arc::new(StubBackend);
    let en_english = Corpus { key: "en".to_string(), name: "English".to_string(), language: "en".to_string() };
    let en_german = Corpus { key: "en".to_string(), name: "Deutsch".to_string(), language: "de".to_string() };

    let result = LoadBalanceProxy::new(vec![(en_english, a), (en_german, b)]);
    assert!(matches!(result, Err(NetspeakError::IncompatibleCorpora { .. })));
}
