//! Configuration key constants and path defaulting.
//!
//! Mirrors `netspeak::Configurations` from the original source: a flat
//! string-keyed map plus a set of well-known keys, with missing index/
//! dictionary paths derived from `path.to.home` and a fixed subdirectory
//! name. Parsing an on-disk config file into this map is an external
//! collaborator (spec.md §1) and is not implemented here.

use std::collections::BTreeMap;
use std::path::PathBuf;

pub type Map = BTreeMap<String, String>;

pub const PATH_TO_HOME: &str = "path.to.home";
pub const PATH_TO_PHRASE_INDEX: &str = "path.to.phrase.index";
pub const PATH_TO_PHRASE_CORPUS: &str = "path.to.phrase.corpus";
pub const PATH_TO_PHRASE_DICTIONARY: &str = "path.to.phrase.dictionary";
pub const PATH_TO_POSTLIST_INDEX: &str = "path.to.postlist.index";
pub const PATH_TO_HASH_DICTIONARY: &str = "path.to.hash.dictionary";
pub const PATH_TO_REGEX_VOCABULARY: &str = "path.to.regex.vocabulary";
pub const CACHE_CAPACITY: &str = "cache.capacity";

const DEFAULT_PHRASE_INDEX_DIR_NAME: &str = "phrase-index";
const DEFAULT_PHRASE_CORPUS_DIR_NAME: &str = "phrase-corpus";
const DEFAULT_PHRASE_DICTIONARY_DIR_NAME: &str = "phrase-dictionary";
const DEFAULT_POSTLIST_INDEX_DIR_NAME: &str = "postlist-index";
const DEFAULT_HASH_DICTIONARY_DIR_NAME: &str = "hash-dictionary";
const DEFAULT_REGEX_VOCABULARY_DIR_NAME: &str = "regex-vocabulary";

/// Resolved, absolute paths for every on-disk resource the core pipeline
/// opens at startup.
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub phrase_index: PathBuf,
    pub phrase_corpus: PathBuf,
    pub phrase_dictionary: PathBuf,
    pub postlist_index: PathBuf,
    pub hash_dictionary: PathBuf,
    pub regex_vocabulary: PathBuf,
    pub cache_capacity: usize,
}

fn resolve_one(config: &Map, key: &str, home: Option<&str>, default_dir_name: &str) -> PathBuf {
    if let Some(value) = config.get(key) {
        return PathBuf::from(value);
    }
    match home {
        Some(home) => PathBuf::from(home).join(default_dir_name),
        None => PathBuf::from(default_dir_name),
    }
}

/// Derives [`ResolvedPaths`] from a configuration map, defaulting any
/// missing path key from `path.to.home` plus its fixed subdirectory name.
pub fn resolve(config: &Map) -> ResolvedPaths {
    let home = config.get(PATH_TO_HOME).map(String::as_str);
    ResolvedPaths {
        phrase_index: resolve_one(config, PATH_TO_PHRASE_INDEX, home, DEFAULT_PHRASE_INDEX_DIR_NAME),
        phrase_corpus: resolve_one(config, PATH_TO_PHRASE_CORPUS, home, DEFAULT_PHRASE_CORPUS_DIR_NAME),
        phrase_dictionary: resolve_one(
            config,
            PATH_TO_PHRASE_DICTIONARY,
            home,
            DEFAULT_PHRASE_DICTIONARY_DIR_NAME,
        ),
        postlist_index: resolve_one(config, PATH_TO_POSTLIST_INDEX, home, DEFAULT_POSTLIST_INDEX_DIR_NAME),
        hash_dictionary: resolve_one(config, PATH_TO_HASH_DICTIONARY, home, DEFAULT_HASH_DICTIONARY_DIR_NAME),
        regex_vocabulary: resolve_one(
            config,
            PATH_TO_REGEX_VOCABULARY,
            home,
            DEFAULT_REGEX_VOCABULARY_DIR_NAME,
        ),
        cache_capacity: config
            .get(CACHE_CAPACITY)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
    }
}
