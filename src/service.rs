//! Wire-protocol-shaped types fronting the orchestrator (spec.md §6).
//! The RPC transport itself is out of scope; this module only fixes the
//! request/response shapes and the `NetspeakService` trait a transport
//! layer or the load-balancing proxy (C11) would call through, grounded
//! on `NetspeakService.proto`'s `Search`/`GetCorpora` pair.

use thiserror::Error;

/// `{key, name, language}` — advisory metadata beyond the opaque `key`
/// (spec.md §6 "Corpus identity").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Corpus {
    pub key: String,
    pub name: String,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub corpus: String,
    pub query: String,
    pub max_phrases: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub phrases: Vec<ResultPhrase>,
    pub unknown_words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPhrase {
    pub text: String,
    pub frequency: u64,
}

/// Error kinds a `Search` RPC can report without failing the call itself
/// (spec.md §7's `INVALID_QUERY`/`INVALID_CORPUS`/`INTERNAL` triad).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid corpus: {0}")]
    InvalidCorpus(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type SearchResponse = Result<SearchResult, SearchError>;

/// The two RPCs a Netspeak backend exposes. Implemented both by a single
/// in-process instance (orchestrator + parser) and by [`crate::proxy`]'s
/// fan-out over several such instances.
pub trait NetspeakService: Send + Sync {
    fn search(&self, request: &SearchRequest) -> SearchResponse;
    fn get_corpora(&self) -> Vec<Corpus>;
}

impl From<crate::error::NetspeakError> for SearchError {
    fn from(err: crate::error::NetspeakError) -> Self {
        use crate::error::NetspeakError::*;
        match err {
            InvalidPattern(msg) | ExpansionOverflow(msg) => SearchError::InvalidQuery(msg),
            InvalidCorpus(msg) => SearchError::InvalidCorpus(msg),
            other => SearchError::Internal(other.to_string()),
        }
    }
}
