use thiserror::Error;

/// The typed error surface of the core pipeline (spec §7).
///
/// Everything below the search orchestrator returns one of these instead of
/// raising; the orchestrator is the sole place that turns the fatal
/// variants into an RPC-facing [`crate::service::SearchError`].
#[derive(Debug, Error)]
pub enum NetspeakError {
    /// The query AST handed to the normalizer was malformed.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// Every expansion of a pattern would have exceeded `max_norm_queries`
    /// before a single complete normalized query was produced.
    #[error("normalization overflow: {0}")]
    ExpansionOverflow(String),

    /// A retrieval unit's key had no postlist. Collected per-result, never
    /// fatal on its own; surfaced here only when callers choose to treat it
    /// as an error (e.g. required-term checks).
    #[error("unknown word: {0}")]
    UnknownWord(String),

    /// A corpus, index, or dictionary record was structurally invalid
    /// (e.g. a word-id with no vocabulary entry). Fatal for the request.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    /// Two backends behind the load-balancing proxy claimed the same
    /// corpus key with different name/language.
    #[error("incompatible corpora for key {key}: {a} != {b}")]
    IncompatibleCorpora {
        key: String,
        a: String,
        b: String,
    },

    /// A `Search` request named a corpus no configured backend serves.
    #[error("invalid corpus: {0}")]
    InvalidCorpus(String),

    /// I/O failure opening or reading a memory-mapped file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk finite-state transducer backing a dictionary or
    /// vocabulary was malformed.
    #[error("fst error: {0}")]
    Fst(#[from] fst::Error),
}

pub type Result<T> = std::result::Result<T, NetspeakError>;
