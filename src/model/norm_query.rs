//! Normalized queries: the "native language" of the inverted index
//! (spec.md §3, `internal/NormQuery.hpp`).

use std::fmt;

/// One unit of a [`NormQuery`]: either a constant word or a single-token
/// wildcard, tagged with the index of the pattern unit that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NormQueryUnit {
    Word { text: String, source: usize },
    QMark { source: usize },
}

impl NormQueryUnit {
    pub fn source(&self) -> usize {
        match self {
            NormQueryUnit::Word { source, .. } => *source,
            NormQueryUnit::QMark { source } => *source,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            NormQueryUnit::Word { text, .. } => Some(text.as_str()),
            NormQueryUnit::QMark { .. } => None,
        }
    }

    pub fn is_qmark(&self) -> bool {
        matches!(self, NormQueryUnit::QMark { .. })
    }
}

impl fmt::Display for NormQueryUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormQueryUnit::Word { text, .. } => write!(f, "{}", text),
            NormQueryUnit::QMark { .. } => write!(f, "?"),
        }
    }
}

/// A flat, ordered sequence of constant words and `?` wildcards — a plain
/// query the inverted index can answer without further processing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NormQuery {
    units: Vec<NormQueryUnit>,
}

impl NormQuery {
    pub fn new(units: Vec<NormQueryUnit>) -> Self {
        NormQuery { units }
    }

    pub fn units(&self) -> &[NormQueryUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn has_wildcards(&self) -> bool {
        self.units.iter().any(NormQueryUnit::is_qmark)
    }

    /// Canonical text used as (part of) the result-cache key: `?` for
    /// wildcards, the literal word otherwise, space-separated.
    pub fn canonical_text(&self) -> String {
        self.units
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for NormQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_text())
    }
}
