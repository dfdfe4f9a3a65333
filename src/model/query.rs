//! The query AST produced by the (external) parser (spec.md §3).
//!
//! Per the REDESIGN FLAGS note in spec.md §9, this is re-architected as an
//! immutable tree owned by the request rather than a graph of shared,
//! back-referencing nodes — there is no cycle in this domain.

use super::length_range::LengthRange;

/// One node of a parsed pattern, annotated with the [`LengthRange`] of
/// phrase lengths it can match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub kind: QueryKind,
    pub range: LengthRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// A literal word.
    Word(String),
    /// `?` — exactly one token, any word.
    QMark,
    /// `*` — zero or more tokens.
    Star,
    /// `+` — one or more tokens.
    Plus,
    /// A character-class regex resolved by the external vocabulary (C6).
    Regex(String),
    /// A hash-dictionary synonym set keyed by its headword.
    DictSet(String),
    /// Ordered concatenation of children.
    Concat(Vec<Query>),
    /// Unordered union of children (each an alternative).
    Alternation(Vec<Query>),
    /// `{a b c}` — unordered multiset; every permutation of children
    /// matches.
    OptionSet(Vec<Query>),
    /// A literal unordered set of single words; every permutation matches.
    OrderSet(Vec<Query>),
}

impl Query {
    pub fn word(text: impl Into<String>) -> Self {
        Query { kind: QueryKind::Word(text.into()), range: LengthRange::exact(1) }
    }

    pub fn qmark() -> Self {
        Query { kind: QueryKind::QMark, range: LengthRange::exact(1) }
    }

    pub fn star(max_residual: u32) -> Self {
        Query { kind: QueryKind::Star, range: LengthRange::bounded(0, max_residual) }
    }

    pub fn plus(max_residual: u32) -> Self {
        Query { kind: QueryKind::Plus, range: LengthRange::bounded(1, max_residual.max(1)) }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Query { kind: QueryKind::Regex(pattern.into()), range: LengthRange::exact(1) }
    }

    pub fn dictset(headword: impl Into<String>) -> Self {
        Query { kind: QueryKind::DictSet(headword.into()), range: LengthRange::exact(1) }
    }

    pub fn concat(children: Vec<Query>) -> Self {
        let range = children
            .iter()
            .fold(LengthRange::exact(0), |acc, child| acc.concat(&child.range));
        Query { kind: QueryKind::Concat(children), range }
    }

    pub fn alternation(children: Vec<Query>) -> Self {
        let range = children
            .iter()
            .fold(LengthRange::EMPTY, |acc, child| acc.union(&child.range));
        Query { kind: QueryKind::Alternation(children), range }
    }

    pub fn option_set(children: Vec<Query>) -> Self {
        let total_len = children.len() as u32;
        let inner = children
            .iter()
            .fold(LengthRange::exact(0), |acc, child| acc.concat(&child.range));
        let _ = total_len;
        Query { kind: QueryKind::OptionSet(children), range: inner }
    }

    pub fn order_set(children: Vec<Query>) -> Self {
        let range = LengthRange::exact(children.len() as u32);
        Query { kind: QueryKind::OrderSet(children), range }
    }
}
