//! C7 — the query normalizer: expands a parsed pattern into a bounded,
//! deterministic set of [`NormQuery`] sequences (spec.md §4.1).
//!
//! The original normalizer body was incomplete in the retrieved source
//! (`QueryNormalizer.cpp` stops short of implementing `STAR`/`PLUS`), so
//! this evaluates the algebra described in prose: every node type maps to
//! a set of unit sequences, built bottom-up, with `CONCAT` as cross
//! product and `ALTERNATION` as union.

use itertools::Itertools;

use crate::error::{NetspeakError, Result};
use crate::hash_dictionary::SynonymDictionary;
use crate::model::norm_query::{NormQuery, NormQueryUnit};
use crate::model::query::{Query, QueryKind};
use crate::model::length_range::LengthRange;
use crate::vocabulary::RegexVocabulary;

/// Per-normalization-call budgets (spec.md §4.1).
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub max_norm_queries: usize,
    pub max_regex_matches: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions { max_norm_queries: 1000, max_regex_matches: 1000 }
    }
}

type Sequence = Vec<NormQueryUnit>;

/// Expands `pattern` into its bounded set of normalized queries.
pub fn normalize(
    pattern: &Query,
    options: &NormalizeOptions,
    vocabulary: &dyn RegexVocabulary,
    synonyms: &dyn SynonymDictionary,
) -> Result<Vec<NormQuery>> {
    let mut next_source = 0usize;
    let sequences = eval(pattern, options, vocabulary, synonyms, &mut next_source)?;

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(sequences.len());
    for seq in sequences {
        let query = NormQuery::new(seq);
        if seen.insert(query.clone()) {
            out.push(query);
        }
    }

    if out.is_empty() && options.max_norm_queries == 0 && pattern.range != LengthRange::EMPTY {
        return Err(NetspeakError::ExpansionOverflow(
            "max_norm_queries of 0 leaves no room for any normalized query".into(),
        ));
    }
    Ok(out)
}

fn next_id(counter: &mut usize) -> usize {
    let id = *counter;
    *counter += 1;
    id
}

fn dedup_preserve_order(words: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    words.retain(|w| seen.insert(w.clone()));
}

/// Cross product of two sequence sets, capped deterministically: the full
/// product is computed, then handed through [`truncate_stable`] so CONCAT
/// and OPTIONSET permutations truncate by the same shortest-first,
/// lexicographic-tiebreak rule as ALTERNATION/ORDERSET rather than by raw
/// nested-loop iteration order.
fn cross_product(left: &[Sequence], right: &[Sequence], cap: usize) -> Vec<Sequence> {
    let mut out = Vec::new();
    for a in left {
        for b in right {
            let mut combined = a.clone();
            combined.extend(b.iter().cloned());
            out.push(combined);
        }
    }
    truncate_stable(out, cap)
}

/// Deterministic truncation (spec.md §4.1): shortest sequences first,
/// lexicographic on canonical unit text as a tiebreak, stable otherwise so
/// that equally-ranked candidates keep their left-to-right traversal
/// order.
fn truncate_stable(mut sequences: Vec<Sequence>, cap: usize) -> Vec<Sequence> {
    sequences.sort_by(|a, b| {
        a.len().cmp(&b.len()).then_with(|| canonical(a).cmp(&canonical(b)))
    });
    sequences.truncate(cap);
    sequences
}

fn canonical(seq: &Sequence) -> String {
    seq.iter().map(|u| u.to_string()).collect::<Vec<_>>().join(" ")
}

fn eval(
    node: &Query,
    options: &NormalizeOptions,
    vocabulary: &dyn RegexVocabulary,
    synonyms: &dyn SynonymDictionary,
    next_source: &mut usize,
) -> Result<Vec<Sequence>> {
    let sequences = match &node.kind {
        QueryKind::Word(text) => {
            let source = next_id(next_source);
            vec![vec![NormQueryUnit::Word { text: text.clone(), source }]]
        }
        QueryKind::QMark => {
            let source = next_id(next_source);
            vec![vec![NormQueryUnit::QMark { source }]]
        }
        QueryKind::Star | QueryKind::Plus => {
            let source = next_id(next_source);
            let max_len = if node.range.max == u32::MAX {
                options.max_norm_queries as u32
            } else {
                node.range.max
            };
            let mut sequences = Vec::new();
            let mut len = node.range.min;
            while len <= max_len && sequences.len() < options.max_norm_queries {
                sequences.push((0..len).map(|_| NormQueryUnit::QMark { source }).collect());
                len += 1;
            }
            sequences
        }
        QueryKind::Regex(pattern) => {
            let source = next_id(next_source);
            let mut words = vocabulary
                .expand(pattern, options.max_regex_matches)
                .map_err(|_| NetspeakError::InvalidPattern(format!("regex vocabulary rejected pattern '{}'", pattern)))?;
            dedup_preserve_order(&mut words);
            words
                .into_iter()
                .map(|text| vec![NormQueryUnit::Word { text, source }])
                .collect()
        }
        QueryKind::DictSet(headword) => {
            let source = next_id(next_source);
            let mut words = vec![headword.clone()];
            if let Some(extra) = synonyms.expand_synonyms(headword) {
                words.extend(extra);
            }
            dedup_preserve_order(&mut words);
            words
                .into_iter()
                .map(|text| vec![NormQueryUnit::Word { text, source }])
                .collect()
        }
        QueryKind::Concat(children) => {
            if children.is_empty() {
                return Err(NetspeakError::InvalidPattern("CONCAT node has no children".into()));
            }
            let mut acc = vec![Vec::new()];
            for child in children {
                let child_sequences = eval(child, options, vocabulary, synonyms, next_source)?;
                acc = cross_product(&acc, &child_sequences, options.max_norm_queries);
            }
            acc
        }
        QueryKind::Alternation(children) => {
            if children.is_empty() {
                return Err(NetspeakError::InvalidPattern("ALTERNATION node has no children".into()));
            }
            let mut all = Vec::new();
            for child in children {
                all.extend(eval(child, options, vocabulary, synonyms, next_source)?);
            }
            truncate_stable(all, options.max_norm_queries)
        }
        QueryKind::OptionSet(children) => {
            if children.is_empty() {
                return Err(NetspeakError::InvalidPattern("OPTIONSET node has no children".into()));
            }
            let mut child_sequences = Vec::with_capacity(children.len());
            for child in children {
                child_sequences.push(eval(child, options, vocabulary, synonyms, next_source)?);
            }
            let mut all = Vec::new();
            for perm in (0..children.len()).permutations(children.len()) {
                let mut acc = vec![Vec::new()];
                for idx in perm {
                    acc = cross_product(&acc, &child_sequences[idx], options.max_norm_queries);
                }
                all.extend(acc);
                if all.len() >= options.max_norm_queries {
                    break;
                }
            }
            truncate_stable(all, options.max_norm_queries)
        }
        QueryKind::OrderSet(children) => {
            if children.is_empty() {
                return Err(NetspeakError::InvalidPattern("ORDERSET node has no children".into()));
            }
            let mut words = Vec::with_capacity(children.len());
            for child in children {
                match &child.kind {
                    QueryKind::Word(text) => {
                        let source = next_id(next_source);
                        words.push(NormQueryUnit::Word { text: text.clone(), source });
                    }
                    _ => {
                        return Err(NetspeakError::InvalidPattern(
                            "ORDERSET children must be single words".into(),
                        ))
                    }
                }
            }
            let n = words.len();
            let mut all = Vec::new();
            for perm in (0..n).permutations(n) {
                all.push(perm.into_iter().map(|i| words[i].clone()).collect());
                if all.len() >= options.max_norm_queries {
                    break;
                }
            }
            truncate_stable(all, options.max_norm_queries)
        }
    };

    Ok(sequences.into_iter().filter(|seq| node.range.accepts(seq.len() as u32)).collect())
}
