//! C8 — jump-in retrieval: answers one normalized query against the
//! inverted index, pruned by frequency using the postlist-meta skip
//! index (spec.md §4.2). Grounded on the C++ `RetrievalStrategy3`'s
//! `search_`/`initialize_result_set`/`intersect_result_set` and
//! `QueryProcessor`'s seed/filter/swap loop.

use rustc_hash::FxHashSet;

use crate::codec::PostlistEntry;
use crate::dictionary::PhraseDictionary;
use crate::index::inverted::InvertedIndex;
use crate::index::postlist_meta::PostlistMetaIndex;
use crate::model::{IndexFrequency, NormQuery, NormQueryUnit, PhraseId, SearchOptions};

/// One retrieved phrase, still identified by its local id within its
/// length class — the caller attaches the length (`query.len()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievedRef {
    pub id: PhraseId,
    pub frequency: IndexFrequency,
}

/// Per-unit diagnostics, not part of the result contract but useful for
/// logging and for the `max_frequency`/`min_frequency` bookkeeping the
/// jump-in algorithm itself depends on.
#[derive(Debug, Clone, Default)]
pub struct UnitStats {
    pub word: String,
    pub evaluated: usize,
    pub max_frequency: Option<IndexFrequency>,
    pub min_frequency: Option<IndexFrequency>,
}

/// The result of retrieving one normalized query.
#[derive(Debug, Clone, Default)]
pub struct RawRefResult {
    pub refs: Vec<RetrievedRef>,
    pub unknown_words: Vec<String>,
    pub unit_stats: Vec<UnitStats>,
}

struct WordUnit<'a> {
    position: u32,
    word: &'a str,
    pruning: usize,
}

/// Every maximal run of consecutive `Word` units in `query`, joined by a
/// single space — the substrings whose exact frequency bounds the jump-in
/// threshold (spec.md §4.2: "for every maximal substring of consecutive
/// WORD units ... look up the exact phrase frequency").
fn maximal_word_runs(query: &NormQuery) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for unit in query.units() {
        match unit.text() {
            Some(text) => current.push(text),
            None => {
                if !current.is_empty() {
                    runs.push(current.join(" "));
                    current.clear();
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current.join(" "));
    }
    runs
}

/// The jump-in frequency threshold `J`: the minimum exact dictionary
/// frequency among the query's maximal word runs, capped by the caller's
/// `max_phrase_frequency`. Runs not found in the dictionary (any run
/// longer than one word, since the phrase dictionary only holds single
/// words today) contribute nothing to the bound.
fn jumpin_frequency<D: AsRef<[u8]>>(
    query: &NormQuery,
    dictionary: &PhraseDictionary<D>,
    cap: u64,
) -> u64 {
    let mut j = cap;
    for run in maximal_word_runs(query) {
        if let Some((freq, _)) = dictionary.get(&run) {
            j = j.min(freq);
        }
    }
    j
}

/// Materializes the window of at most `pruning` postlist entries starting
/// at `start` — the "postlist reader bounded by pruning" the C++ side
/// constructs before handing it to `initialize_result_set`/
/// `intersect_result_set`.
fn pruned_window<D: AsRef<[u8]>>(
    inverted: &InvertedIndex<D>,
    length: u32,
    position: u32,
    word: &str,
    start: usize,
    pruning: usize,
) -> Option<Vec<PostlistEntry>> {
    let postlist = inverted.postlist(length, position, word)?;
    Some(postlist.iter().skip(start).take(pruning).collect())
}

/// Seeds the result set from the first unit: scans for the first entry at
/// or below `max_phrase_frequency`, then copies everything after it
/// unconditionally (the postlist is frequency-descending, so once one
/// entry qualifies every later one does too).
fn initialize_result_set(
    window: &[PostlistEntry],
    max_phrase_frequency: u64,
    mut budget: usize,
) -> (Vec<PostlistEntry>, UnitStats) {
    let mut stats = UnitStats::default();
    let mut out = Vec::new();
    let mut idx = 0;

    while idx < window.len() && budget != 0 {
        stats.evaluated += 1;
        let entry = window[idx];
        idx += 1;
        if entry.frequency as u64 <= max_phrase_frequency {
            stats.max_frequency = Some(entry.frequency);
            out.push(entry);
            budget -= 1;
            break;
        }
    }
    while idx < window.len() && budget != 0 {
        stats.evaluated += 1;
        out.push(window[idx]);
        budget -= 1;
        idx += 1;
    }

    stats.min_frequency = out.last().map(|e| e.frequency);
    (out, stats)
}

/// Filters the result set through an earlier unit's membership set. Same
/// skip-then-copy shape as [`initialize_result_set`], but every entry
/// (in both phases) must also be present in `input`.
fn intersect_result_set(
    window: &[PostlistEntry],
    input: &FxHashSet<u32>,
    max_phrase_frequency: u64,
    mut budget: usize,
) -> (Vec<PostlistEntry>, UnitStats) {
    let mut stats = UnitStats::default();
    let mut out = Vec::new();
    let mut idx = 0;

    while idx < window.len() && budget != 0 {
        stats.evaluated += 1;
        let entry = window[idx];
        idx += 1;
        if entry.frequency as u64 <= max_phrase_frequency && input.contains(&entry.local_id) {
            stats.max_frequency = Some(entry.frequency);
            out.push(entry);
            budget -= 1;
            break;
        }
    }
    while idx < window.len() && budget != 0 {
        stats.evaluated += 1;
        let entry = window[idx];
        if input.contains(&entry.local_id) {
            out.push(entry);
            budget -= 1;
        }
        idx += 1;
    }

    stats.min_frequency = out.last().map(|e| e.frequency);
    (out, stats)
}

/// Retrieves the phrases matching one normalized query: orders the
/// constant-word units by ascending postlist size, seeds a working set
/// from the smallest, and narrows it unit by unit until only the last
/// unit's survivors remain (spec.md §4.2).
pub fn retrieve<D1, D2, D3>(
    query: &NormQuery,
    options: &SearchOptions,
    dictionary: &PhraseDictionary<D3>,
    inverted: &InvertedIndex<D1>,
    meta: &PostlistMetaIndex<D2>,
) -> RawRefResult
where
    D1: AsRef<[u8]>,
    D2: AsRef<[u8]>,
    D3: AsRef<[u8]>,
{
    let length = query.len() as u32;
    if length == 0 {
        return RawRefResult::default();
    }

    let max_phrase_frequency = jumpin_frequency(query, dictionary, options.max_phrase_frequency);

    let mut units: Vec<WordUnit> = Vec::new();
    for (i, unit) in query.units().iter().enumerate() {
        if let NormQueryUnit::Word { text, .. } = unit {
            let pruning = options.pruning_for(dictionary.is_stopword(text));
            units.push(WordUnit { position: i as u32, word: text.as_str(), pruning });
        }
    }

    // A normalized query made entirely of wildcards has no word key to
    // seed retrieval from; there is no postlist to enumerate it against.
    if units.is_empty() {
        return RawRefResult::default();
    }

    units.sort_by_key(|u| {
        let size = inverted.postlist(length, u.position, u.word).map(|p| p.len()).unwrap_or(0);
        (size, u.position)
    });

    // The existence check happens in the same ascending-postlist-size
    // order the rest of retrieval uses, so a query with several unknown
    // units always reports the one the jump-in loop would have hit first.
    let mut unknown_words = Vec::new();
    for u in &units {
        if !inverted.contains(length, u.position, u.word) {
            unknown_words.push(u.word.to_string());
            // An unknown unit makes the whole query unsatisfiable: no
            // postlist exists to intersect against it.
            return RawRefResult { refs: Vec::new(), unknown_words, unit_stats: Vec::new() };
        }
    }

    let mut unit_stats = Vec::with_capacity(units.len());
    let mut cur_max_phrase_frequency = max_phrase_frequency;

    let last = units.len() - 1;
    let first_window = pruned_window(
        inverted,
        length,
        units[0].position,
        units[0].word,
        meta.skip_to(length, units[0].position, units[0].word, threshold(max_phrase_frequency)) as usize,
        units[0].pruning,
    )
    .unwrap_or_default();

    let first_budget = if last == 0 { options.max_phrase_count } else { usize::MAX };
    let (mut entries, stats) = initialize_result_set(&first_window, max_phrase_frequency, first_budget);
    cur_max_phrase_frequency = stats.max_frequency.map(|f| f as u64).unwrap_or(0).min(cur_max_phrase_frequency);
    unit_stats.push(UnitStats { word: units[0].word.to_string(), ..stats });

    if last == 0 {
        entries.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.local_id.cmp(&b.local_id)));
        return RawRefResult {
            refs: entries.into_iter().map(|e| RetrievedRef { id: PhraseId::new(length, e.local_id), frequency: e.frequency }).collect(),
            unknown_words,
            unit_stats,
        };
    }

    let mut src_set: FxHashSet<u32> = entries.iter().map(|e| e.local_id).collect();

    for i in 1..units.len() {
        if src_set.is_empty() {
            break;
        }
        let is_last = i == last;
        let unit = &units[i];
        let window = pruned_window(
            inverted,
            length,
            unit.position,
            unit.word,
            meta.skip_to(length, unit.position, unit.word, threshold(cur_max_phrase_frequency)) as usize,
            unit.pruning,
        )
        .unwrap_or_default();

        let budget = if is_last { options.max_phrase_count } else { usize::MAX };
        let (out, stats) = intersect_result_set(&window, &src_set, cur_max_phrase_frequency, budget);
        cur_max_phrase_frequency = stats.max_frequency.map(|f| f as u64).unwrap_or(0).min(cur_max_phrase_frequency);
        unit_stats.push(UnitStats { word: unit.word.to_string(), ..stats });

        if is_last {
            let mut final_entries = out;
            final_entries.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.local_id.cmp(&b.local_id)));
            return RawRefResult {
                refs: final_entries
                    .into_iter()
                    .map(|e| RetrievedRef { id: PhraseId::new(length, e.local_id), frequency: e.frequency })
                    .collect(),
                unknown_words,
                unit_stats,
            };
        }

        src_set = out.into_iter().map(|e| e.local_id).collect();
    }

    RawRefResult { refs: Vec::new(), unknown_words, unit_stats }
}

fn threshold(max_phrase_frequency: u64) -> IndexFrequency {
    max_phrase_frequency.min(IndexFrequency::MAX as u64) as IndexFrequency
}
