//! Extension of the highest-degree n-grams to maximal spans of text.
//!
//! For each witness the largest n-grams of the table are chained together
//! wherever one's trailing `n - 1` tokens equal another's leading `n - 1`
//! tokens and the chained sequence occurs in the witness. The maximal
//! chains are then laid over the witness text, longest first, each
//! occurrence claiming its token span so that no stretch of text is
//! counted twice. Every intermediate n-gram inside a claimed occurrence
//! becomes a new match row.

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::corpus::{Corpus, CorpusError};
use crate::error::ResultsError;
use crate::filter::retain_attested_by;
use crate::models::{MatchRow, ResultsKind};
use crate::observe::{Event, Observer};
use crate::table::{check_sizes, MatchTable};
use crate::tokenizer::{count_ngrams, Tokenizer};

const OPERATION: &str = "extend";

/// A token sequence known to occur in the witness, with every start
/// position at which it does.
#[derive(Debug, Clone)]
struct Candidate {
    tokens: Vec<String>,
    positions: Vec<usize>,
}

/// Token positions of a witness already claimed by an occurrence.
#[derive(Debug)]
pub(crate) struct ClaimedSpans {
    claimed: Vec<bool>,
}

impl ClaimedSpans {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            claimed: vec![false; len],
        }
    }

    pub(crate) fn is_free(&self, start: usize, len: usize) -> bool {
        match self.claimed.get(start..start + len) {
            Some(span) => span.iter().all(|&c| !c),
            None => false,
        }
    }

    pub(crate) fn claim(&mut self, start: usize, len: usize) {
        for slot in &mut self.claimed[start..start + len] {
            *slot = true;
        }
    }
}

/// Add rows for every longer n-gram that the table's largest n-grams
/// extend to in their witnesses.
///
/// Intersect results have the new rows reciprocally removed before
/// they are merged, since an extension need not be shared by every label
/// of the table.
pub fn extend(
    mut table: MatchTable,
    corpus: &Corpus,
    tokenizer: &Tokenizer,
    kind: ResultsKind,
    observer: &dyn Observer,
) -> Result<MatchTable, ResultsError> {
    if table.is_collapsed() {
        return Err(ResultsError::collapsed(OPERATION));
    }
    let Some(highest_n) = table.max_size() else {
        return Ok(table);
    };
    if highest_n < 2 {
        observer.on_event(&Event::Warning {
            operation: OPERATION,
            message: "Extending results that contain only 1-grams is unsupported; \
                      the original results will be used"
                .to_string(),
        });
        return Ok(table);
    }

    // Only the largest n-grams seed extension; each must really be that long.
    check_sizes(
        table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.size == highest_n),
        tokenizer,
    )?;
    let mut groups: BTreeMap<(&str, &str, &str), Vec<&str>> = BTreeMap::new();
    for row in table.rows().iter().filter(|r| r.size == highest_n) {
        groups
            .entry((row.work.as_str(), row.siglum.as_str(), row.label.as_str()))
            .or_default()
            .push(row.ngram.as_str());
    }
    let groups: Vec<_> = groups.into_iter().collect();
    let total = groups.len();
    let done = AtomicUsize::new(0);

    let extended: Vec<Vec<MatchRow>> = groups
        .par_iter()
        .map(|((work, siglum, label), ngrams)| {
            let witness = corpus.get_witness(work, siglum)?;
            let bases: Vec<Vec<String>> = ngrams.iter().map(|n| tokenizer.tokenize(n)).collect();
            let maximal = extended_ngrams(&bases, &witness.tokens, highest_n);
            let rows: Vec<MatchRow> = intermediate_counts(&maximal, &witness.tokens, highest_n)
                .into_iter()
                .map(|((size, tokens), count)| {
                    MatchRow::new(tokenizer.join(&tokens), size, *work, *siglum, *label, count)
                })
                .collect();

            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            observer.on_event(&Event::Progress {
                operation: OPERATION,
                done: finished,
                total,
            });
            Ok::<_, CorpusError>(rows)
        })
        .collect::<Result<_, _>>()?;

    let mut extended = MatchTable::new(extended.into_iter().flatten().collect());
    observer.on_event(&Event::Note {
        operation: OPERATION,
        message: format!("Generated {} extended rows", extended.len()),
    });
    if kind == ResultsKind::Intersect {
        extended = retain_attested_by(extended, table.labels().len());
    }

    table.extend_rows(extended.into_rows());
    Ok(table)
}

/// The maximal extensions of `bases` (all of size `n`) that occur in
/// `text`, longest first.
fn extended_ngrams(bases: &[Vec<String>], text: &[String], n: usize) -> Vec<Candidate> {
    let overlap = n - 1;
    let base_set: HashSet<&[String]> = bases.iter().map(Vec::as_slice).collect();

    let mut positions: HashMap<&[String], Vec<usize>> = HashMap::new();
    for (start, window) in text.windows(n).enumerate() {
        if base_set.contains(window) {
            positions.entry(window).or_default().push(start);
        }
    }

    // Leading n - 1 tokens of each base -> the token that follows them.
    let mut index: HashMap<&[String], BTreeSet<&String>> = HashMap::new();
    for base in bases {
        index.entry(&base[..overlap]).or_default().insert(&base[overlap]);
    }

    let mut maximal: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    let mut working: Vec<Candidate> = Vec::new();
    for base in base_set {
        let candidate = Candidate {
            tokens: base.to_vec(),
            positions: positions.get(base).cloned().unwrap_or_default(),
        };
        maximal.insert(candidate.tokens.clone(), candidate.positions.clone());
        working.push(candidate);
    }

    while !working.is_empty() {
        let mut next_working = Vec::new();
        for base in &working {
            let len = base.tokens.len();
            let Some(next_tokens) = index.get(&base.tokens[len - overlap..]) else {
                continue;
            };
            let mut extended = false;
            for &next_token in next_tokens {
                let found: Vec<usize> = base
                    .positions
                    .iter()
                    .copied()
                    .filter(|&p| text.get(p + len) == Some(next_token))
                    .collect();
                if found.is_empty() {
                    continue;
                }
                let mut tokens = base.tokens.clone();
                tokens.push(next_token.clone());
                maximal.insert(tokens.clone(), found.clone());
                next_working.push(Candidate {
                    tokens,
                    positions: found,
                });
                extended = true;
            }
            if extended {
                maximal.remove(&base.tokens);
            }
        }
        working = next_working;
    }

    let mut maximal: Vec<Candidate> = maximal
        .into_iter()
        .map(|(tokens, positions)| Candidate { tokens, positions })
        .collect();
    maximal.sort_by(|a, b| {
        b.tokens
            .len()
            .cmp(&a.tokens.len())
            .then_with(|| a.tokens.cmp(&b.tokens))
    });
    maximal
}

/// Count, for every n-gram of size `n + 1` and up inside the realized
/// occurrences of `maximal`, how often it occurs.
///
/// Occurrences are claimed longest first and left to right; an
/// occurrence touching text already claimed is not realized.
fn intermediate_counts(
    maximal: &[Candidate],
    text: &[String],
    n: usize,
) -> BTreeMap<(usize, Vec<String>), u64> {
    let mut spans = ClaimedSpans::new(text.len());
    let mut counts: BTreeMap<(usize, Vec<String>), u64> = BTreeMap::new();

    for candidate in maximal {
        let len = candidate.tokens.len();
        let mut realized = 0u64;
        for &start in &candidate.positions {
            if spans.is_free(start, len) {
                spans.claim(start, len);
                realized += 1;
            }
        }
        if realized == 0 || len <= n {
            continue;
        }
        for size in n + 1..=len {
            for (window, count) in count_ngrams(&candidate.tokens, size) {
                *counts.entry((size, window.to_vec())).or_insert(0) += count * realized;
            }
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Witness;
    use crate::observe::{NullObserver, RecordingObserver};
    use crate::table::TableError;

    fn pagel() -> Tokenizer {
        Tokenizer::pagel()
    }

    fn corpus(witnesses: &[(&str, &str, &str)]) -> Corpus {
        Corpus::from_witnesses(witnesses.iter().map(|(work, siglum, text)| Witness {
            work: work.to_string(),
            siglum: siglum.to_string(),
            tokens: pagel().tokenize(text),
        }))
    }

    fn toks(text: &str) -> Vec<String> {
        pagel().tokenize(text)
    }

    fn find<'a>(table: &'a MatchTable, ngram: &str, work: &str) -> Option<&'a MatchRow> {
        table
            .rows()
            .iter()
            .find(|r| r.ngram == ngram && r.work == work)
    }

    #[test]
    fn test_claimed_spans() {
        let mut spans = ClaimedSpans::new(5);
        assert!(spans.is_free(0, 5));
        spans.claim(1, 2);
        assert!(!spans.is_free(0, 2));
        assert!(spans.is_free(3, 2));
        assert!(!spans.is_free(4, 2));
    }

    #[test]
    fn test_extended_ngrams_chain() {
        let text = toks("a b c d e");
        let bases = vec![toks("a b c"), toks("b c d"), toks("c d e")];
        let maximal = extended_ngrams(&bases, &text, 3);
        let tokens: Vec<Vec<String>> = maximal.iter().map(|c| c.tokens.clone()).collect();
        assert_eq!(tokens, vec![toks("a b c d e"), toks("b c d e"), toks("c d e")]);
    }

    #[test]
    fn test_extension_must_occur_in_text() {
        // "a b" and "b c" overlap but "a b c" never occurs.
        let text = toks("a b x b c");
        let bases = vec![toks("a b"), toks("b c")];
        let maximal = extended_ngrams(&bases, &text, 2);
        assert_eq!(maximal.len(), 2);
        assert!(maximal.iter().all(|c| c.tokens.len() == 2));
    }

    #[test]
    fn test_longer_occurrence_claims_text_first() {
        let text = toks("a b c d e");
        let bases = vec![toks("a b c"), toks("b c d"), toks("c d e")];
        let maximal = extended_ngrams(&bases, &text, 3);
        let counts = intermediate_counts(&maximal, &text, 3);
        // Only "a b c d e" is realized; its 4- and 5-grams are counted once.
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[&(5, toks("a b c d e"))], 1);
        assert_eq!(counts[&(4, toks("a b c d"))], 1);
        assert_eq!(counts[&(4, toks("b c d e"))], 1);
    }

    #[test]
    fn test_extend_scenario_quadgram() {
        let corpus = corpus(&[("W1", "base", "a b c d")]);
        let table = MatchTable::new(vec![
            MatchRow::new("a b c", 3, "W1", "base", "A", 1),
            MatchRow::new("b c d", 3, "W1", "base", "A", 1),
        ]);
        let extended =
            extend(table, &corpus, &pagel(), ResultsKind::Difference, &NullObserver).unwrap();
        assert_eq!(extended.len(), 3);
        let row = find(&extended, "a b c d", "W1").unwrap();
        assert_eq!((row.size, row.count, row.label.as_str()), (4, 1, "A"));
    }

    #[test]
    fn test_extend_counts_repeated_passages() {
        let corpus = corpus(&[("W1", "base", "a b c x a b c y a b")]);
        let table = MatchTable::new(vec![
            MatchRow::new("a b", 2, "W1", "base", "A", 3),
            MatchRow::new("b c", 2, "W1", "base", "A", 2),
        ]);
        let extended =
            extend(table, &corpus, &pagel(), ResultsKind::Difference, &NullObserver).unwrap();
        assert_eq!(find(&extended, "a b c", "W1").unwrap().count, 2);
        assert_eq!(extended.len(), 3);
    }

    #[test]
    fn test_extend_rows_occur_in_witness() {
        let corpus = corpus(&[
            ("W1", "base", "p q r s t u"),
            ("W2", "base", "q r s z p q r"),
        ]);
        let table = MatchTable::new(vec![
            MatchRow::new("p q", 2, "W1", "base", "A", 1),
            MatchRow::new("q r", 2, "W1", "base", "A", 1),
            MatchRow::new("r s", 2, "W1", "base", "A", 1),
            MatchRow::new("p q", 2, "W2", "base", "B", 1),
            MatchRow::new("q r", 2, "W2", "base", "B", 2),
            MatchRow::new("r s", 2, "W2", "base", "B", 1),
        ]);
        let extended =
            extend(table, &corpus, &pagel(), ResultsKind::Difference, &NullObserver).unwrap();
        for row in extended.rows().iter().filter(|r| r.size > 2) {
            let text = pagel().join(&corpus.get_witness(&row.work, &row.siglum).unwrap().tokens);
            assert!(text.contains(&row.ngram), "{} not in {}", row.ngram, row.work);
        }
        assert_eq!(find(&extended, "p q r s", "W1").unwrap().count, 1);
        assert_eq!(find(&extended, "q r s", "W2").unwrap().count, 1);
        assert_eq!(find(&extended, "p q r", "W2").unwrap().count, 1);
    }

    #[test]
    fn test_extend_intersect_removes_unshared_extensions() {
        let corpus = corpus(&[("W1", "base", "a b c"), ("W2", "base", "a b z b c")]);
        let table = MatchTable::new(vec![
            MatchRow::new("a b", 2, "W1", "base", "A", 1),
            MatchRow::new("b c", 2, "W1", "base", "A", 1),
            MatchRow::new("a b", 2, "W2", "base", "B", 1),
            MatchRow::new("b c", 2, "W2", "base", "B", 1),
        ]);
        let intersect = extend(
            table.clone(),
            &corpus,
            &pagel(),
            ResultsKind::Intersect,
            &NullObserver,
        )
        .unwrap();
        assert_eq!(intersect.len(), 4);

        let difference =
            extend(table, &corpus, &pagel(), ResultsKind::Difference, &NullObserver).unwrap();
        assert!(find(&difference, "a b c", "W1").is_some());
    }

    #[test]
    fn test_extend_unigrams_warns_and_returns_input() {
        let corpus = corpus(&[("W1", "base", "a b")]);
        let table = MatchTable::new(vec![MatchRow::new("a", 1, "W1", "base", "A", 1)]);
        let observer = RecordingObserver::new();
        let extended = extend(
            table.clone(),
            &corpus,
            &pagel(),
            ResultsKind::Difference,
            &observer,
        )
        .unwrap();
        assert_eq!(extended, table);
        assert_eq!(observer.warnings().len(), 1);
    }

    #[test]
    fn test_extend_empty_table() {
        let extended = extend(
            MatchTable::default(),
            &Corpus::default(),
            &pagel(),
            ResultsKind::Difference,
            &NullObserver,
        )
        .unwrap();
        assert!(extended.is_empty());
    }

    #[test]
    fn test_extend_unknown_witness_is_error() {
        let corpus = corpus(&[("W1", "base", "a b c")]);
        let table = MatchTable::new(vec![MatchRow::new("a b", 2, "W9", "base", "A", 1)]);
        let err =
            extend(table, &corpus, &pagel(), ResultsKind::Difference, &NullObserver).unwrap_err();
        assert!(matches!(
            err,
            ResultsError::Corpus(CorpusError::WitnessNotFound { .. })
        ));
    }

    #[test]
    fn test_extend_rejects_collapsed_table() {
        let table = MatchTable::with_collapsed(
            vec![MatchRow::new("a b", 2, "W1", "x y", "A", 1)],
            true,
        );
        let err = extend(
            table,
            &Corpus::default(),
            &pagel(),
            ResultsKind::Difference,
            &NullObserver,
        )
        .unwrap_err();
        assert!(matches!(err, ResultsError::Precondition(_)));
    }

    #[test]
    fn test_extend_rejects_row_shorter_than_its_size() {
        let corpus = corpus(&[("W1", "base", "a b c")]);
        let table = MatchTable::new(vec![
            MatchRow::new("a b", 2, "W1", "base", "A", 1),
            MatchRow::new("c", 2, "W1", "base", "A", 1),
        ]);
        let err =
            extend(table, &corpus, &pagel(), ResultsKind::Difference, &NullObserver).unwrap_err();
        assert!(matches!(
            err,
            ResultsError::Table(TableError::RowSizeMismatch {
                row: 2,
                declared: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_extend_rejects_row_longer_than_its_size() {
        let corpus = corpus(&[("W1", "base", "a b c")]);
        let table = MatchTable::new(vec![MatchRow::new("a b c", 2, "W1", "base", "A", 1)]);
        let err =
            extend(table, &corpus, &pagel(), ResultsKind::Difference, &NullObserver).unwrap_err();
        assert!(matches!(
            err,
            ResultsError::Table(TableError::RowSizeMismatch { actual: 3, .. })
        ));
    }

    #[test]
    fn test_extend_reports_progress_per_finished_witness() {
        let corpus = corpus(&[("W1", "base", "a b c"), ("W2", "base", "a b c")]);
        let table = MatchTable::new(vec![
            MatchRow::new("a b", 2, "W1", "base", "A", 1),
            MatchRow::new("b c", 2, "W1", "base", "A", 1),
            MatchRow::new("a b", 2, "W2", "base", "A", 1),
            MatchRow::new("a b", 2, "W9", "base", "A", 1),
        ]);
        let observer = RecordingObserver::new();
        assert!(extend(table, &corpus, &pagel(), ResultsKind::Difference, &observer).is_err());
        let progress: Vec<(usize, usize)> = observer
            .events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Progress { done, total, .. } => Some((done, total)),
                _ => None,
            })
            .collect();
        // The missing W9 witness never counts as finished.
        assert!(progress.len() < 3);
        assert!(progress.iter().all(|&(done, total)| done <= 2 && total == 3));
    }
}
