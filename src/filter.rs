//! Row filters: reciprocal removal, the prune family and label removal.
//!
//! All range filters are inclusive; an unset bound leaves that side open.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::models::Bounds;
use crate::observe::{Event, Observer};
use crate::table::MatchTable;

/// Keep only n-grams attested (count > 0) under every label in the table.
///
/// A kept n-gram keeps all of its rows, zero-count rows included.
pub fn reciprocal_remove(table: MatchTable) -> MatchTable {
    let required = table.labels().len();
    retain_attested_by(table, required)
}

/// Keep only n-grams with positive rows under `required` distinct labels.
pub(crate) fn retain_attested_by(mut table: MatchTable, required: usize) -> MatchTable {
    let mut attested: HashMap<&str, HashSet<&str>> = HashMap::new();
    for row in table.rows().iter().filter(|r| r.count > 0) {
        attested.entry(&row.ngram).or_default().insert(&row.label);
    }
    let keep: HashSet<String> = attested
        .into_iter()
        .filter(|(_, labels)| labels.len() == required)
        .map(|(ngram, _)| ngram.to_string())
        .collect();

    table.retain(|row| keep.contains(&row.ngram));
    table
}

/// Drop every row whose n-gram is in `ngrams`.
pub fn prune_by_ngram<S: AsRef<str>>(mut table: MatchTable, ngrams: &[S]) -> MatchTable {
    let excluded: HashSet<&str> = ngrams.iter().map(AsRef::as_ref).collect();
    table.retain(|row| !excluded.contains(row.ngram.as_str()));
    table
}

/// Keep n-grams whose total count falls within `bounds`.
///
/// The total sums, over the works bearing the n-gram, each work's highest
/// witness count, so a passage is not counted once per witness.
pub fn prune_by_ngram_count(mut table: MatchTable, bounds: Bounds) -> MatchTable {
    if bounds.is_unbounded() {
        return table;
    }
    let totals = ngram_totals(&table);
    table.retain(|row| bounds.contains(totals[row.ngram.as_str()]));
    table
}

/// Keep every row of an n-gram if any single witness row for it has a
/// count within `bounds`.
pub fn prune_by_ngram_count_per_work(mut table: MatchTable, bounds: Bounds) -> MatchTable {
    if bounds.is_unbounded() {
        return table;
    }
    let keep: HashSet<String> = table
        .rows()
        .iter()
        .filter(|r| bounds.contains(r.count))
        .map(|r| r.ngram.clone())
        .collect();
    table.retain(|row| keep.contains(&row.ngram));
    table
}

pub fn prune_by_ngram_size(mut table: MatchTable, bounds: Bounds) -> MatchTable {
    table.retain(|row| bounds.contains(row.size as u64));
    table
}

/// Keep n-grams attested (count > 0) in a number of distinct works within
/// `bounds`. Witnesses of one work count as a single work.
///
/// N-grams with no positive row at all are dropped.
pub fn prune_by_work_count(mut table: MatchTable, bounds: Bounds) -> MatchTable {
    let mut works: HashMap<&str, HashSet<&str>> = HashMap::new();
    for row in table.rows().iter().filter(|r| r.count > 0) {
        works.entry(&row.ngram).or_default().insert(&row.work);
    }
    let keep: HashSet<String> = works
        .into_iter()
        .filter(|(_, works)| bounds.contains(works.len() as u64))
        .map(|(ngram, _)| ngram.to_string())
        .collect();
    table.retain(|row| keep.contains(&row.ngram));
    table
}

/// Drop all rows under `label`.
pub fn remove_label(mut table: MatchTable, label: &str, observer: &dyn Observer) -> MatchTable {
    let before = table.len();
    table.retain(|row| row.label != label);
    observer.on_event(&Event::Note {
        operation: "remove label",
        message: format!("Removed {} rows labelled {:?}", before - table.len(), label),
    });
    table
}

/// Per n-gram, the sum over works of each work's highest witness count.
pub(crate) fn ngram_totals(table: &MatchTable) -> HashMap<String, u64> {
    let mut work_maxima: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for row in table.rows() {
        let max = work_maxima
            .entry((row.ngram.as_str(), row.work.as_str()))
            .or_insert(0);
        *max = (*max).max(row.count);
    }
    let mut totals: HashMap<String, u64> = HashMap::new();
    for ((ngram, _), max) in work_maxima {
        *totals.entry(ngram.to_string()).or_insert(0) += max;
    }
    totals
}

/// Labels with a positive row for `ngram`.
pub fn attesting_labels<'a>(table: &'a MatchTable, ngram: &str) -> BTreeSet<&'a str> {
    table
        .rows()
        .iter()
        .filter(|r| r.ngram == ngram && r.count > 0)
        .map(|r| r.label.as_str())
        .collect()
}
