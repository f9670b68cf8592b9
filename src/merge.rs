//! Aggregation and presentation transforms.
//!
//! These run at the end of a processing plan: they add the label count
//! column, fold witnesses of a work into one row per count, and put the
//! table into its canonical order.

use std::collections::{BTreeMap, HashMap};

use crate::error::ResultsError;
use crate::models::MatchRow;
use crate::table::MatchTable;

/// Set `label_count` on every row: for the row's (label, ngram), the sum
/// over works of each work's highest witness count.
pub fn add_label_count(table: MatchTable) -> MatchTable {
    let collapsed = table.is_collapsed();
    let mut work_maxima: BTreeMap<(&str, &str, &str), u64> = BTreeMap::new();
    for row in table.rows() {
        let max = work_maxima
            .entry((row.label.as_str(), row.ngram.as_str(), row.work.as_str()))
            .or_insert(0);
        *max = (*max).max(row.count);
    }

    let mut totals: HashMap<(String, String), u64> = HashMap::new();
    for ((label, ngram, _), max) in work_maxima {
        *totals
            .entry((label.to_string(), ngram.to_string()))
            .or_insert(0) += max;
    }

    let rows = table
        .into_rows()
        .into_iter()
        .map(|row| {
            let total = totals
                .get(&(row.label.clone(), row.ngram.clone()))
                .copied()
                .unwrap_or(0);
            MatchRow {
                label_count: Some(total),
                ..row
            }
        })
        .collect();
    MatchTable::with_collapsed(rows, collapsed)
}

/// Merge rows sharing (work, ngram, count) into one row whose siglum is
/// the sorted, space-separated list of their sigla.
///
/// A siglum containing a space is wrapped in double quotes in the list.
/// Group order follows first appearance. The result is marked collapsed,
/// so per-witness operations refuse it afterwards.
pub fn collapse_witnesses(table: MatchTable) -> Result<MatchTable, ResultsError> {
    if table.is_collapsed() {
        return Err(ResultsError::Precondition(
            "witnesses have already been collapsed".to_string(),
        ));
    }

    let mut index: HashMap<(String, String, u64), usize> = HashMap::new();
    let mut groups: Vec<(MatchRow, Vec<String>)> = Vec::new();
    for row in table.into_rows() {
        let key = (row.work.clone(), row.ngram.clone(), row.count);
        let siglum = quote_siglum(&row.siglum);
        match index.get(&key) {
            Some(&idx) => groups[idx].1.push(siglum),
            None => {
                index.insert(key, groups.len());
                groups.push((row, vec![siglum]));
            }
        }
    }

    let rows = groups
        .into_iter()
        .map(|(first, mut sigla)| {
            sigla.sort();
            MatchRow {
                siglum: sigla.join(" "),
                ..first
            }
        })
        .collect();
    Ok(MatchTable::with_collapsed(rows, true))
}

fn quote_siglum(siglum: &str) -> String {
    if siglum.contains(' ') {
        format!("\"{siglum}\"")
    } else {
        siglum.to_string()
    }
}

/// Put rows into canonical order: size descending, n-gram ascending,
/// count descending, then label, work and siglum ascending.
pub fn sort(table: MatchTable) -> MatchTable {
    let collapsed = table.is_collapsed();
    let mut rows = table.into_rows();
    rows.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.ngram.cmp(&b.ngram))
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.work.cmp(&b.work))
            .then_with(|| a.siglum.cmp(&b.siglum))
    });
    MatchTable::with_collapsed(rows, collapsed)
}
