//! Removal of double counting between nested n-grams.
//!
//! Within one witness, every occurrence of an n-gram also contains
//! occurrences of each of its sub-n-grams. Reduce subtracts a larger
//! n-gram's count from every one of its proper substrings (with
//! multiplicity), working from the largest size down so that the already
//! reduced count of a middle-sized n-gram is what reduces the smaller ones.

use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::error::ResultsError;
use crate::models::MatchRow;
use crate::table::MatchTable;
use crate::tokenizer::{proper_substrings, Tokenizer};

const OPERATION: &str = "reduce";

/// Remove counts already accounted for by larger n-grams.
///
/// Rows left with a count of zero or less are dropped; `size` is carried
/// over from the input.
pub fn reduce(table: MatchTable, tokenizer: &Tokenizer) -> Result<MatchTable, ResultsError> {
    if table.is_collapsed() {
        return Err(ResultsError::collapsed(OPERATION));
    }

    let mut witnesses: BTreeMap<(String, String), Vec<MatchRow>> = BTreeMap::new();
    for row in table.into_rows() {
        witnesses
            .entry((row.work.clone(), row.siglum.clone()))
            .or_default()
            .push(row);
    }

    let reduced: Vec<Vec<MatchRow>> = witnesses
        .into_par_iter()
        .map(|(_, rows)| reduce_witness(rows, tokenizer))
        .collect();

    Ok(MatchTable::new(reduced.into_iter().flatten().collect()))
}

/// Reduce the rows of a single witness.
fn reduce_witness(rows: Vec<MatchRow>, tokenizer: &Tokenizer) -> Vec<MatchRow> {
    let mut counts: Vec<i64> = rows.iter().map(|r| r.count as i64).collect();
    let tokens: Vec<Vec<String>> = rows.iter().map(|r| tokenizer.tokenize(&r.ngram)).collect();
    let position: HashMap<&[String], usize> = tokens
        .iter()
        .enumerate()
        .map(|(idx, t)| (t.as_slice(), idx))
        .collect();

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| rows[b].size.cmp(&rows[a].size));

    for idx in order {
        let count = counts[idx];
        if count <= 0 {
            continue;
        }
        for substring in proper_substrings(&tokens[idx]) {
            if let Some(&sub_idx) = position.get(substring) {
                counts[sub_idx] -= count;
            }
        }
    }

    rows.into_iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(row, count)| MatchRow {
            count: count as u64,
            ..row
        })
        .collect()
}
