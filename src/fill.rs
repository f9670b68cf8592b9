//! Zero fill: make non-attestation explicit.

use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

use crate::catalogue::Catalogue;
use crate::corpus::Corpus;
use crate::error::ResultsError;
use crate::models::MatchRow;
use crate::table::MatchTable;

const OPERATION: &str = "zero fill";

/// Add a count-0 row for every witness of a work that lacks a row for an
/// n-gram the work already has rows for.
///
/// Witnesses are enumerated from `corpus`; a work only receives zero rows
/// under the label `catalogue` assigns it. Works or labels the catalogue
/// does not know are left as they are. Existing rows are never changed.
pub fn zero_fill(
    mut table: MatchTable,
    corpus: &Corpus,
    catalogue: &Catalogue,
) -> Result<MatchTable, ResultsError> {
    if table.is_collapsed() {
        return Err(ResultsError::collapsed(OPERATION));
    }

    // (label, ngram, size, work) -> sigla with a row
    let mut groups: BTreeMap<(&str, &str, usize, &str), HashSet<&str>> = BTreeMap::new();
    for row in table.rows() {
        groups
            .entry((
                row.label.as_str(),
                row.ngram.as_str(),
                row.size,
                row.work.as_str(),
            ))
            .or_default()
            .insert(row.siglum.as_str());
    }

    let zero_rows: Vec<MatchRow> = groups
        .into_par_iter()
        .filter(|((label, _, _, work), _)| catalogue.label_of(work) == Some(*label))
        .flat_map_iter(|((label, ngram, size, work), present)| {
            corpus
                .get_sigla(work)
                .into_iter()
                .filter(move |siglum| !present.contains(siglum))
                .map(move |siglum| MatchRow::new(ngram, size, work, siglum, label, 0))
        })
        .collect();

    table.extend_rows(zero_rows);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Witness;

    fn witness(work: &str, siglum: &str) -> Witness {
        Witness {
            work: work.to_string(),
            siglum: siglum.to_string(),
            tokens: Vec::new(),
        }
    }

    fn fixture() -> (Corpus, Catalogue) {
        let corpus = Corpus::from_witnesses(vec![
            witness("W1", "base"),
            witness("W1", "alt"),
            witness("W1", "third"),
            witness("W2", "base"),
        ]);
        let catalogue: Catalogue = vec![("W1", "A"), ("W2", "B")].into_iter().collect();
        (corpus, catalogue)
    }

    #[test]
    fn test_zero_fill_adds_missing_witnesses() {
        let (corpus, catalogue) = fixture();
        let table = MatchTable::new(vec![MatchRow::new("x y", 2, "W1", "base", "A", 3)]);
        let filled = zero_fill(table, &corpus, &catalogue).unwrap();

        assert_eq!(filled.len(), 3);
        let mut zeros: Vec<&str> = filled
            .rows()
            .iter()
            .filter(|r| r.count == 0)
            .map(|r| r.siglum.as_str())
            .collect();
        zeros.sort();
        assert_eq!(zeros, vec!["alt", "third"]);
        assert!(filled
            .rows()
            .iter()
            .all(|r| r.size == 2 && r.label == "A" && r.work == "W1"));
    }

    #[test]
    fn test_zero_fill_keeps_existing_counts() {
        let (corpus, catalogue) = fixture();
        let table = MatchTable::new(vec![
            MatchRow::new("x", 1, "W1", "base", "A", 3),
            MatchRow::new("x", 1, "W1", "alt", "A", 1),
            MatchRow::new("x", 1, "W2", "base", "B", 2),
        ]);
        let filled = zero_fill(table.clone(), &corpus, &catalogue).unwrap();

        assert_eq!(filled.len(), 4);
        for before in table.rows() {
            let after = filled.rows().iter().find(|r| r.key() == before.key()).unwrap();
            assert_eq!(after.count, before.count);
        }
    }

    #[test]
    fn test_zero_fill_ignores_unknown_label() {
        let (corpus, catalogue) = fixture();
        // W1 is catalogued under A, so rows labelled C get no zero rows.
        let table = MatchTable::new(vec![MatchRow::new("x", 1, "W1", "base", "C", 1)]);
        let filled = zero_fill(table, &corpus, &catalogue).unwrap();
        assert_eq!(filled.len(), 1);
    }

    #[test]
    fn test_zero_fill_rejects_collapsed_table() {
        let (corpus, catalogue) = fixture();
        let table =
            MatchTable::with_collapsed(vec![MatchRow::new("x", 1, "W1", "alt base", "A", 1)], true);
        assert!(matches!(
            zero_fill(table, &corpus, &catalogue),
            Err(ResultsError::Precondition(_))
        ));
    }
}
