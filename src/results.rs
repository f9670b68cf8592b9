//! Stateful processor that runs a processing plan over a match table.

use crate::catalogue::Catalogue;
use crate::corpus::Corpus;
use crate::error::ResultsError;
use crate::extend;
use crate::fill;
use crate::filter;
use crate::merge;
use crate::models::{Bounds, ResultsKind, ResultsParams};
use crate::observe::{Event, NullObserver, Observer};
use crate::reduce;
use crate::table::MatchTable;
use crate::tokenizer::Tokenizer;

/// A match table together with the tokenizer it was produced with.
///
/// Every method runs one transform to completion and only then replaces
/// the held table, so a failed step leaves the previous table intact.
pub struct Results<'o> {
    table: MatchTable,
    tokenizer: Tokenizer,
    observer: &'o dyn Observer,
}

impl Results<'static> {
    pub fn new(table: MatchTable, tokenizer: Tokenizer) -> Self {
        Self {
            table,
            tokenizer,
            observer: &NullObserver,
        }
    }
}

impl<'o> Results<'o> {
    /// Report transform events to `observer`.
    pub fn with_observer<'n>(self, observer: &'n dyn Observer) -> Results<'n> {
        Results {
            table: self.table,
            tokenizer: self.tokenizer,
            observer,
        }
    }

    pub fn table(&self) -> &MatchTable {
        &self.table
    }

    pub fn into_table(self) -> MatchTable {
        self.table
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Run every transform `params` switches on, in plan order.
    pub fn process(
        &mut self,
        params: &ResultsParams,
        corpus: Option<&Corpus>,
        catalogue: Option<&Catalogue>,
    ) -> Result<(), ResultsError> {
        let corpus = match corpus {
            Some(corpus) => Some(corpus),
            None if params.needs_corpus() => {
                return Err(ResultsError::Precondition(
                    "extend and zero fill need a corpus".to_string(),
                ))
            }
            None => None,
        };
        if params.needs_catalogue() && catalogue.is_none() {
            return Err(ResultsError::Precondition(
                "zero fill needs a catalogue".to_string(),
            ));
        }

        if let Some(label) = &params.remove_label {
            self.remove_label(label);
        }
        if let (true, Some(corpus)) = (params.extend, corpus) {
            self.extend(corpus, params.kind)?;
        }
        if params.reduce {
            self.reduce()?;
        }
        if params.reciprocal {
            self.reciprocal_remove();
        }
        if let (true, Some(corpus), Some(catalogue)) = (params.zero_fill, corpus, catalogue) {
            self.zero_fill(corpus, catalogue)?;
        }
        if !params.excluded_ngrams.is_empty() {
            self.prune_by_ngram(&params.excluded_ngrams);
        }
        if !params.size.is_unbounded() {
            self.prune_by_ngram_size(params.size);
        }
        if !params.total_count.is_unbounded() {
            self.prune_by_ngram_count(params.total_count);
        }
        if !params.work_count_per_witness.is_unbounded() {
            self.prune_by_ngram_count_per_work(params.work_count_per_witness);
        }
        if !params.works.is_unbounded() {
            self.prune_by_work_count(params.works);
        }
        if params.label_count {
            self.add_label_count();
        }
        if params.collapse_witnesses {
            self.collapse_witnesses()?;
        }
        self.sort();
        Ok(())
    }

    pub fn remove_label(&mut self, label: &str) {
        let observer = self.observer;
        self.apply("remove label", |table| {
            filter::remove_label(table, label, observer)
        });
    }

    pub fn extend(&mut self, corpus: &Corpus, kind: ResultsKind) -> Result<(), ResultsError> {
        let observer = self.observer;
        let tokenizer = &self.tokenizer;
        let extended = Self::attempt(&self.table, observer, "extend", |table| {
            extend::extend(table, corpus, tokenizer, kind, observer)
        })?;
        self.table = extended;
        Ok(())
    }

    pub fn reduce(&mut self) -> Result<(), ResultsError> {
        let tokenizer = &self.tokenizer;
        let reduced = Self::attempt(&self.table, self.observer, "reduce", |table| {
            reduce::reduce(table, tokenizer)
        })?;
        self.table = reduced;
        Ok(())
    }

    pub fn reciprocal_remove(&mut self) {
        self.apply("reciprocal remove", filter::reciprocal_remove);
    }

    pub fn zero_fill(&mut self, corpus: &Corpus, catalogue: &Catalogue) -> Result<(), ResultsError> {
        let filled = Self::attempt(&self.table, self.observer, "zero fill", |table| {
            fill::zero_fill(table, corpus, catalogue)
        })?;
        self.table = filled;
        Ok(())
    }

    pub fn prune_by_ngram<S: AsRef<str>>(&mut self, ngrams: &[S]) {
        self.apply("prune by ngram", |table| filter::prune_by_ngram(table, ngrams));
    }

    pub fn prune_by_ngram_size(&mut self, bounds: Bounds) {
        self.apply("prune by ngram size", |table| {
            filter::prune_by_ngram_size(table, bounds)
        });
    }

    pub fn prune_by_ngram_count(&mut self, bounds: Bounds) {
        self.apply("prune by ngram count", |table| {
            filter::prune_by_ngram_count(table, bounds)
        });
    }

    pub fn prune_by_ngram_count_per_work(&mut self, bounds: Bounds) {
        self.apply("prune by ngram count per work", |table| {
            filter::prune_by_ngram_count_per_work(table, bounds)
        });
    }

    pub fn prune_by_work_count(&mut self, bounds: Bounds) {
        self.apply("prune by work count", |table| {
            filter::prune_by_work_count(table, bounds)
        });
    }

    pub fn add_label_count(&mut self) {
        self.apply("add label count", merge::add_label_count);
    }

    pub fn collapse_witnesses(&mut self) -> Result<(), ResultsError> {
        let collapsed = Self::attempt(
            &self.table,
            self.observer,
            "collapse witnesses",
            merge::collapse_witnesses,
        )?;
        self.table = collapsed;
        Ok(())
    }

    pub fn sort(&mut self) {
        self.apply("sort", merge::sort);
    }

    /// Run an infallible transform in place.
    fn apply(&mut self, operation: &'static str, transform: impl FnOnce(MatchTable) -> MatchTable) {
        self.observer.on_event(&Event::Started { operation });
        let rows_before = self.table.len();
        let table = std::mem::take(&mut self.table);
        self.table = transform(table);
        self.observer.on_event(&Event::Finished {
            operation,
            rows_before,
            rows_after: self.table.len(),
        });
    }

    /// Run a fallible transform on a copy of `table`, returning the new
    /// table only if it succeeds.
    fn attempt(
        table: &MatchTable,
        observer: &dyn Observer,
        operation: &'static str,
        transform: impl FnOnce(MatchTable) -> Result<MatchTable, ResultsError>,
    ) -> Result<MatchTable, ResultsError> {
        observer.on_event(&Event::Started { operation });
        let result = transform(table.clone())?;
        observer.on_event(&Event::Finished {
            operation,
            rows_before: table.len(),
            rows_after: result.len(),
        });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Witness;
    use crate::models::MatchRow;
    use crate::observe::RecordingObserver;

    fn row(ngram: &str, work: &str, siglum: &str, label: &str, count: u64) -> MatchRow {
        MatchRow::new(ngram, ngram.split(' ').count(), work, siglum, label, count)
    }

    #[test]
    fn test_default_plan_only_sorts() {
        let table = MatchTable::new(vec![
            row("a", "W1", "base", "A", 1),
            row("a b", "W1", "base", "A", 1),
        ]);
        let mut results = Results::new(table, Tokenizer::pagel());
        results
            .process(&ResultsParams::default(), None, None)
            .unwrap();
        assert_eq!(results.table().len(), 2);
        assert_eq!(results.table().rows()[0].ngram, "a b");
    }

    #[test]
    fn test_process_requires_corpus_for_extend() {
        let mut results = Results::new(MatchTable::default(), Tokenizer::pagel());
        let params = ResultsParams {
            extend: true,
            ..Default::default()
        };
        assert!(matches!(
            results.process(&params, None, None),
            Err(ResultsError::Precondition(_))
        ));
    }

    #[test]
    fn test_failed_step_keeps_table() {
        let table = MatchTable::new(vec![row("a b", "W9", "base", "A", 1)]);
        let corpus = Corpus::from_witnesses(vec![Witness {
            work: "W1".to_string(),
            siglum: "base".to_string(),
            tokens: vec!["a".to_string(), "b".to_string()],
        }]);
        let mut results = Results::new(table.clone(), Tokenizer::pagel());
        assert!(results.extend(&corpus, ResultsKind::Difference).is_err());
        assert_eq!(results.table(), &table);
    }

    #[test]
    fn test_steps_emit_started_and_finished() {
        let observer = RecordingObserver::new();
        let table = MatchTable::new(vec![
            row("x", "W1", "base", "A", 1),
            row("y", "W2", "base", "B", 1),
        ]);
        let mut results = Results::new(table, Tokenizer::pagel()).with_observer(&observer);
        results.reciprocal_remove();

        assert_eq!(
            observer.events(),
            vec![
                Event::Started {
                    operation: "reciprocal remove"
                },
                Event::Finished {
                    operation: "reciprocal remove",
                    rows_before: 2,
                    rows_after: 0,
                },
            ]
        );
    }

    #[test]
    fn test_collapse_then_reduce_is_rejected() {
        let table = MatchTable::new(vec![
            row("x", "W1", "a", "A", 1),
            row("x", "W1", "b", "A", 1),
        ]);
        let mut results = Results::new(table, Tokenizer::pagel());
        results.collapse_witnesses().unwrap();
        assert!(matches!(
            results.reduce(),
            Err(ResultsError::Precondition(_))
        ));
        assert!(results.table().is_collapsed());
    }
}
