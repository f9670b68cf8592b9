//! Data structures for the match-table pipeline.

use serde::{Deserialize, Serialize};

/// A single match row: how often one n-gram occurs in one witness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRow {
    pub ngram: String,
    pub size: usize,
    pub work: String,
    /// Witness siglum, or the space-joined sigla list once witnesses are collapsed
    pub siglum: String,
    pub label: String,
    pub count: u64,
    /// Sum over the label's works of each work's highest witness count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_count: Option<u64>,
}

impl MatchRow {
    pub fn new(
        ngram: impl Into<String>,
        size: usize,
        work: impl Into<String>,
        siglum: impl Into<String>,
        label: impl Into<String>,
        count: u64,
    ) -> Self {
        Self {
            ngram: ngram.into(),
            size,
            work: work.into(),
            siglum: siglum.into(),
            label: label.into(),
            count,
            label_count: None,
        }
    }

    /// Key under which rows must be unique within a table.
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.ngram, &self.work, &self.siglum)
    }
}

/// Inclusive range filter; `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl Bounds {
    pub fn new(min: Option<u64>, max: Option<u64>) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: u64) -> Self {
        Self::new(Some(min), None)
    }

    pub fn at_most(max: u64) -> Self {
        Self::new(None, Some(max))
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    #[inline]
    pub fn contains(&self, value: u64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// What kind of query produced a match table.
///
/// Extend needs to know this: extending intersect results can surface
/// n-grams that are not shared by every label, so those get reciprocally
/// removed before being merged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultsKind {
    /// N-grams shared across all labels
    Intersect,
    /// N-grams distinctive to one label
    #[default]
    Difference,
}

/// Processing plan for a match table.
///
/// Every transform is off by default, so the default plan only sorts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsParams {
    pub kind: ResultsKind,
    pub remove_label: Option<String>,
    pub extend: bool,
    pub reduce: bool,
    pub reciprocal: bool,
    pub zero_fill: bool,
    /// N-grams to drop outright
    pub excluded_ngrams: Vec<String>,
    pub size: Bounds,
    pub total_count: Bounds,
    pub work_count_per_witness: Bounds,
    pub works: Bounds,
    pub label_count: bool,
    pub collapse_witnesses: bool,
}

impl ResultsParams {
    /// Whether the plan needs a corpus (and so a tokenizer that matches it).
    pub fn needs_corpus(&self) -> bool {
        self.extend || self.zero_fill
    }

    /// Whether the plan needs a catalogue.
    pub fn needs_catalogue(&self) -> bool {
        self.zero_fill
    }
}
