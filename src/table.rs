//! The match table and its CSV schema.
//!
//! A table is read once from the tabular output of an n-gram query and
//! validated up front: every required column must be present, every
//! numeric field must parse, and every row's `size` must agree with the
//! tokenizer. Nothing is loaded if any row fails.

use crate::models::MatchRow;
use crate::tokenizer::Tokenizer;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

pub const NGRAM_FIELD: &str = "ngram";
pub const SIZE_FIELD: &str = "size";
pub const WORK_FIELD: &str = "work";
pub const SIGLUM_FIELD: &str = "siglum";
pub const SIGLA_FIELD: &str = "sigla";
pub const LABEL_FIELD: &str = "label";
pub const COUNT_FIELD: &str = "count";
pub const LABEL_COUNT_FIELD: &str = "label count";

/// Column order of a serialized table.
pub const FIELDNAMES: [&str; 6] = [
    NGRAM_FIELD,
    SIZE_FIELD,
    WORK_FIELD,
    SIGLUM_FIELD,
    LABEL_FIELD,
    COUNT_FIELD,
];

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Match table has no header row")]
    MissingHeader,
    #[error("Match table is missing required column {0:?}")]
    MissingColumn(&'static str),
    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Line {line}: invalid {column} value {value:?}")]
    InvalidNumber {
        line: usize,
        column: &'static str,
        value: String,
    },
    #[error("Line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },
    #[error("Line {line}: n-gram {ngram:?} has size {declared} but {actual} tokens")]
    SizeMismatch {
        line: usize,
        ngram: String,
        declared: usize,
        actual: usize,
    },
    #[error("Row {row}: n-gram {ngram:?} has size {declared} but {actual} tokens")]
    RowSizeMismatch {
        row: usize,
        ngram: String,
        declared: usize,
        actual: usize,
    },
}

/// An unordered collection of match rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchTable {
    rows: Vec<MatchRow>,
    collapsed: bool,
}

impl MatchTable {
    pub fn new(rows: Vec<MatchRow>) -> Self {
        Self {
            rows,
            collapsed: false,
        }
    }

    /// Build a table, checking every row's `size` against `tokenizer`.
    pub fn try_new(rows: Vec<MatchRow>, tokenizer: &Tokenizer) -> Result<Self, TableError> {
        check_sizes(rows.iter().enumerate(), tokenizer)?;
        Ok(Self::new(rows))
    }

    pub(crate) fn with_collapsed(rows: Vec<MatchRow>, collapsed: bool) -> Self {
        Self { rows, collapsed }
    }

    /// Read a CSV table from a file.
    pub fn from_path(path: &Path, tokenizer: &Tokenizer) -> Result<Self, TableError> {
        let content = fs::read_to_string(path)?;
        Self::from_csv_str(&content, tokenizer)
    }

    pub fn from_reader<R: Read>(mut reader: R, tokenizer: &Tokenizer) -> Result<Self, TableError> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::from_csv_str(&content, tokenizer)
    }

    pub fn from_csv_str(content: &str, tokenizer: &Tokenizer) -> Result<Self, TableError> {
        let records = parse_records(content)?;
        let mut records = records.into_iter();
        let (_, header) = records.next().ok_or(TableError::MissingHeader)?;

        let position: HashMap<&str, usize> = header
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim(), idx))
            .collect();
        let column = |name: &'static str| {
            position
                .get(name)
                .copied()
                .ok_or(TableError::MissingColumn(name))
        };
        let ngram_idx = column(NGRAM_FIELD)?;
        let size_idx = column(SIZE_FIELD)?;
        let work_idx = column(WORK_FIELD)?;
        let label_idx = column(LABEL_FIELD)?;
        let count_idx = column(COUNT_FIELD)?;
        let (siglum_idx, collapsed) = match (column(SIGLUM_FIELD), column(SIGLA_FIELD)) {
            (Ok(idx), _) => (idx, false),
            (Err(_), Ok(idx)) => (idx, true),
            (Err(err), Err(_)) => return Err(err),
        };
        let label_count_idx = column(LABEL_COUNT_FIELD).ok();

        let mut rows = Vec::new();
        for (line, record) in records {
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }
            if record.len() != header.len() {
                return Err(TableError::FieldCount {
                    line,
                    expected: header.len(),
                    found: record.len(),
                });
            }
            let ngram = record[ngram_idx].clone();
            let size: usize = parse_number(&record[size_idx], line, SIZE_FIELD)?;
            let actual = tokenizer.size_of(&ngram);
            if actual != size {
                return Err(TableError::SizeMismatch {
                    line,
                    ngram,
                    declared: size,
                    actual,
                });
            }
            let label_count = match label_count_idx {
                Some(idx) => Some(parse_number(&record[idx], line, LABEL_COUNT_FIELD)?),
                None => None,
            };
            rows.push(MatchRow {
                ngram,
                size,
                work: record[work_idx].clone(),
                siglum: record[siglum_idx].clone(),
                label: record[label_idx].clone(),
                count: parse_number(&record[count_idx], line, COUNT_FIELD)?,
                label_count,
            });
        }

        Ok(Self::with_collapsed(rows, collapsed))
    }

    pub fn rows(&self) -> &[MatchRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<MatchRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether witnesses have been collapsed into sigla lists.
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn has_label_counts(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.label_count.is_some())
    }

    pub fn max_size(&self) -> Option<usize> {
        self.rows.iter().map(|r| r.size).max()
    }

    /// Distinct labels present in the table, sorted.
    pub fn labels(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }

    pub fn ngrams(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.ngram.as_str()).collect()
    }

    /// Keep only rows matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&MatchRow) -> bool) {
        self.rows.retain(keep);
    }

    /// Append rows, merging any that share (ngram, work, siglum) with an
    /// existing row by summing their counts.
    pub fn extend_rows(&mut self, rows: impl IntoIterator<Item = MatchRow>) {
        self.rows.extend(rows);
        self.merge_duplicates();
    }

    /// Sum the counts of rows sharing (ngram, work, siglum). The first
    /// occurrence keeps its position.
    pub fn merge_duplicates(&mut self) {
        let mut seen: HashMap<(String, String, String), usize> = HashMap::new();
        let mut merged: Vec<MatchRow> = Vec::with_capacity(self.rows.len());
        for row in self.rows.drain(..) {
            let key = (row.ngram.clone(), row.work.clone(), row.siglum.clone());
            match seen.get(&key) {
                Some(&idx) => merged[idx].count += row.count,
                None => {
                    seen.insert(key, merged.len());
                    merged.push(row);
                }
            }
        }
        self.rows = merged;
    }
}

impl FromIterator<MatchRow> for MatchTable {
    fn from_iter<I: IntoIterator<Item = MatchRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Fail on the first row whose token count differs from its `size`.
/// Rows are numbered from 1.
pub(crate) fn check_sizes<'a>(
    rows: impl IntoIterator<Item = (usize, &'a MatchRow)>,
    tokenizer: &Tokenizer,
) -> Result<(), TableError> {
    for (idx, row) in rows {
        let actual = tokenizer.size_of(&row.ngram);
        if actual != row.size {
            return Err(TableError::RowSizeMismatch {
                row: idx + 1,
                ngram: row.ngram.clone(),
                declared: row.size,
                actual,
            });
        }
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(
    value: &str,
    line: usize,
    column: &'static str,
) -> Result<T, TableError> {
    value.trim().parse().map_err(|_| TableError::InvalidNumber {
        line,
        column,
        value: value.to_string(),
    })
}

/// Split CSV content into records, each tagged with the line it starts on.
///
/// Handles RFC 4180 quoting: quoted fields may hold commas, doubled
/// quotes and line breaks. A trailing `\r` before a line break is dropped.
fn parse_records(content: &str) -> Result<Vec<(usize, Vec<String>)>, TableError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push((record_line, std::mem::take(&mut record)));
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(TableError::UnterminatedQuote { line: record_line });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push((record_line, record));
    }

    Ok(records)
}
