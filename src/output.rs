//! Output formatting for match tables (CSV, JSON summary, console summary).

use serde::Serialize;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

use crate::table::{MatchTable, FIELDNAMES, LABEL_COUNT_FIELD, SIGLA_FIELD, SIGLUM_FIELD};

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write a match table as CSV.
///
/// Columns follow the fixed field order. A collapsed table writes `sigla`
/// in place of `siglum`; a `label count` column is appended when every row
/// carries one.
pub fn write_csv<W: Write>(table: &MatchTable, writer: &mut W) -> Result<(), OutputError> {
    let with_label_count = table.has_label_counts();
    let header: Vec<&str> = FIELDNAMES
        .iter()
        .map(|&name| {
            if name == SIGLUM_FIELD && table.is_collapsed() {
                SIGLA_FIELD
            } else {
                name
            }
        })
        .chain(with_label_count.then_some(LABEL_COUNT_FIELD))
        .collect();
    writeln!(writer, "{}", header.join(","))?;

    for row in table.rows() {
        write!(
            writer,
            "{},{},{},{},{},{}",
            escape_field(&row.ngram),
            row.size,
            escape_field(&row.work),
            escape_field(&row.siglum),
            escape_field(&row.label),
            row.count
        )?;
        match row.label_count {
            Some(label_count) if with_label_count => writeln!(writer, ",{label_count}")?,
            _ => writeln!(writer)?,
        }
    }

    Ok(())
}

/// Write a match table as CSV to a file.
pub fn write_csv_file(table: &MatchTable, path: &Path) -> Result<(), OutputError> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write_csv(table, &mut file)?;
    file.flush()?;
    Ok(())
}

/// Quote a field if it holds a delimiter, quote or line break.
fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Headline figures for a match table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub ngrams: usize,
    pub works: usize,
    /// Distinct (work, siglum) pairs; on a collapsed table, distinct sigla lists
    pub witnesses: usize,
    pub labels: Vec<String>,
    pub max_size: Option<usize>,
    pub collapsed: bool,
}

pub fn summarize(table: &MatchTable) -> TableSummary {
    let works: BTreeSet<&str> = table.rows().iter().map(|r| r.work.as_str()).collect();
    let witnesses: BTreeSet<(&str, &str)> = table
        .rows()
        .iter()
        .map(|r| (r.work.as_str(), r.siglum.as_str()))
        .collect();

    TableSummary {
        rows: table.len(),
        ngrams: table.ngrams().len(),
        works: works.len(),
        witnesses: witnesses.len(),
        labels: table.labels().into_iter().map(str::to_string).collect(),
        max_size: table.max_size(),
        collapsed: table.is_collapsed(),
    }
}

/// Write a table summary as JSON.
pub fn write_json_summary<W: Write>(
    summary: &TableSummary,
    writer: &mut W,
) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(summary)?;
    writer.write_all(json.as_bytes())?;
    writeln!(writer)?;
    Ok(())
}

/// Write a summary report to stderr, leaving stdout for table output.
pub fn print_summary(summary: &TableSummary) {
    eprintln!("\n=== Match Table Summary ===");
    eprintln!("Rows: {}", summary.rows);
    eprintln!("Distinct n-grams: {}", summary.ngrams);
    eprintln!("Works: {}", summary.works);
    eprintln!("Witnesses: {}", summary.witnesses);
    eprintln!("Labels: {}", summary.labels.join(", "));
    match summary.max_size {
        Some(size) => eprintln!("Largest n-gram: {size} tokens"),
        None => eprintln!("Largest n-gram: -"),
    }
    if summary.collapsed {
        eprintln!("Witnesses collapsed: yes");
    }
}
