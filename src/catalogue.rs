//! Mapping of works to labels.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed catalogue line {line}: {content:?}")]
    Malformed { line: usize, content: String },
    #[error("Label {0:?} is not present in the catalogue")]
    LabelNotPresent(String),
    #[error("The catalogue must specify exactly two labels, found {0}")]
    NotTwoLabels(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogue {
    entries: BTreeMap<String, String>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalogue file of `work label` lines.
    pub fn load(path: &Path) -> Result<Self, CatalogueError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, CatalogueError> {
        let mut catalogue = Self::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut fields = trimmed.split_whitespace();
            match (fields.next(), fields.next(), fields.next()) {
                (Some(work), Some(label), None) => catalogue.insert(work, label),
                _ => {
                    return Err(CatalogueError::Malformed {
                        line: idx + 1,
                        content: line.to_string(),
                    })
                }
            }
        }
        Ok(catalogue)
    }

    pub fn insert(&mut self, work: impl Into<String>, label: impl Into<String>) {
        self.entries.insert(work.into(), label.into());
    }

    pub fn label_of(&self, work: &str) -> Option<&str> {
        self.entries.get(work).map(String::as_str)
    }

    /// Distinct labels, sorted.
    pub fn labels(&self) -> BTreeSet<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    pub fn works_for<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(_, l)| l.as_str() == label)
            .map(|(work, _)| work.as_str())
    }

    /// (work, label) pairs in work order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(w, l)| (w.as_str(), l.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Require exactly two labels, one of which is `label`.
    pub fn check_binary(&self, label: &str) -> Result<(), CatalogueError> {
        let labels = self.labels();
        if !labels.contains(label) {
            return Err(CatalogueError::LabelNotPresent(label.to_string()));
        }
        if labels.len() != 2 {
            return Err(CatalogueError::NotTwoLabels(labels.len()));
        }
        Ok(())
    }
}

impl<W: Into<String>, L: Into<String>> FromIterator<(W, L)> for Catalogue {
    fn from_iter<I: IntoIterator<Item = (W, L)>>(iter: I) -> Self {
        let mut catalogue = Self::new();
        for (work, label) in iter {
            catalogue.insert(work, label);
        }
        catalogue
    }
}
