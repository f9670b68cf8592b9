//! Crate-level error type.

use crate::catalogue::CatalogueError;
use crate::corpus::CorpusError;
use crate::table::TableError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResultsError {
    /// Malformed match table input
    #[error(transparent)]
    Table(#[from] TableError),
    /// A row refers to something the corpus does not hold
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
    /// The operation cannot run on a table in this state
    #[error("Precondition violated: {0}")]
    Precondition(String),
}

impl ResultsError {
    pub(crate) fn collapsed(operation: &str) -> Self {
        Self::Precondition(format!(
            "{operation} needs per-witness rows, but witnesses have been collapsed"
        ))
    }
}
