//! N-gram Match Table Algebra
//!
//! Transforms over tables of n-gram occurrence counts produced by comparing
//! labelled groups of works. Each row records how often an n-gram occurs in
//! one witness of one work; the transforms extend matches to their longest
//! literal span, remove double counting, filter by label attestation and
//! counts, make absence explicit, and aggregate for presentation.
//!
//! # Example
//!
//! ```no_run
//! use ngram_results::prelude::*;
//! use std::path::Path;
//!
//! let tokenizer = Tokenizer::cbeta();
//! let corpus = Corpus::open(Path::new("corpus"), &tokenizer).unwrap();
//! let catalogue = Catalogue::load(Path::new("catalogue.txt")).unwrap();
//! let table = MatchTable::from_path(Path::new("intersect.csv"), &tokenizer).unwrap();
//!
//! let params = ResultsParams {
//!     kind: ResultsKind::Intersect,
//!     extend: true,
//!     reduce: true,
//!     zero_fill: true,
//!     ..Default::default()
//! };
//!
//! let mut results = Results::new(table, tokenizer).with_observer(&TracingObserver);
//! results.process(&params, Some(&corpus), Some(&catalogue)).unwrap();
//!
//! write_csv_file(results.table(), Path::new("extended.csv")).unwrap();
//! ```
//!
//! # Single transforms
//!
//! Every transform is also a free function taking and returning a table:
//!
//! ```
//! use ngram_results::prelude::*;
//!
//! let table = MatchTable::new(vec![
//!     MatchRow::new("x y", 2, "W1", "base", "A", 1),
//!     MatchRow::new("x y", 2, "W2", "base", "B", 1),
//!     MatchRow::new("only", 1, "W2", "base", "B", 3),
//! ]);
//! let shared = reciprocal_remove(table);
//! assert_eq!(shared.len(), 2);
//! ```

pub mod catalogue;
pub mod corpus;
pub mod error;
pub mod extend;
pub mod fill;
pub mod filter;
pub mod merge;
pub mod models;
pub mod observe;
pub mod output;
pub mod reduce;
pub mod results;
pub mod table;
pub mod tokenizer;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::catalogue::{Catalogue, CatalogueError};
    pub use crate::corpus::{Corpus, CorpusError, Witness};
    pub use crate::error::ResultsError;
    pub use crate::extend::extend;
    pub use crate::fill::zero_fill;
    pub use crate::filter::{
        attesting_labels, prune_by_ngram, prune_by_ngram_count, prune_by_ngram_count_per_work,
        prune_by_ngram_size, prune_by_work_count, reciprocal_remove, remove_label,
    };
    pub use crate::merge::{add_label_count, collapse_witnesses, sort};
    pub use crate::models::{Bounds, MatchRow, ResultsKind, ResultsParams};
    pub use crate::observe::{Event, NullObserver, Observer, RecordingObserver, TracingObserver};
    pub use crate::output::{
        print_summary, summarize, write_csv, write_csv_file, write_json_summary, OutputError,
        TableSummary,
    };
    pub use crate::reduce::reduce;
    pub use crate::results::Results;
    pub use crate::table::{MatchTable, TableError, FIELDNAMES};
    pub use crate::tokenizer::Tokenizer;
}

// Re-export commonly used types at the crate root
pub use error::ResultsError;
pub use models::{Bounds, MatchRow, ResultsKind, ResultsParams};
pub use results::Results;
pub use table::MatchTable;
pub use tokenizer::Tokenizer;
