//! Read-only snapshot of a corpus of works and their witnesses.
//!
//! On disk a corpus is a directory holding one sub-directory per work,
//! each containing one `<siglum>.txt` file per witness. Opening a corpus
//! reads and tokenizes every witness once; all later reads are served
//! from that snapshot.

use crate::tokenizer::Tokenizer;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const WITNESS_EXTENSION: &str = "txt";

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Not a corpus directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Witness not found in corpus: {work} ({siglum})")]
    WitnessNotFound { work: String, siglum: String },
}

/// One textual source of a work, as an ordered token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub work: String,
    pub siglum: String,
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    works: BTreeMap<String, BTreeMap<String, Witness>>,
}

impl Corpus {
    /// Load every `<work>/<siglum>.txt` witness under `root`.
    pub fn open(root: &Path, tokenizer: &Tokenizer) -> Result<Self, CorpusError> {
        if !root.is_dir() {
            return Err(CorpusError::NotADirectory(root.to_path_buf()));
        }
        let mut witnesses = Vec::new();
        for work_entry in fs::read_dir(root).map_err(io_error(root))? {
            let work_path = work_entry.map_err(io_error(root))?.path();
            if !work_path.is_dir() {
                continue;
            }
            let Some(work) = file_name(&work_path) else {
                continue;
            };
            for witness_entry in fs::read_dir(&work_path).map_err(io_error(&work_path))? {
                let path = witness_entry.map_err(io_error(&work_path))?.path();
                if !path.is_file()
                    || path.extension().and_then(|e| e.to_str()) != Some(WITNESS_EXTENSION)
                {
                    continue;
                }
                let Some(siglum) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let content = fs::read_to_string(&path).map_err(io_error(&path))?;
                witnesses.push(Witness {
                    work: work.clone(),
                    siglum: siglum.to_string(),
                    tokens: tokenizer.tokenize(&content),
                });
            }
        }

        Ok(Self::from_witnesses(witnesses))
    }

    /// Build a snapshot from already tokenized witnesses.
    pub fn from_witnesses(witnesses: impl IntoIterator<Item = Witness>) -> Self {
        let mut works: BTreeMap<String, BTreeMap<String, Witness>> = BTreeMap::new();
        for witness in witnesses {
            works
                .entry(witness.work.clone())
                .or_default()
                .insert(witness.siglum.clone(), witness);
        }
        Self { works }
    }

    pub fn get_witness(&self, work: &str, siglum: &str) -> Result<&Witness, CorpusError> {
        self.works
            .get(work)
            .and_then(|sigla| sigla.get(siglum))
            .ok_or_else(|| CorpusError::WitnessNotFound {
                work: work.to_string(),
                siglum: siglum.to_string(),
            })
    }

    /// Sigla of `work` in ascending order; empty if the work is unknown.
    pub fn get_sigla(&self, work: &str) -> Vec<&str> {
        self.works
            .get(work)
            .map(|sigla| sigla.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// All witnesses in (work, siglum) order.
    pub fn get_witnesses(&self) -> impl Iterator<Item = &Witness> {
        self.works.values().flat_map(|sigla| sigla.values())
    }

    pub fn works(&self) -> impl Iterator<Item = &str> {
        self.works.keys().map(String::as_str)
    }

    pub fn witness_count(&self) -> usize {
        self.works.values().map(BTreeMap::len).sum()
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CorpusError {
    let path = path.to_path_buf();
    move |source| CorpusError::Io { path, source }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}
