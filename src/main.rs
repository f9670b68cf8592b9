//! N-gram match table processing
//!
//! Loads a match table produced by an intersect or difference query,
//! runs the requested transforms and writes the resulting table.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use ngram_results::catalogue::Catalogue;
use ngram_results::corpus::Corpus;
use ngram_results::models::{Bounds, ResultsKind, ResultsParams};
use ngram_results::observe::{Event, Observer, TracingObserver};
use ngram_results::output::{print_summary, summarize, write_csv, write_csv_file, write_json_summary};
use ngram_results::results::Results;
use ngram_results::table::MatchTable;
use ngram_results::tokenizer::Tokenizer;

#[derive(Parser)]
#[command(name = "ngram-results")]
#[command(about = "Transforms over n-gram match tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Tokenizer preset (CLI version, mirrors the library presets)
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliTokenizer {
    /// One token per character or bracketed unit, joined without spaces
    Cbeta,
    /// Whitespace-separated words, joined with single spaces
    Pagel,
}

impl From<CliTokenizer> for Tokenizer {
    fn from(preset: CliTokenizer) -> Self {
        match preset {
            CliTokenizer::Cbeta => Tokenizer::cbeta(),
            CliTokenizer::Pagel => Tokenizer::pagel(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run transforms over a match table
    ///
    /// The plan starts from --params (or the empty plan) and every flag
    /// given explicitly overrides it. The output is always sorted.
    Process {
        /// Match table CSV
        #[arg(long)]
        matches: PathBuf,

        /// Corpus directory holding <work>/<siglum>.txt witnesses
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Catalogue file of "work label" lines
        #[arg(long)]
        catalogue: Option<PathBuf>,

        /// Output CSV path (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Tokenizer preset
        #[arg(long, value_enum, default_value = "cbeta")]
        tokenizer: CliTokenizer,

        /// Custom token pattern (regular expression), overrides the preset
        #[arg(long)]
        token_pattern: Option<String>,

        /// Joiner used with --token-pattern [default: ""]
        #[arg(long)]
        token_joiner: Option<String>,

        /// JSON file with a full processing plan
        #[arg(long)]
        params: Option<PathBuf>,

        /// Treat the table as intersect results
        #[arg(long)]
        intersect: bool,

        /// Drop all rows with this label first
        #[arg(long)]
        remove_label: Option<String>,

        /// Extend matches to their longest literal span
        #[arg(long)]
        extend: bool,

        /// Remove counts already accounted for by larger n-grams
        #[arg(long)]
        reduce: bool,

        /// Keep only n-grams attested under every label
        #[arg(long)]
        reciprocal: bool,

        /// Add count-0 rows for witnesses lacking an n-gram
        #[arg(long)]
        zero_fill: bool,

        /// File of n-grams to drop, one per line
        #[arg(long)]
        ngrams: Option<PathBuf>,

        #[arg(long)]
        min_size: Option<u64>,

        #[arg(long)]
        max_size: Option<u64>,

        /// Minimum total count (sum of per-work maxima)
        #[arg(long)]
        min_count: Option<u64>,

        #[arg(long)]
        max_count: Option<u64>,

        /// Minimum count in at least one witness
        #[arg(long)]
        min_count_work: Option<u64>,

        #[arg(long)]
        max_count_work: Option<u64>,

        /// Minimum number of works bearing the n-gram
        #[arg(long)]
        min_works: Option<u64>,

        #[arg(long)]
        max_works: Option<u64>,

        /// Add the label count column
        #[arg(long)]
        label_count: bool,

        /// Merge witnesses of a work that share a count
        #[arg(long)]
        collapse_witnesses: bool,

        /// Check that the catalogue has exactly two labels, this being one
        #[arg(long)]
        require_label: Option<String>,

        /// Suppress progress output and the summary
        #[arg(long)]
        quiet: bool,
    },

    /// Show match table statistics
    Summary {
        /// Match table CSV
        #[arg(long)]
        matches: PathBuf,

        #[arg(long, value_enum, default_value = "cbeta")]
        tokenizer: CliTokenizer,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Shows a progress bar for per-witness work and forwards every event
/// to `tracing`.
struct ProgressObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressObserver {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl Observer for ProgressObserver {
    fn on_event(&self, event: &Event) {
        TracingObserver.on_event(event);
        let Ok(mut bar) = self.bar.lock() else {
            return;
        };
        match event {
            // Workers finish in any order; each event is one finished group.
            Event::Progress { total, .. } => {
                let pb = bar.get_or_insert_with(|| {
                    let pb = ProgressBar::new(*total as u64);
                    if let Ok(style) = ProgressStyle::default_bar().template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} witnesses",
                    ) {
                        pb.set_style(style.progress_chars("#>-"));
                    }
                    pb
                });
                pb.inc(1);
            }
            Event::Finished { .. } => {
                if let Some(pb) = bar.take() {
                    pb.finish_and_clear();
                }
            }
            _ => {}
        }
    }
}

fn load_ngrams(path: &Path) -> io::Result<Vec<String>> {
    Ok(std::fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Overlay explicitly given bounds onto `base`.
fn overlay(base: Bounds, min: Option<u64>, max: Option<u64>) -> Bounds {
    Bounds::new(min.or(base.min), max.or(base.max))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ngram_results=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            matches,
            corpus,
            catalogue,
            output,
            tokenizer,
            token_pattern,
            token_joiner,
            params,
            intersect,
            remove_label,
            extend,
            reduce,
            reciprocal,
            zero_fill,
            ngrams,
            min_size,
            max_size,
            min_count,
            max_count,
            min_count_work,
            max_count_work,
            min_works,
            max_works,
            label_count,
            collapse_witnesses,
            require_label,
            quiet,
        } => {
            // Start from the params file or the empty plan
            let defaults: ResultsParams = match &params {
                Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
                None => ResultsParams::default(),
            };

            let mut excluded_ngrams = defaults.excluded_ngrams.clone();
            if let Some(path) = &ngrams {
                excluded_ngrams.extend(load_ngrams(path)?);
            }

            let params = ResultsParams {
                kind: if intersect {
                    ResultsKind::Intersect
                } else {
                    defaults.kind
                },
                remove_label: remove_label.or(defaults.remove_label),
                extend: extend || defaults.extend,
                reduce: reduce || defaults.reduce,
                reciprocal: reciprocal || defaults.reciprocal,
                zero_fill: zero_fill || defaults.zero_fill,
                excluded_ngrams,
                size: overlay(defaults.size, min_size, max_size),
                total_count: overlay(defaults.total_count, min_count, max_count),
                work_count_per_witness: overlay(
                    defaults.work_count_per_witness,
                    min_count_work,
                    max_count_work,
                ),
                works: overlay(defaults.works, min_works, max_works),
                label_count: label_count || defaults.label_count,
                collapse_witnesses: collapse_witnesses || defaults.collapse_witnesses,
            };

            let tokenizer = match token_pattern {
                Some(pattern) => Tokenizer::new(&pattern, token_joiner.unwrap_or_default())?,
                None => Tokenizer::from(tokenizer),
            };

            let catalogue = catalogue.as_deref().map(Catalogue::load).transpose()?;
            if let (Some(label), Some(catalogue)) = (&require_label, &catalogue) {
                catalogue.check_binary(label)?;
            }
            let corpus = match &corpus {
                Some(root) if params.needs_corpus() => Some(Corpus::open(root, &tokenizer)?),
                _ => None,
            };

            let table = MatchTable::from_path(&matches, &tokenizer)?;
            info!(rows = table.len(), path = %matches.display(), "Loaded match table");

            let progress = ProgressObserver::new();
            let observer: &dyn Observer = if quiet { &TracingObserver } else { &progress };
            let mut results = Results::new(table, tokenizer).with_observer(observer);
            results.process(&params, corpus.as_ref(), catalogue.as_ref())?;

            match &output {
                Some(path) => {
                    write_csv_file(results.table(), path)?;
                    if !quiet {
                        eprintln!("\nOutput: {}", path.display());
                    }
                }
                None => {
                    let stdout = io::stdout();
                    let mut writer = BufWriter::new(stdout.lock());
                    write_csv(results.table(), &mut writer)?;
                    writer.flush()?;
                }
            }

            if !quiet {
                print_summary(&summarize(results.table()));
            }
        }

        Commands::Summary {
            matches,
            tokenizer,
            json,
        } => {
            let table = MatchTable::from_path(&matches, &Tokenizer::from(tokenizer))?;
            let summary = summarize(&table);
            if json {
                write_json_summary(&summary, &mut io::stdout())?;
            } else {
                print_summary(&summary);
            }
        }
    }

    Ok(())
}
